//! Prescription text to structured medicines
//!
//! Parsing never fails the upload: without a chat model, or on any error,
//! the result is an empty list.

use serde::Deserialize;
use tracing::{info, warn};

use super::llm_client::{ChatModel, ChatRequest};
use crate::models::Medicine;

/// Longest OCR text sent to the model, in characters
pub const MAX_PROMPT_CHARS: usize = 8000;
pub const TRUNCATION_MARKER: &str =
    "\n\n... [TEXT TRUNCATED - MIDDLE SECTION OMITTED FOR BREVITY] ...\n\n";

const PARSER_SYSTEM_PROMPT: &str = "You are an expert medical prescription parser. Extract structured medicine data from OCR text accurately. Always return valid JSON.";

/// Keep the first 60% and last 40% of over-long text
pub fn truncate_ocr_text(raw: &str, max_chars: usize) -> String {
    let total = raw.chars().count();
    if total <= max_chars {
        return raw.to_string();
    }

    let head_chars = max_chars * 6 / 10;
    let tail_chars = max_chars - head_chars;

    let head: String = raw.chars().take(head_chars).collect();
    let tail: String = raw.chars().skip(total - tail_chars).collect();

    info!("Truncated OCR text from {} to ~{} chars", total, max_chars);
    format!("{}{}{}", head, TRUNCATION_MARKER, tail)
}

fn parser_prompt(text: &str) -> String {
    format!(
        r#"You are an expert medical prescription parser. Analyze the following prescription text extracted via OCR and identify ALL medicines.

RAW PRESCRIPTION TEXT:
```
{text}
```

CRITICAL INSTRUCTIONS:
1. Extract ALL medicines from the prescription (ignore doctor info, patient details, clinic name)
2. Skip "as needed" medications (SOS, PRN, p.r.n, "if needed", "when required")
3. For each medicine, extract:
   - medicine_name: Clean name without prefix (remove SYP, TAB, CAP, INJ)
   - dosage: Amount per dose (e.g., "500mg", "5ml", "2 tablets")
   - frequency: Convert to standard format:
     * TDS/T.D.S/thrice -> "thrice a day"
     * BD/BID/twice -> "twice a day"
     * QID/four times -> "four times a day"
     * OD/once -> "once a day"
     * Q6H -> "four times a day"
     * Q8H -> "thrice a day"
     * Q12H -> "twice a day"
   - timings: Array based on frequency:
     * once a day -> ["morning"]
     * twice a day -> ["morning", "evening"]
     * thrice a day -> ["morning", "afternoon", "evening"]
     * four times a day -> ["morning", "afternoon", "evening", "night"]

4. If dosage or frequency is unclear/missing, use "Unknown" - they will be filled later
5. Ignore duration (3d, 5d, x3d, x5d) - we only need per-dose information

RESPOND ONLY WITH VALID JSON (no markdown, no explanations):
{{
  "medicines": [
    {{
      "medicine_name": "name",
      "dosage": "amount or Unknown",
      "frequency": "frequency or Unknown",
      "timings": ["timing1", "timing2"]
    }}
  ],
  "total_found": number
}}"#
    )
}

#[derive(Deserialize)]
struct ParsedPrescription {
    #[serde(default)]
    medicines: serde_json::Value,
}

/// Decode the model's JSON reply
pub fn medicines_from_reply(reply: &str) -> Result<Vec<Medicine>, serde_json::Error> {
    let parsed: ParsedPrescription = serde_json::from_str(reply)?;
    Ok(Medicine::list_from_value(&parsed.medicines))
}

/// Extract medicines from OCR text
pub async fn parse_prescription(llm: Option<&dyn ChatModel>, raw_text: &str) -> Vec<Medicine> {
    let Some(llm) = llm else {
        warn!("No chat model configured, skipping prescription parsing");
        return Vec::new();
    };

    let text = truncate_ocr_text(raw_text, MAX_PROMPT_CHARS);
    let prompt = parser_prompt(&text);

    let reply = match llm
        .complete_json(ChatRequest {
            system: PARSER_SYSTEM_PROMPT,
            user: &prompt,
            temperature: 0.1,
            max_tokens: 2000,
        })
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Prescription parse request failed: {}", e);
            return Vec::new();
        }
    };

    match medicines_from_reply(&reply) {
        Ok(medicines) => {
            info!("Parsed {} medicine(s) from prescription", medicines.len());
            medicines
        }
        Err(e) => {
            warn!("Prescription parse reply was not valid JSON: {}", e);
            Vec::new()
        }
    }
}
