//! Filling missing medicine fields with web search + LLM
//!
//! Only fields that were missing are ever written. Search failures degrade
//! to "no context"; model failures count the medicine as failed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::llm_client::{ChatModel, ChatRequest};
use super::search_client::WebSearch;
use crate::models::{filter_valid_timings, Medicine};

const PLACEHOLDER_VALUES: [&str; 4] = ["As prescribed", "N/A", "Unknown", "unknown"];
const UNDETERMINED: &str = "Unable to determine";

const ENRICHMENT_SYSTEM_PROMPT: &str = "You are a medical expert that fills in missing prescription data using web search results and medical knowledge. Prioritize information from web sources when available. Always be conservative for patient safety.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingField {
    Dosage,
    Frequency,
    Timings,
}

impl MissingField {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingField::Dosage => "dosage",
            MissingField::Frequency => "frequency",
            MissingField::Timings => "timings",
        }
    }
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || PLACEHOLDER_VALUES.contains(&value)
}

/// Fields of `medicine` that need filling
pub fn detect_missing(medicine: &Medicine) -> Vec<MissingField> {
    let mut missing = Vec::new();
    if is_placeholder(&medicine.dosage) {
        missing.push(MissingField::Dosage);
    }
    if is_placeholder(&medicine.frequency) {
        missing.push(MissingField::Frequency);
    }
    if medicine.timings.is_empty() {
        missing.push(MissingField::Timings);
    }
    missing
}

fn field_list(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichedMedicine {
    pub name: String,
    pub fields_added: Vec<MissingField>,
    pub confidence: String,
}

/// Per-upload enrichment summary
///
/// When enrichment is disabled only `enabled` and `enriched_count` are
/// serialized.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentStats {
    pub enabled: bool,
    pub enriched_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_medicines: Option<Vec<EnrichedMedicine>>,
}

impl EnrichmentStats {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            enriched_count: 0,
            skipped_count: None,
            failed_count: None,
            enriched_medicines: None,
        }
    }

    fn started() -> Self {
        Self {
            enabled: true,
            enriched_count: 0,
            skipped_count: Some(0),
            failed_count: Some(0),
            enriched_medicines: Some(Vec::new()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FillReply {
    #[serde(default)]
    dosage: Option<Value>,
    #[serde(default)]
    frequency: Option<Value>,
    #[serde(default)]
    timings: Option<Value>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

fn usable_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() && s != UNDETERMINED => Some(s.clone()),
        _ => None,
    }
}

/// Apply a model reply to `medicine`; returns true when any field was set
fn apply_fill(medicine: &mut Medicine, missing: &[MissingField], reply: FillReply) -> bool {
    let mut notes = Vec::new();

    if missing.contains(&MissingField::Dosage) {
        if let Some(dosage) = usable_text(reply.dosage.as_ref()) {
            notes.push(format!("dosage: {}", dosage));
            medicine.dosage = dosage;
        }
    }

    if missing.contains(&MissingField::Frequency) {
        if let Some(frequency) = usable_text(reply.frequency.as_ref()) {
            notes.push(format!("frequency: {}", frequency));
            medicine.frequency = frequency;
        }
    }

    if missing.contains(&MissingField::Timings) {
        if let Some(Value::Array(items)) = reply.timings.as_ref() {
            let timings = filter_valid_timings(items.iter().filter_map(Value::as_str));
            if !timings.is_empty() {
                notes.push(format!("timings: {}", timings.join(", ")));
                medicine.timings = timings;
            }
        }
    }

    if notes.is_empty() {
        return false;
    }

    medicine.enriched = Some(true);
    medicine.enrichment_confidence = Some(reply.confidence.unwrap_or_else(|| "medium".to_string()));
    medicine.enrichment_reasoning = Some(reply.reasoning.unwrap_or_default());
    medicine.enrichment_notes = Some(format!("AI-enriched: {}", notes.join(", ")));
    true
}

fn fill_prompt(medicine: &Medicine, missing: &[MissingField], context: Option<&str>) -> String {
    let timings = serde_json::to_string(&medicine.timings).unwrap_or_else(|_| "[]".to_string());
    let or_unknown = |s: &str| {
        if s.is_empty() {
            "Unknown".to_string()
        } else {
            s.to_string()
        }
    };

    let mut prompt = format!(
        "You are a medical information assistant. A prescription has been scanned but some information is missing.\n\n\
         Medicine Name: {}\n\
         Current Information:\n\
         - Dosage: {}\n\
         - Frequency: {}\n\
         - Timings: {}\n\n\
         Missing Fields: {}\n",
        or_unknown(&medicine.medicine_name),
        or_unknown(&medicine.dosage),
        or_unknown(&medicine.frequency),
        timings,
        field_list(missing),
    );

    if let Some(context) = context.filter(|c| !c.is_empty()) {
        prompt.push_str(&format!(
            "\n\nREAL-TIME WEB SEARCH RESULTS (Medical Sources):\n{}\n",
            context
        ));
    }

    prompt.push_str(
        r#"
Based on the web search results and standard medical practices, fill in the missing fields.

CRITICAL RULES:
1. Prioritize information from web search results (if available)
2. Only fill in standard, commonly prescribed values for this specific medicine
3. For dosage: Provide typical adult dosage (e.g., "500mg", "10mg", "5ml", "2 tablets")
4. For frequency: Use EXACTLY one of: "once a day", "twice a day", "thrice a day", "four times a day"
5. For timings: Use combinations from: "morning", "afternoon", "evening", "night"
6. If unclear or unsafe to guess, return "Unable to determine"
7. Patient safety is CRITICAL - be conservative

Respond ONLY with a JSON object:
{
  "dosage": "value or Unable to determine",
  "frequency": "value or Unable to determine",
  "timings": ["morning", "evening"] or [],
  "confidence": "high/medium/low",
  "reasoning": "Brief explanation referencing web sources if used"
}
"#,
    );

    prompt
}

/// Enrichment pipeline over the configured vendors
#[derive(Clone, Default)]
pub struct Enricher {
    llm: Option<Arc<dyn ChatModel>>,
    search: Option<Arc<dyn WebSearch>>,
}

impl Enricher {
    pub fn new(llm: Option<Arc<dyn ChatModel>>, search: Option<Arc<dyn WebSearch>>) -> Self {
        Self { llm, search }
    }

    async fn search_context(&self, name: &str, missing: &[MissingField]) -> Option<String> {
        let search = self.search.as_ref()?;
        let query = format!(
            "{} medicine standard {} typical prescription information",
            name,
            field_list(missing)
        );

        match search.search(&query).await {
            Ok(response) => Some(response.to_context()),
            Err(e) => {
                warn!(medicine = %name, "Web search failed: {}", e);
                None
            }
        }
    }

    /// Fill missing fields of every medicine
    pub async fn enrich(&self, medicines: Vec<Medicine>) -> (Vec<Medicine>, EnrichmentStats) {
        let Some(llm) = self.llm.as_ref() else {
            return (medicines, EnrichmentStats::disabled());
        };

        let mut stats = EnrichmentStats::started();
        let mut skipped = 0;
        let mut failed = 0;
        let mut enriched_list = Vec::new();
        let mut out = Vec::with_capacity(medicines.len());

        for mut medicine in medicines {
            let missing = detect_missing(&medicine);
            if missing.is_empty() {
                skipped += 1;
                out.push(medicine);
                continue;
            }

            let name = if medicine.medicine_name.is_empty() {
                "Unknown".to_string()
            } else {
                medicine.medicine_name.clone()
            };
            debug!(medicine = %name, missing = %field_list(&missing), "Enriching medicine");

            let context = self.search_context(&name, &missing).await;
            let prompt = fill_prompt(&medicine, &missing, context.as_deref());

            let applied = match llm
                .complete_json(ChatRequest {
                    system: ENRICHMENT_SYSTEM_PROMPT,
                    user: &prompt,
                    temperature: 0.3,
                    max_tokens: 500,
                })
                .await
            {
                Ok(reply) => match serde_json::from_str::<FillReply>(&reply) {
                    Ok(fill) => apply_fill(&mut medicine, &missing, fill),
                    Err(e) => {
                        warn!(medicine = %name, "Enrichment reply was not valid JSON: {}", e);
                        false
                    }
                },
                Err(e) => {
                    warn!(medicine = %name, "Enrichment request failed: {}", e);
                    false
                }
            };

            if applied {
                enriched_list.push(EnrichedMedicine {
                    name,
                    fields_added: missing,
                    confidence: medicine
                        .enrichment_confidence
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            } else {
                failed += 1;
            }
            out.push(medicine);
        }

        stats.enriched_count = enriched_list.len();
        stats.skipped_count = Some(skipped);
        stats.failed_count = Some(failed);
        stats.enriched_medicines = Some(enriched_list);

        info!(
            "Enrichment: {} enriched, {} complete, {} failed",
            stats.enriched_count, skipped, failed
        );

        (out, stats)
    }
}
