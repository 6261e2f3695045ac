//! Medicine records produced by prescription parsing
//!
//! LLM output is loosely typed: fields may be missing, null, numbers, or a
//! single string where a list is expected. Deserialization accepts all of
//! these and normalizes to strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(default, deserialize_with = "lenient_string")]
    pub medicine_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dosage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub timings: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_notes: Option<String>,
}

impl Medicine {
    /// Decode a JSON array, dropping entries that are not objects
    pub fn list_from_value(value: &Value) -> Vec<Medicine> {
        value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}
