//! Tolerant JSON recovery for model output.
//!
//! Ordered fallback, never fails:
//! 1. parse the text as-is
//! 2. strip code fences and a leading `json` tag, parse the outermost `{...}`
//! 3. wrap the original text as `{raw_text, note}`

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

pub const UNPARSED_NOTE: &str = "Model output was not valid JSON. See raw_text.";

/// A risk report as stored in `risk_report.json`: either the parsed model
/// object or the degraded wrapper around the unparsed text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RiskPayload {
    Parsed(Value),
    Unparsed { raw_text: String, note: String },
}

impl RiskPayload {
    /// Recover the best-effort JSON object from a raw model response.
    pub fn recover(raw: &str) -> Self {
        parse_object(raw)
            .or_else(|| extract_json_object(raw).and_then(|candidate| parse_object(&candidate)))
            .map(RiskPayload::Parsed)
            .unwrap_or_else(|| RiskPayload::Unparsed {
                raw_text: raw.to_string(),
                note: UNPARSED_NOTE.to_string(),
            })
    }

    /// Normalize a value read back from disk. A string `raw_text` that holds
    /// valid JSON is unwrapped. Only the bare `{raw_text, note}` wrapper is
    /// kept as `Unparsed`; any other object passes through untouched.
    pub fn normalize(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => return RiskPayload::Parsed(other),
        };

        let raw_text = match map.get("raw_text") {
            Some(Value::String(text)) => text,
            _ => return RiskPayload::Parsed(Value::Object(map)),
        };

        if let Ok(inner) = serde_json::from_str::<Value>(raw_text) {
            return RiskPayload::Parsed(inner);
        }

        match (map.len(), map.get("note")) {
            (2, Some(Value::String(note))) => RiskPayload::Unparsed {
                raw_text: raw_text.clone(),
                note: note.clone(),
            },
            _ => RiskPayload::Parsed(Value::Object(map)),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, RiskPayload::Parsed(_))
    }

    /// The JSON value as it is persisted and served.
    pub fn to_value(&self) -> Value {
        match self {
            RiskPayload::Parsed(value) => value.clone(),
            RiskPayload::Unparsed { raw_text, note } => {
                let mut map = Map::new();
                map.insert("raw_text".into(), Value::String(raw_text.clone()));
                map.insert("note".into(), Value::String(note.clone()));
                Value::Object(map)
            }
        }
    }
}

/// Parse text as a JSON object. Valid JSON that is not an object counts as a miss.
pub fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Leading `json` language tag left behind once fences are removed.
static LEADING_JSON_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*json\s*").unwrap());

/// Strip code fences and a leading `json` language tag, then cut from the
/// first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<String> {
    let cleaned = text.trim().replace("```json", "").replace("```", "");
    let cleaned = LEADING_JSON_TAG.replace(cleaned.trim(), "");
    let cleaned = cleaned.trim();

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(cleaned[start..=end].to_string())
}
