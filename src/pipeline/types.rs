use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of findings every well-formed risk report carries.
pub const REQUIRED_FINDINGS: usize = 5;

/// Overall or per-finding risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(RiskLevel::Low),
            "MEDIUM" => Some(RiskLevel::Medium),
            "HIGH" => Some(RiskLevel::High),
            "CRITICAL" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient view of a model-produced risk report. Every field is optional so
/// a partially-formed report still renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskReport {
    /// Kept as display text: models sometimes emit the score as a string.
    pub risk_score: Option<String>,
    pub risk_level: Option<String>,
    pub top_findings: Vec<Finding>,
    pub quick_checklist: Vec<String>,
    pub assumptions_and_limits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Finding {
    pub title: Option<String>,
    pub why_it_matters: Option<String>,
    pub evidence_quotes: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Option<String>,
}

impl RiskReport {
    /// Build from any JSON value. Non-objects yield an empty report.
    pub fn from_value(value: &Value) -> Self {
        Self {
            risk_score: scalar_text(value.get("risk_score")),
            risk_level: scalar_text(value.get("risk_level")),
            top_findings: value
                .get("top_findings")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(Finding::from_value).collect())
                .unwrap_or_default(),
            quick_checklist: string_list(value.get("quick_checklist")),
            assumptions_and_limits: string_list(value.get("assumptions_and_limits")),
        }
    }

    /// Contract violations worth logging. The model output is kept either way.
    pub fn contract_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        match self.risk_score.as_deref().map(|s| s.parse::<i64>()) {
            None => issues.push("risk_score missing".to_string()),
            Some(Ok(score)) if !(0..=100).contains(&score) => {
                issues.push(format!("risk_score {score} outside 0..=100"))
            }
            Some(Err(_)) => issues.push("risk_score is not an integer".to_string()),
            Some(Ok(_)) => {}
        }

        match self.risk_level.as_deref() {
            None => issues.push("risk_level missing".to_string()),
            Some(level) if RiskLevel::parse(level).is_none() => {
                issues.push(format!("risk_level '{level}' not in LOW/MEDIUM/HIGH/CRITICAL"))
            }
            Some(_) => {}
        }

        if self.top_findings.len() != REQUIRED_FINDINGS {
            issues.push(format!(
                "top_findings has {} entries, expected {REQUIRED_FINDINGS}",
                self.top_findings.len()
            ));
        }

        issues
    }
}

impl Finding {
    pub fn from_value(value: &Value) -> Self {
        Self {
            title: scalar_text(value.get("title")),
            why_it_matters: scalar_text(value.get("why_it_matters")),
            evidence_quotes: string_list(value.get("evidence_quotes")),
            recommendations: string_list(value.get("recommendations")),
            severity: scalar_text(value.get("severity")),
        }
    }
}

/// Strings and numbers as display text; anything else is treated as absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Array items as display text, skipping items that are not scalars.
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| scalar_text(Some(v))).collect())
        .unwrap_or_default()
}
