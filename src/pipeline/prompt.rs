use serde_json::{json, Value};

/// System instruction for the risk-assessment model.
pub const RISK_SYSTEM_PROMPT: &str = r#"You are a 'Policy Risk Agent' specialized in privacy/personal-data policy review.
Your job is to assess risk and provide actionable recommendations.
You must:
- Use the extracted JSON as primary evidence
- Quote supporting snippets from the provided policy text (Korean) for each finding when possible
- Be conservative and avoid hallucinating missing details
- When explaining why each issue matters, include both legal risk and service/operational risk.
- Write all fields in Korean.

HARD RULES:
- Output must include exactly 5 items in top_findings (not 3, not 4).
  - If you find fewer than 5 major issues, fill remaining items with lower-severity "improvement opportunities" (e.g., clarity, transparency, user rights UX),
    but they must still be grounded in the provided policy_text_excerpt or extracted_structured_data.
- evidence_quotes must contain ONLY human-readable quotes from the provided policy text excerpt (Korean).
  - Do NOT include internal field names or structured signals like "retention_period 필드가 비어 있음", "null", "missing field", or any schema key names.

Return STRICT JSON only (no markdown, no commentary)."#;

pub const RISK_TASK: &str = "Assess privacy policy risk and produce an actionable report.";

/// One-line connectivity check sent by `policy-risk smoketest`.
pub const SMOKETEST_PROMPT: &str = "Say 'Solar connected' in one short sentence.";

/// JSON Schema for the information-extraction call.
pub fn information_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collected_personal_data": {
                "type": "array",
                "items": {"type": "string"},
                "description": "수집하는 개인정보 항목"
            },
            "collection_purpose": {
                "type": "array",
                "items": {"type": "string"},
                "description": "수집 목적"
            },
            "retention_period": {
                "type": "string",
                "description": "보관/이용 기간"
            },
            "third_party_sharing_or_outsourcing": {
                "type": "array",
                "items": {"type": "string"},
                "description": "제3자 제공 또는 처리위탁"
            },
            "user_rights": {
                "type": "array",
                "items": {"type": "string"},
                "description": "정보주체 권리(열람/정정/삭제 등)"
            }
        }
    })
}

/// Output schema embedded in the risk-assessment task payload.
pub fn risk_output_schema() -> Value {
    let level = json!(["LOW", "MEDIUM", "HIGH", "CRITICAL"]);
    json!({
        "type": "object",
        "properties": {
            "risk_score": {"type": "integer", "description": "0~100 (higher = riskier)"},
            "risk_level": {"type": "string", "enum": level},
            "top_findings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "why_it_matters": {"type": "string"},
                        "evidence_quotes": {"type": "array", "items": {"type": "string"}},
                        "recommendations": {"type": "array", "items": {"type": "string"}},
                        "severity": {"type": "string", "enum": level}
                    },
                    "required": ["title", "why_it_matters", "recommendations", "severity"]
                }
            },
            "quick_checklist": {"type": "array", "items": {"type": "string"}},
            "assumptions_and_limits": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["risk_score", "risk_level", "top_findings", "quick_checklist", "assumptions_and_limits"]
    })
}

/// The user-turn payload for risk assessment.
pub fn build_risk_task(extracted: &Value, policy_excerpt: &str) -> Value {
    json!({
        "task": RISK_TASK,
        "inputs": {
            "extracted_structured_data": extracted,
            "policy_text_excerpt": policy_excerpt
        },
        "output_schema": risk_output_schema()
    })
}
