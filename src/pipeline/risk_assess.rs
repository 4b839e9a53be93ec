//! Stage 4: risk assess. `ie_result.json` + `plain_text.txt` → `risk_report.json`.

use std::path::PathBuf;

use super::artifacts::{Artifact, ArtifactDir};
use super::prompt::{build_risk_task, RISK_SYSTEM_PROMPT};
use super::recovery::RiskPayload;
use super::types::RiskReport;
use super::upstage::{preview, ChatMessage, DocumentAi};
use super::PipelineError;
use crate::config::Settings;

const RESPONSE_PREVIEW_CHARS: usize = 800;

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub path: PathBuf,
    pub payload: RiskPayload,
}

/// Ask the chat model for a risk report and persist whatever can be recovered.
///
/// Both inputs must exist before the model is called. Output that is not JSON
/// is stored as the `{raw_text, note}` wrapper; only transport failures abort.
pub fn run_risk_assess(
    settings: &Settings,
    client: &dyn DocumentAi,
    dir: &ArtifactDir,
) -> Result<RiskAssessment, PipelineError> {
    let extracted = dir.read_json(Artifact::InformationExtract)?;
    let policy_text = dir.read_text(Artifact::PlainText)?;
    let excerpt = truncate_chars(&policy_text, settings.max_policy_chars);
    if excerpt.len() < policy_text.len() {
        tracing::info!(
            limit = settings.max_policy_chars,
            "Policy text truncated for risk assessment"
        );
    }

    let task = build_risk_task(&extracted, excerpt);
    let messages = [
        ChatMessage::system(RISK_SYSTEM_PROMPT),
        ChatMessage::user(serde_json::to_string(&task)?),
    ];

    let raw = client
        .chat(&settings.chat_model, &messages)
        .map_err(|e| {
            tracing::warn!(error = %e, "Risk assessment request failed");
            PipelineError::RiskAssess(e)
        })?;
    tracing::debug!(preview = %preview(&raw, RESPONSE_PREVIEW_CHARS), "Risk model output");

    let payload = RiskPayload::recover(&raw);
    match &payload {
        RiskPayload::Parsed(value) => {
            for issue in RiskReport::from_value(value).contract_issues() {
                tracing::warn!(issue = %issue, "Risk report deviates from contract");
            }
        }
        RiskPayload::Unparsed { .. } => {
            tracing::warn!("Risk model output is not JSON, storing wrapper");
        }
    }

    let path = dir.write_json(Artifact::RiskReport, &payload)?;
    tracing::info!(path = %path.display(), parsed = payload.is_parsed(), "Saved risk report");
    Ok(RiskAssessment { path, payload })
}

/// Hard cut after `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
