//! Stage 3: information extract. Source PDF + fixed schema → `ie_result.json`.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use super::artifacts::{Artifact, ArtifactDir};
use super::prompt::information_schema;
use super::upstage::{preview, DocumentAi};
use super::PipelineError;
use crate::config::Settings;

const CONTENT_PREVIEW_CHARS: usize = 800;

/// Result of the extraction stage.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub path: PathBuf,
    /// The model content was not JSON and was stored under `raw`.
    pub degraded: bool,
}

/// Run schema-guided extraction over the PDF.
///
/// Transport failures abort; content that is not JSON is kept as
/// `{"raw": <content>}` and the stage still succeeds.
pub fn run_information_extract(
    settings: &Settings,
    client: &dyn DocumentAi,
    source_pdf: &Path,
    dir: &ArtifactDir,
) -> Result<ExtractionOutcome, PipelineError> {
    if !source_pdf.is_file() {
        return Err(PipelineError::SourceNotFound(source_pdf.to_path_buf()));
    }
    let document = std::fs::read(source_pdf)?;
    let encoded = BASE64.encode(&document);

    let content = client
        .extract_information(
            &settings.information_extract_model,
            &encoded,
            &information_schema(),
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Information extraction request failed");
            PipelineError::InformationExtract(e)
        })?;

    let (result, degraded) = parse_extraction(&content);
    if degraded {
        tracing::warn!(
            preview = %preview(&content, CONTENT_PREVIEW_CHARS),
            "Extraction content is not JSON, storing raw text"
        );
    }

    let path = dir.write_json(Artifact::InformationExtract, &result)?;
    tracing::info!(path = %path.display(), degraded, "Saved information extraction result");
    Ok(ExtractionOutcome { path, degraded })
}

/// Parse model content as JSON, or wrap it as `{"raw": content}`.
pub fn parse_extraction(content: &str) -> (Value, bool) {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => (value, false),
        Err(_) => (json!({ "raw": content }), true),
    }
}
