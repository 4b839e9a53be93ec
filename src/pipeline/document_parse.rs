//! Stage 1: document parse. Source PDF → `dp_result.json` (response verbatim).

use std::path::{Path, PathBuf};

use super::artifacts::{Artifact, ArtifactDir};
use super::upstage::{preview, DocumentAi, DocumentParseRequest, UpstageError};
use super::PipelineError;
use crate::config::Settings;

/// Characters of the parsed response logged at debug level.
const RESPONSE_PREVIEW_CHARS: usize = 800;

/// Send the PDF to the digitization endpoint and persist the JSON response.
///
/// Nothing is written unless the provider answers with a successful,
/// JSON-decodable body; the provider's status and body travel in the error.
pub fn run_document_parse(
    settings: &Settings,
    client: &dyn DocumentAi,
    source_pdf: &Path,
    dir: &ArtifactDir,
) -> Result<PathBuf, PipelineError> {
    if !source_pdf.is_file() {
        return Err(PipelineError::SourceNotFound(source_pdf.to_path_buf()));
    }
    let document = std::fs::read(source_pdf)?;
    let file_name = source_pdf
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("policy.pdf");

    let request = DocumentParseRequest {
        document: &document,
        file_name,
        model: &settings.document_parse_model,
        ocr: &settings.document_parse_ocr,
    };

    let response = client.parse_document(&request).map_err(|e| {
        match &e {
            UpstageError::Api { status, body } | UpstageError::MalformedBody { status, body } => {
                tracing::warn!(status, body = %body, "Document parse rejected");
            }
            other => tracing::warn!(error = %other, "Document parse request failed"),
        }
        PipelineError::DocumentParse(e)
    })?;

    let path = dir.write_json(Artifact::DocumentParse, &response)?;
    tracing::info!(path = %path.display(), "Saved document parse result");
    tracing::debug!(
        preview = %preview(&response.to_string(), RESPONSE_PREVIEW_CHARS),
        "Document parse preview"
    );
    Ok(path)
}
