//! `POST /analyze`: upload a policy PDF and run the whole pipeline.
//!
//! The request blocks until all five stages finish; there is no job queue.

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{AnalyzeResponse, ApiContext};
use crate::config::Settings;
use crate::pipeline::artifacts::{AnalysisId, Artifact};
use crate::pipeline::processor::PolicyPipeline;
use crate::pipeline::recovery::RiskPayload;
use crate::pipeline::PipelineError;

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";
/// Longest sanitized upload name kept on disk.
const MAX_FILENAME_CHARS: usize = 100;

pub async fn analyze(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("policy.pdf").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read upload bytes: {e}");
            ApiError::BadRequest("Failed to read file data.".into())
        })?;
        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided.".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty.".into()));
    }

    let analysis_id = AnalysisId::generate();
    tracing::info!(
        analysis_id = %analysis_id,
        filename = %filename,
        size = bytes.len(),
        "Analysis requested"
    );

    let pipeline = ctx.pipeline.clone();
    let id = analysis_id.clone();
    let result = tokio::task::spawn_blocking(move || run_upload(&pipeline, &id, &filename, &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {e}")))?;

    let (risk, has_md) = result.map_err(|e| ApiError::pipeline(analysis_id.clone(), &e))?;

    Ok(Json(AnalyzeResponse {
        ok: true,
        analysis_id,
        has_md,
        risk,
    }))
}

/// Persist the upload, run every stage, then read the report back normalized.
fn run_upload(
    pipeline: &PolicyPipeline,
    analysis_id: &AnalysisId,
    filename: &str,
    bytes: &[u8],
) -> Result<(RiskPayload, bool), PipelineError> {
    let upload_path = persist_upload(pipeline.settings(), analysis_id, filename, bytes)?;
    let outcome = pipeline.run(&upload_path, Some(analysis_id))?;

    let dir = pipeline.store().resolve(outcome.analysis_id.as_ref())?;
    let risk = RiskPayload::normalize(dir.read_json(Artifact::RiskReport)?);
    Ok((risk, dir.exists(Artifact::ReportMarkdown)))
}

/// Write the upload to `{samples}/{analysis_id}_{sanitized name}`.
fn persist_upload(
    settings: &Settings,
    analysis_id: &AnalysisId,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, PipelineError> {
    let samples = settings.samples_dir();
    std::fs::create_dir_all(&samples)?;
    let path = samples.join(upload_file_name(analysis_id, filename));
    std::fs::write(&path, bytes)?;
    tracing::debug!(path = %path.display(), "Upload saved");
    Ok(path)
}

fn upload_file_name(analysis_id: &AnalysisId, filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    format!("{analysis_id}_{}", sanitize_filename(base))
}

/// Sanitize a client-supplied filename for use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\\' && c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // No `..` may survive into a path.
    let sanitized = sanitized.replace("..", "");
    let sanitized: String = sanitized.chars().take(MAX_FILENAME_CHARS).collect();

    if sanitized.is_empty() {
        "policy.pdf".into()
    } else {
        sanitized
    }
}
