//! Artifact retrieval by analysis identifier.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DownloadQuery};
use crate::pipeline::artifacts::{AnalysisId, Artifact, ArtifactDir, ArtifactError};
use crate::pipeline::recovery::RiskPayload;

/// `GET /download/risk?analysis_id=`: the normalized risk report JSON.
pub async fn risk(
    State(ctx): State<ApiContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<RiskPayload>, ApiError> {
    let (id, dir) = locate(&ctx, &query, Artifact::RiskReport)?;
    let stored = dir
        .read_json(Artifact::RiskReport)
        .map_err(|e| unreadable(&id, Artifact::RiskReport, &e))?;
    Ok(Json(RiskPayload::normalize(stored)))
}

/// `GET /download/md?analysis_id=`: the rendered report as a file download.
pub async fn markdown(
    State(ctx): State<ApiContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let (id, dir) = locate(&ctx, &query, Artifact::ReportMarkdown)?;
    let markdown = dir
        .read_text(Artifact::ReportMarkdown)
        .map_err(|e| unreadable(&id, Artifact::ReportMarkdown, &e))?;

    let headers = [
        (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"policy-risk-report-{id}.md\""),
        ),
    ];
    Ok((headers, markdown).into_response())
}

/// Resolve the directory holding `artifact` for the requested analysis.
/// Malformed and unknown identifiers are both reported as not found.
fn locate(
    ctx: &ApiContext,
    query: &DownloadQuery,
    artifact: Artifact,
) -> Result<(AnalysisId, ArtifactDir), ApiError> {
    let raw = query
        .analysis_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("analysis_id is required".into()))?;
    let not_found = || ApiError::NotFound(format!("{artifact} not found for analysis_id={raw}"));

    let id = AnalysisId::parse(raw).map_err(|_| not_found())?;
    let dir = ctx.store().lookup(&id).ok_or_else(not_found)?;
    if !dir.exists(artifact) {
        return Err(not_found());
    }
    Ok((id, dir))
}

/// A present but corrupt artifact is reported like an absent one.
fn unreadable(id: &AnalysisId, artifact: Artifact, err: &ArtifactError) -> ApiError {
    tracing::warn!(analysis_id = %id, %artifact, error = %err, "Stored artifact unreadable");
    ApiError::NotFound(format!("{artifact} is unreadable for analysis_id={id}"))
}
