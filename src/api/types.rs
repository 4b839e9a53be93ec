//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pipeline::artifacts::{AnalysisId, ArtifactStore};
use crate::pipeline::processor::PolicyPipeline;
use crate::pipeline::recovery::RiskPayload;

/// Shared state for all routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<PolicyPipeline>,
}

impl ApiContext {
    pub fn new(pipeline: PolicyPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        self.pipeline.store()
    }
}

/// `POST /analyze` success body.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub analysis_id: AnalysisId,
    pub has_md: bool,
    /// Normalized risk report: the parsed object, or the wrapper when even the
    /// second-chance parse failed.
    pub risk: RiskPayload,
}

/// Query string of both download routes.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub analysis_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}
