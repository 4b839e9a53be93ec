pub mod artifacts; // Per-analysis artifact directories
pub mod upstage; // Document AI client and mock
pub mod prompt; // Risk prompt and extraction schema
pub mod recovery; // Tolerant JSON recovery, normalize-on-read
pub mod types; // Lenient risk report view
pub mod document_parse; // Stage 1
pub mod text_extract; // Stage 2
pub mod information_extract; // Stage 3
pub mod risk_assess; // Stage 4
pub mod report_render; // Stage 5
pub mod processor; // Runs the five stages for one analysis

use std::path::PathBuf;

use thiserror::Error;

use artifacts::ArtifactError;
use upstage::UpstageError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source PDF not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Document parse failed: {0}")]
    DocumentParse(#[source] UpstageError),

    #[error("dp_result.json has no content.html")]
    MissingHtml,

    #[error("Information extraction failed: {0}")]
    InformationExtract(#[source] UpstageError),

    #[error("Risk assessment failed: {0}")]
    RiskAssess(#[source] UpstageError),

    #[error("Upstage client error: {0}")]
    Client(#[from] UpstageError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DocumentParse,
    TextExtract,
    InformationExtract,
    RiskAssess,
    ReportRender,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::DocumentParse,
        Stage::TextExtract,
        Stage::InformationExtract,
        Stage::RiskAssess,
        Stage::ReportRender,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::DocumentParse => "document_parse",
            Stage::TextExtract => "text_extract",
            Stage::InformationExtract => "information_extract",
            Stage::RiskAssess => "risk_assess",
            Stage::ReportRender => "report_render",
        }
    }

    /// The artifact this stage writes.
    pub fn output(self) -> artifacts::Artifact {
        use artifacts::Artifact;
        match self {
            Stage::DocumentParse => Artifact::DocumentParse,
            Stage::TextExtract => Artifact::PlainText,
            Stage::InformationExtract => Artifact::InformationExtract,
            Stage::RiskAssess => Artifact::RiskReport,
            Stage::ReportRender => Artifact::ReportMarkdown,
        }
    }
}
