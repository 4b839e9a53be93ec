//! Artifact store: one isolated directory per analysis.
//!
//! ```text
//! {data}/outputs/{analysis_id}/
//!   dp_result.json
//!   plain_text.txt
//!   ie_result.json
//!   risk_report.json
//!   report.md
//! ```
//!
//! Runs without an analysis identifier share `{data}/outputs/` directly.
//! Concurrent runs in that mode overwrite each other's artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

/// Maximum accepted length for a caller-supplied analysis identifier.
const MAX_ID_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Invalid analysis id: {0:?}")]
    InvalidId(String),

    #[error("{artifact} not found: {}", .path.display())]
    Missing { artifact: Artifact, path: PathBuf },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The fixed set of files produced for one analysis, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    DocumentParse,
    PlainText,
    InformationExtract,
    RiskReport,
    ReportMarkdown,
}

impl Artifact {
    pub const ALL: [Artifact; 5] = [
        Artifact::DocumentParse,
        Artifact::PlainText,
        Artifact::InformationExtract,
        Artifact::RiskReport,
        Artifact::ReportMarkdown,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::DocumentParse => "dp_result.json",
            Artifact::PlainText => "plain_text.txt",
            Artifact::InformationExtract => "ie_result.json",
            Artifact::RiskReport => "risk_report.json",
            Artifact::ReportMarkdown => "report.md",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Identifier scoping one pipeline run and its artifact directory.
///
/// Restricted to ASCII alphanumerics, `-` and `_` so it is always a single
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, ArtifactError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ArtifactError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps analysis identifiers to their output directories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve (and create) the directory for an analysis. `None` selects the
    /// shared legacy directory.
    pub fn resolve(&self, analysis_id: Option<&AnalysisId>) -> Result<ArtifactDir, ArtifactError> {
        let dir = self.path_for(analysis_id);
        std::fs::create_dir_all(&dir)?;
        Ok(ArtifactDir { dir })
    }

    /// Resolve an existing analysis directory without creating anything.
    pub fn lookup(&self, analysis_id: &AnalysisId) -> Option<ArtifactDir> {
        let dir = self.path_for(Some(analysis_id));
        dir.is_dir().then_some(ArtifactDir { dir })
    }

    fn path_for(&self, analysis_id: Option<&AnalysisId>) -> PathBuf {
        match analysis_id {
            Some(id) => self.root.join(id.as_str()),
            None => self.root.clone(),
        }
    }
}

/// One analysis' output directory. All stage I/O goes through here.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.artifact_path(artifact).is_file()
    }

    /// Path of an input artifact that must already exist.
    pub fn require(&self, artifact: Artifact) -> Result<PathBuf, ArtifactError> {
        let path = self.artifact_path(artifact);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ArtifactError::Missing { artifact, path })
        }
    }

    pub fn read_json(&self, artifact: Artifact) -> Result<serde_json::Value, ArtifactError> {
        let path = self.require(artifact)?;
        let text = std::fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|source| ArtifactError::Json { path, source })
    }

    pub fn read_text(&self, artifact: Artifact) -> Result<String, ArtifactError> {
        let path = self.require(artifact)?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// Pretty-printed UTF-8 JSON; non-ASCII text is written as-is.
    pub fn write_json<T: Serialize>(
        &self,
        artifact: Artifact,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.artifact_path(artifact);
        let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json.as_bytes())?;
        tracing::debug!(path = %path.display(), size = json.len(), "Artifact written");
        Ok(path)
    }

    pub fn write_text(&self, artifact: Artifact, text: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.artifact_path(artifact);
        std::fs::write(&path, text.as_bytes())?;
        tracing::debug!(path = %path.display(), size = text.len(), "Artifact written");
        Ok(path)
    }
}
