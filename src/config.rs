use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "policy-risk-agent";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Upstage API credential.
pub const API_KEY_ENV: &str = "UPSTAGE_API_KEY";
/// Environment variable overriding the data root (`data/` by default).
pub const DATA_DIR_ENV: &str = "POLICY_RISK_DATA_DIR";
/// Environment variable overriding the Upstage API base URL.
pub const BASE_URL_ENV: &str = "UPSTAGE_BASE_URL";
/// Environment variable overriding the HTTP bind address.
pub const BIND_ENV: &str = "POLICY_RISK_BIND";

pub const DEFAULT_BASE_URL: &str = "https://api.upstage.ai/v1";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Document-parse model and OCR mode sent to the digitization endpoint.
pub const DOCUMENT_PARSE_MODEL: &str = "document-parse";
pub const DOCUMENT_PARSE_OCR: &str = "auto";
/// Only the document-parse call bounds its wait.
pub const DOCUMENT_PARSE_TIMEOUT_SECS: u64 = 90;

pub const INFORMATION_EXTRACT_MODEL: &str = "information-extract";
pub const CHAT_MODEL: &str = "solar-pro2";

/// Character budget for the policy text handed to the risk model.
pub const MAX_POLICY_CHARS: usize = 16_000;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "policy_risk_lib=info,policy_risk=info,tower_http=info"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("UPSTAGE_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid bind address '{0}': {1}")]
    InvalidBind(String, std::net::AddrParseError),
}

/// Run configuration, resolved once and passed explicitly to every stage.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub document_parse_model: String,
    pub document_parse_ocr: String,
    pub document_parse_timeout: Duration,
    pub information_extract_model: String,
    pub chat_model: String,
    pub max_policy_chars: usize,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("data_dir", &self.data_dir)
            .field("document_parse_model", &self.document_parse_model)
            .field("chat_model", &self.chat_model)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Build settings from a credential and a data root, using default models.
    pub fn new(api_key: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: data_dir.into(),
            document_parse_model: DOCUMENT_PARSE_MODEL.to_string(),
            document_parse_ocr: DOCUMENT_PARSE_OCR.to_string(),
            document_parse_timeout: Duration::from_secs(DOCUMENT_PARSE_TIMEOUT_SECS),
            information_extract_model: INFORMATION_EXTRACT_MODEL.to_string(),
            chat_model: CHAT_MODEL.to_string(),
            max_policy_chars: MAX_POLICY_CHARS,
        }
    }

    /// Load from the process environment. A missing credential is fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_ENV)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let mut settings = Self::new(api_key, data_dir);
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        Ok(settings)
    }

    /// Point the run at a different data root.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Root under which each analysis gets its own artifact directory.
    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    /// Where uploads and staged source PDFs live.
    pub fn samples_dir(&self) -> PathBuf {
        self.data_dir.join("samples")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Resolve the HTTP bind address from `POLICY_RISK_BIND` or the default.
pub fn bind_addr(explicit: Option<&str>) -> Result<SocketAddr, ConfigError> {
    let raw = explicit
        .map(str::to_string)
        .or_else(|| std::env::var(BIND_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    raw.parse()
        .map_err(|e| ConfigError::InvalidBind(raw.clone(), e))
}
