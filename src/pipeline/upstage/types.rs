use serde::{Deserialize, Serialize};

use super::UpstageError;

/// One chat-completion message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Document-parse request as sent to the digitization endpoint.
#[derive(Debug, Clone)]
pub struct DocumentParseRequest<'a> {
    pub document: &'a [u8],
    pub file_name: &'a str,
    pub model: &'a str,
    pub ocr: &'a str,
}

/// External document-AI capabilities consumed by the pipeline stages
/// (allows mocking).
pub trait DocumentAi: Send + Sync {
    /// Binary document in, full structured JSON out.
    fn parse_document(
        &self,
        request: &DocumentParseRequest<'_>,
    ) -> Result<serde_json::Value, UpstageError>;

    /// Base64 document plus JSON Schema in, the model's message content out.
    fn extract_information(
        &self,
        model: &str,
        document_base64: &str,
        schema: &serde_json::Value,
    ) -> Result<String, UpstageError>;

    /// Chat completion; returns the first choice's message content.
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, UpstageError>;
}
