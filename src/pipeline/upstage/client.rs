use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use super::types::{ChatMessage, DocumentAi, DocumentParseRequest};
use super::{preview, UpstageError};
use crate::config::Settings;

/// Maximum body characters carried into error values.
const ERROR_BODY_PREVIEW: usize = 1000;

/// Upstage HTTP client (document digitization, information extraction, chat).
pub struct UpstageClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    document_parse_timeout: Duration,
}

impl UpstageClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        document_parse_timeout: Duration,
    ) -> Result<Self, UpstageError> {
        // Only document-parse bounds its wait; the builder default would cap
        // every call at 30s.
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| UpstageError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            document_parse_timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, UpstageError> {
        Self::new(
            &settings.base_url,
            &settings.api_key,
            settings.document_parse_timeout,
        )
    }

    fn map_send_error(&self, e: reqwest::Error, timeout: Option<Duration>) -> UpstageError {
        if e.is_connect() {
            UpstageError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            UpstageError::Timeout(timeout.map(|t| t.as_secs()).unwrap_or_default())
        } else {
            UpstageError::HttpClient(e.to_string())
        }
    }

    fn post_chat<T: Serialize>(&self, url: &str, body: &T) -> Result<String, UpstageError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e, None))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| UpstageError::HttpClient(e.to_string()))?;
        if !status.is_success() {
            return Err(UpstageError::Api {
                status: status.as_u16(),
                body: preview(&text, ERROR_BODY_PREVIEW),
            });
        }

        let value: Value = serde_json::from_str(&text).map_err(|_| UpstageError::MalformedBody {
            status: status.as_u16(),
            body: preview(&text, ERROR_BODY_PREVIEW),
        })?;
        message_content(&value)
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
pub fn message_content(value: &Value) -> Result<String, UpstageError> {
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(UpstageError::MissingContent)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

impl DocumentAi for UpstageClient {
    fn parse_document(
        &self,
        request: &DocumentParseRequest<'_>,
    ) -> Result<Value, UpstageError> {
        let url = format!("{}/document-digitization", self.base_url);
        let part = reqwest::blocking::multipart::Part::bytes(request.document.to_vec())
            .file_name(request.file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| UpstageError::HttpClient(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("document", part)
            .text("model", request.model.to_string())
            .text("ocr", request.ocr.to_string());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.document_parse_timeout)
            .multipart(form)
            .send()
            .map_err(|e| self.map_send_error(e, Some(self.document_parse_timeout)))?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), "Document parse responded");

        let text = response
            .text()
            .map_err(|e| UpstageError::HttpClient(e.to_string()))?;
        if !status.is_success() {
            return Err(UpstageError::Api {
                status: status.as_u16(),
                body: preview(&text, ERROR_BODY_PREVIEW),
            });
        }

        serde_json::from_str(&text).map_err(|_| UpstageError::MalformedBody {
            status: status.as_u16(),
            body: preview(&text, ERROR_BODY_PREVIEW),
        })
    }

    fn extract_information(
        &self,
        model: &str,
        document_base64: &str,
        schema: &Value,
    ) -> Result<String, UpstageError> {
        let url = format!("{}/information-extraction/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [{
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:application/octet-stream;base64,{document_base64}")
                    }
                }]
            }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "privacy_policy_schema",
                    "schema": schema
                }
            }
        });
        self.post_chat(&url, &body)
    }

    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, UpstageError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages,
            stream: false,
        };
        self.post_chat(&url, &body)
    }
}

/// Canned mock outcome.
#[derive(Clone)]
enum Canned<T> {
    Ok(T),
    Api(u16, String),
    Malformed(u16, String),
}

impl<T: Clone> Canned<T> {
    fn get(&self) -> Result<T, UpstageError> {
        match self {
            Canned::Ok(value) => Ok(value.clone()),
            Canned::Api(status, body) => Err(UpstageError::Api {
                status: *status,
                body: body.clone(),
            }),
            Canned::Malformed(status, body) => Err(UpstageError::MalformedBody {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

/// Mock document-AI client for testing: returns configurable responses and
/// records which capabilities were called, in order.
pub struct MockDocumentAi {
    document_parse: Canned<Value>,
    extraction: Canned<String>,
    chat: Canned<String>,
    calls: Mutex<Vec<&'static str>>,
    chat_requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockDocumentAi {
    pub fn new() -> Self {
        Self {
            document_parse: Canned::Ok(json!({"content": {"html": ""}})),
            extraction: Canned::Ok("{}".to_string()),
            chat: Canned::Ok("{}".to_string()),
            calls: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_document_parse(mut self, response: Value) -> Self {
        self.document_parse = Canned::Ok(response);
        self
    }

    pub fn failing_document_parse(mut self, status: u16, body: &str) -> Self {
        self.document_parse = Canned::Api(status, body.to_string());
        self
    }

    /// Successful status with a body that is not JSON.
    pub fn malformed_document_parse(mut self, status: u16, body: &str) -> Self {
        self.document_parse = Canned::Malformed(status, body.to_string());
        self
    }

    pub fn with_extraction(mut self, content: &str) -> Self {
        self.extraction = Canned::Ok(content.to_string());
        self
    }

    pub fn failing_extraction(mut self, status: u16, body: &str) -> Self {
        self.extraction = Canned::Api(status, body.to_string());
        self
    }

    pub fn with_chat(mut self, content: &str) -> Self {
        self.chat = Canned::Ok(content.to_string());
        self
    }

    pub fn failing_chat(mut self, status: u16, body: &str) -> Self {
        self.chat = Canned::Api(status, body.to_string());
        self
    }

    /// Capabilities invoked so far, in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Message lists passed to `chat`, in call order.
    pub fn chat_requests(&self) -> Vec<Vec<ChatMessage>> {
        self.chat_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Default for MockDocumentAi {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAi for MockDocumentAi {
    fn parse_document(
        &self,
        _request: &DocumentParseRequest<'_>,
    ) -> Result<Value, UpstageError> {
        self.record("parse_document");
        self.document_parse.get()
    }

    fn extract_information(
        &self,
        _model: &str,
        _document_base64: &str,
        _schema: &Value,
    ) -> Result<String, UpstageError> {
        self.record("extract_information");
        self.extraction.get()
    }

    fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, UpstageError> {
        self.record("chat");
        if let Ok(mut requests) = self.chat_requests.lock() {
            requests.push(messages.to_vec());
        }
        self.chat.get()
    }
}
