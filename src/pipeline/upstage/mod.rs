pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstageError {
    #[error("Upstage API unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Upstage returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Upstage returned a non-JSON body (status {status}): {body}")]
    MalformedBody { status: u16, body: String },

    #[error("Response missing message content")]
    MissingContent,

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Truncate a response body for error messages and logs.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
