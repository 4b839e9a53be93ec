//! Stage 2: text extract. `dp_result.json` → `plain_text.txt`.
//!
//! Keeps the text of `h1`, `h2`, `h3` and `p` elements in document order,
//! one element per line. Nested matches each yield their own line.

use std::path::PathBuf;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;

use super::artifacts::{Artifact, ArtifactDir};
use super::upstage::preview;
use super::PipelineError;

const TEXT_PREVIEW_CHARS: usize = 1000;

/// Elements whose character data is never visible text.
const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

static KEPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2, h3, p").unwrap());

/// Read the parse response, flatten `content.html`, write `plain_text.txt`.
pub fn run_text_extract(dir: &ArtifactDir) -> Result<PathBuf, PipelineError> {
    let response = dir.read_json(Artifact::DocumentParse)?;
    let html = response
        .pointer("/content/html")
        .and_then(Value::as_str)
        .ok_or(PipelineError::MissingHtml)?;

    let text = html_to_plain_text(html);
    let path = dir.write_text(Artifact::PlainText, &text)?;
    tracing::info!(
        path = %path.display(),
        chars = text.chars().count(),
        "Saved plain text"
    );
    tracing::debug!(preview = %preview(&text, TEXT_PREVIEW_CHARS), "Plain text preview");
    Ok(path)
}

/// Flatten an HTML fragment to newline-joined heading and paragraph text.
///
/// Each text node is trimmed, and an element's nodes are concatenated
/// without separators. Elements with no text are dropped.
pub fn html_to_plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&KEPT)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else { continue };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| RAW_TEXT_TAGS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text.trim());
        }
    }
    out
}
