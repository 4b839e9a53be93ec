//! Stage 5: report render. `risk_report.json` → `report.md`.

use std::path::PathBuf;

use super::artifacts::{Artifact, ArtifactDir};
use super::recovery::RiskPayload;
use super::types::{Finding, RiskReport};
use super::PipelineError;

const TITLE: &str = "# Policy Risk Report\n";
const INTRO: &str = "> 본 리포트는 정책 문서를 기반으로 개인정보 처리 리스크를 구조적으로 식별하고, 법적·운영상 개선 포인트를 제안합니다.\n";
const NOT_AVAILABLE: &str = "N/A";

/// Load the stored report (normalizing the wrapper shape) and write Markdown.
pub fn run_report_render(dir: &ArtifactDir) -> Result<PathBuf, PipelineError> {
    let stored = dir.read_json(Artifact::RiskReport)?;
    let payload = RiskPayload::normalize(stored);
    if !payload.is_parsed() {
        tracing::warn!("Risk report is unparsed model output, rendering raw text");
    }

    let markdown = render_markdown(&payload);
    let path = dir.write_text(Artifact::ReportMarkdown, &markdown)?;
    tracing::info!(path = %path.display(), "Saved Markdown report");
    Ok(path)
}

/// Render the fixed report template. Absent fields render as `N/A` or are skipped.
pub fn render_markdown(payload: &RiskPayload) -> String {
    let report = match payload {
        RiskPayload::Parsed(value) => RiskReport::from_value(value),
        RiskPayload::Unparsed { .. } => RiskReport::default(),
    };

    let mut lines: Vec<String> = vec![TITLE.to_string(), INTRO.to_string()];
    lines.push(format!(
        "- Risk Score: **{}**",
        report.risk_score.as_deref().unwrap_or(NOT_AVAILABLE)
    ));
    lines.push(format!(
        "- Risk Level: **{}**\n",
        report.risk_level.as_deref().unwrap_or(NOT_AVAILABLE)
    ));

    if let RiskPayload::Unparsed { raw_text, note } = payload {
        render_raw_output(&mut lines, raw_text, note);
    }

    lines.push("## Top Findings\n".to_string());
    for (i, finding) in report.top_findings.iter().enumerate() {
        render_finding(&mut lines, i + 1, finding);
    }

    lines.push("## Quick Checklist\n".to_string());
    push_bullets(&mut lines, &report.quick_checklist);
    lines.push(String::new());

    lines.push("## Assumptions & Limits\n".to_string());
    push_bullets(&mut lines, &report.assumptions_and_limits);
    lines.push(String::new());

    lines.join("\n")
}

fn render_finding(lines: &mut Vec<String>, number: usize, finding: &Finding) {
    let title = finding.title.as_deref().unwrap_or(NOT_AVAILABLE);
    match finding.severity.as_deref() {
        Some(severity) => lines.push(format!("### {number}. {title} ({severity})\n")),
        None => lines.push(format!("### {number}. {title}\n")),
    }
    lines.push(format!(
        "**Why it matters**: {}\n",
        finding.why_it_matters.as_deref().unwrap_or(NOT_AVAILABLE)
    ));

    if !finding.evidence_quotes.is_empty() {
        lines.push("**Evidence quotes**:".to_string());
        push_bullets(lines, &finding.evidence_quotes);
        lines.push(String::new());
    }

    lines.push("**Recommendations**:".to_string());
    push_bullets(lines, &finding.recommendations);
    lines.push(String::new());
}

fn render_raw_output(lines: &mut Vec<String>, raw_text: &str, note: &str) {
    // Fence must outlast any backtick run inside the model output.
    let longest_run = raw_text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);

    lines.push("## Model Output\n".to_string());
    lines.push(format!("_{note}_\n"));
    lines.push(fence.clone());
    lines.push(raw_text.to_string());
    lines.push(fence);
    lines.push(String::new());
}

fn push_bullets(lines: &mut Vec<String>, items: &[String]) {
    lines.extend(items.iter().map(|item| format!("- {item}")));
}
