//! Analysis orchestrator.
//!
//! Drives the five stages strictly in order for one analysis:
//! document parse → text extract → information extract → risk assess → report render.
//!
//! Each stage reads its inputs from the analysis directory and writes one
//! artifact back; the first failure aborts the run. The external capability
//! is injected as a `DocumentAi` trait object so the whole run is testable
//! with `MockDocumentAi`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::artifacts::{AnalysisId, ArtifactStore};
use super::document_parse::run_document_parse;
use super::information_extract::run_information_extract;
use super::recovery::RiskPayload;
use super::report_render::run_report_render;
use super::risk_assess::run_risk_assess;
use super::text_extract::run_text_extract;
use super::upstage::{DocumentAi, UpstageClient};
use super::{PipelineError, Stage};
use crate::config::Settings;

/// Staged file name used when no analysis identifier is given.
const LEGACY_SOURCE_NAME: &str = "policy.pdf";

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub analysis_id: Option<AnalysisId>,
    pub output_dir: PathBuf,
    /// Artifact paths in the order they were written.
    pub artifacts: Vec<PathBuf>,
    pub extraction_degraded: bool,
    pub risk: RiskPayload,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Settings plus the external capability, shared by the CLI and the HTTP handlers.
pub struct PolicyPipeline {
    settings: Settings,
    client: Arc<dyn DocumentAi>,
    store: ArtifactStore,
}

impl PolicyPipeline {
    pub fn new(settings: Settings, client: Arc<dyn DocumentAi>) -> Self {
        let store = ArtifactStore::new(settings.outputs_dir());
        Self {
            settings,
            client,
            store,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run all five stages. Blocks until the last external call returns.
    pub fn run(
        &self,
        source_pdf: &Path,
        analysis_id: Option<&AnalysisId>,
    ) -> Result<PipelineOutcome, PipelineError> {
        run_pipeline(&self.settings, self.client.as_ref(), source_pdf, analysis_id)
    }
}

/// Run the full pipeline for one PDF.
///
/// The PDF is first copied to `{samples}/{analysis_id}.pdf` (or
/// `{samples}/policy.pdf` without an identifier); both the parse and the
/// extraction stage read that staged copy.
pub fn run_pipeline(
    settings: &Settings,
    client: &dyn DocumentAi,
    source_pdf: &Path,
    analysis_id: Option<&AnalysisId>,
) -> Result<PipelineOutcome, PipelineError> {
    if !source_pdf.is_file() {
        return Err(PipelineError::SourceNotFound(source_pdf.to_path_buf()));
    }

    let started_at = Utc::now();
    let span = tracing::info_span!(
        "analysis",
        analysis_id = analysis_id.map(AnalysisId::as_str).unwrap_or("legacy")
    );
    let _guard = span.enter();

    let dir = ArtifactStore::new(settings.outputs_dir()).resolve(analysis_id)?;
    let staged = stage_source(settings, source_pdf, analysis_id)?;
    tracing::info!(
        source = %source_pdf.display(),
        staged = %staged.display(),
        output_dir = %dir.path().display(),
        "Pipeline started"
    );

    let mut artifacts = Vec::with_capacity(Stage::ALL.len());

    log_stage(Stage::DocumentParse);
    artifacts.push(run_document_parse(settings, client, &staged, &dir)?);

    log_stage(Stage::TextExtract);
    artifacts.push(run_text_extract(&dir)?);

    log_stage(Stage::InformationExtract);
    let extraction = run_information_extract(settings, client, &staged, &dir)?;
    artifacts.push(extraction.path);

    log_stage(Stage::RiskAssess);
    let assessment = run_risk_assess(settings, client, &dir)?;
    artifacts.push(assessment.path);

    log_stage(Stage::ReportRender);
    artifacts.push(run_report_render(&dir)?);

    let finished_at = Utc::now();
    tracing::info!(
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        risk_parsed = assessment.payload.is_parsed(),
        "Pipeline complete"
    );

    Ok(PipelineOutcome {
        analysis_id: analysis_id.cloned(),
        output_dir: dir.path().to_path_buf(),
        artifacts,
        extraction_degraded: extraction.degraded,
        risk: assessment.payload,
        started_at,
        finished_at,
    })
}

fn log_stage(stage: Stage) {
    tracing::info!(stage = stage.as_str(), "Stage started");
}

/// Copy the source PDF into the samples directory under its conventional name.
fn stage_source(
    settings: &Settings,
    source_pdf: &Path,
    analysis_id: Option<&AnalysisId>,
) -> Result<PathBuf, PipelineError> {
    let samples = settings.samples_dir();
    std::fs::create_dir_all(&samples)?;

    let target = match analysis_id {
        Some(id) => samples.join(format!("{id}.pdf")),
        None => samples.join(LEGACY_SOURCE_NAME),
    };

    // Copying a file onto itself would truncate it.
    let same_file = target.exists()
        && std::fs::canonicalize(&target)? == std::fs::canonicalize(source_pdf)?;
    if !same_file {
        std::fs::copy(source_pdf, &target)?;
    }
    Ok(target)
}

/// Build a `PolicyPipeline` backed by the production Upstage client.
pub fn build_pipeline(settings: Settings) -> Result<PolicyPipeline, PipelineError> {
    let client = UpstageClient::from_settings(&settings)?;
    tracing::info!(
        base_url = %settings.base_url,
        chat_model = %settings.chat_model,
        outputs = %settings.outputs_dir().display(),
        "Policy pipeline ready"
    );
    Ok(PolicyPipeline::new(settings, Arc::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::artifacts::Artifact;
    use crate::pipeline::upstage::MockDocumentAi;
    use serde_json::json;

    fn risk_json() -> String {
        let finding = json!({
            "title": "보관 기간 불명확",
            "why_it_matters": "법적 위험",
            "evidence_quotes": ["관련 법령에 따라"],
            "recommendations": ["기간 명시"],
            "severity": "MEDIUM"
        });
        json!({
            "risk_score": 55,
            "risk_level": "MEDIUM",
            "top_findings": vec![finding; 5],
            "quick_checklist": ["보관 기간"],
            "assumptions_and_limits": ["텍스트만 검토"]
        })
        .to_string()
    }

    fn mock() -> MockDocumentAi {
        MockDocumentAi::new()
            .with_document_parse(json!({
                "content": {"html": "<h1>개인정보처리방침</h1><p>이름, 이메일을 수집합니다.</p>"}
            }))
            .with_extraction(r#"{"collected_personal_data": ["이름", "이메일"]}"#)
            .with_chat(&risk_json())
    }

    fn setup() -> (tempfile::TempDir, Settings, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::new("key", tmp.path().join("data"));
        let pdf = tmp.path().join("upload.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 policy").unwrap();
        (tmp, settings, pdf)
    }

    #[test]
    fn run_writes_all_five_artifacts_in_order() {
        let (_tmp, settings, pdf) = setup();
        let client = mock();
        let id = AnalysisId::parse("run-1").unwrap();

        let outcome = run_pipeline(&settings, &client, &pdf, Some(&id)).unwrap();

        let expected: Vec<PathBuf> = Artifact::ALL
            .iter()
            .map(|a| outcome.output_dir.join(a.file_name()))
            .collect();
        assert_eq!(outcome.artifacts, expected);
        assert!(expected.iter().all(|p| p.is_file()));
        assert_eq!(outcome.output_dir, settings.outputs_dir().join("run-1"));
        assert!(outcome.risk.is_parsed());
        assert!(!outcome.extraction_degraded);
        assert_eq!(
            client.calls(),
            vec!["parse_document", "extract_information", "chat"]
        );

        let text = std::fs::read_to_string(&expected[1]).unwrap();
        assert_eq!(text, "개인정보처리방침\n이름, 이메일을 수집합니다.");
        let md = std::fs::read_to_string(&expected[4]).unwrap();
        assert!(md.contains("### 5. 보관 기간 불명확 (MEDIUM)"));
    }

    #[test]
    fn source_is_staged_under_analysis_id() {
        let (_tmp, settings, pdf) = setup();
        let id = AnalysisId::parse("abc").unwrap();
        run_pipeline(&settings, &mock(), &pdf, Some(&id)).unwrap();

        let staged = settings.samples_dir().join("abc.pdf");
        assert_eq!(std::fs::read(staged).unwrap(), b"%PDF-1.4 policy");
    }

    #[test]
    fn legacy_mode_uses_shared_locations() {
        let (_tmp, settings, pdf) = setup();
        let outcome = run_pipeline(&settings, &mock(), &pdf, None).unwrap();

        assert_eq!(outcome.output_dir, settings.outputs_dir());
        assert!(settings.samples_dir().join("policy.pdf").is_file());
        assert!(settings.outputs_dir().join("report.md").is_file());
    }

    #[test]
    fn staging_a_file_onto_itself_keeps_content() {
        let (_tmp, settings, _pdf) = setup();
        std::fs::create_dir_all(settings.samples_dir()).unwrap();
        let in_place = settings.samples_dir().join("policy.pdf");
        std::fs::write(&in_place, b"%PDF-1.4 same").unwrap();

        run_pipeline(&settings, &mock(), &in_place, None).unwrap();
        assert_eq!(std::fs::read(&in_place).unwrap(), b"%PDF-1.4 same");
    }

    #[test]
    fn two_ids_produce_independent_directories() {
        let (_tmp, settings, pdf) = setup();
        let first = AnalysisId::parse("first").unwrap();
        let second = AnalysisId::parse("second").unwrap();

        let a = run_pipeline(&settings, &mock(), &pdf, Some(&first)).unwrap();
        let degraded = mock().with_chat("not json at all");
        let b = run_pipeline(&settings, &degraded, &pdf, Some(&second)).unwrap();

        assert_ne!(a.output_dir, b.output_dir);
        let first_report: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(a.output_dir.join("risk_report.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(first_report["risk_score"], 55);
        assert!(!b.risk.is_parsed());
    }

    #[test]
    fn failing_stage_aborts_remaining_stages() {
        let (_tmp, settings, pdf) = setup();
        let client = mock().failing_document_parse(401, "unauthorized");
        let id = AnalysisId::parse("fail").unwrap();

        let err = run_pipeline(&settings, &client, &pdf, Some(&id)).unwrap_err();
        assert!(matches!(err, PipelineError::DocumentParse(_)));
        assert_eq!(client.calls(), vec!["parse_document"]);

        let dir = settings.outputs_dir().join("fail");
        for artifact in Artifact::ALL {
            assert!(!dir.join(artifact.file_name()).exists(), "{artifact}");
        }
    }

    #[test]
    fn missing_html_stops_before_extraction() {
        let (_tmp, settings, pdf) = setup();
        let client = mock().with_document_parse(json!({"content": {}}));

        let err = run_pipeline(&settings, &client, &pdf, None).unwrap_err();
        assert!(matches!(err, PipelineError::MissingHtml));
        assert_eq!(client.calls(), vec!["parse_document"]);
        assert!(!settings.outputs_dir().join("plain_text.txt").exists());
    }

    #[test]
    fn missing_source_is_rejected_before_any_call() {
        let (tmp, settings, _pdf) = setup();
        let client = mock();

        let err = run_pipeline(&settings, &client, &tmp.path().join("nope.pdf"), None).unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound(_)));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn policy_pipeline_delegates_to_run() {
        let (_tmp, settings, pdf) = setup();
        let pipeline = PolicyPipeline::new(settings, Arc::new(mock()));
        let id = AnalysisId::generate();

        let outcome = pipeline.run(&pdf, Some(&id)).unwrap();
        assert_eq!(outcome.analysis_id, Some(id.clone()));
        assert!(pipeline.store().lookup(&id).is_some());
    }
}
