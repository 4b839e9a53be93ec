mod cli;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use policy_risk_lib::api::{self, ApiContext};
use policy_risk_lib::config::{self, ConfigError, Settings};
use policy_risk_lib::pipeline::artifacts::{AnalysisId, ArtifactError};
use policy_risk_lib::pipeline::processor::build_pipeline;
use policy_risk_lib::pipeline::prompt::SMOKETEST_PROMPT;
use policy_risk_lib::pipeline::upstage::{ChatMessage, DocumentAi, UpstageClient, UpstageError};
use policy_risk_lib::pipeline::PipelineError;

use crate::cli::{Args, Command};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Smoketest failed: {0}")]
    Smoketest(#[from] UpstageError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Failed to encode outcome: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    policy_risk_lib::init_tracing();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "policy-risk failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    // The credential is checked before anything else runs.
    let settings = Settings::from_env()?;
    tracing::info!(
        version = config::APP_VERSION,
        data_dir = %settings.data_dir().display(),
        "{} starting",
        config::APP_NAME
    );

    match command {
        Command::Pipeline { pdf, analysis_id } => run_pipeline(settings, &pdf, analysis_id.as_deref()),
        Command::Serve { bind } => run_server(settings, bind.as_deref()),
        Command::Smoketest => run_smoketest(&settings),
    }
}

fn run_pipeline(settings: Settings, pdf: &Path, analysis_id: Option<&str>) -> Result<(), CliError> {
    let analysis_id = analysis_id.map(AnalysisId::parse).transpose()?;
    let pipeline = build_pipeline(settings)?;
    let outcome = pipeline.run(pdf, analysis_id.as_ref())?;

    for path in &outcome.artifacts {
        tracing::info!(path = %path.display(), "saved");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_server(settings: Settings, bind: Option<&str>) -> Result<(), CliError> {
    let addr = config::bind_addr(bind)?;
    // Built outside the runtime: the blocking HTTP client must not be created
    // or dropped on an async worker.
    let ctx = ApiContext::new(build_pipeline(settings)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve(addr, ctx.clone()))?;
    drop(runtime);
    drop(ctx);
    Ok(())
}

fn run_smoketest(settings: &Settings) -> Result<(), CliError> {
    let client = UpstageClient::from_settings(settings)?;
    let reply = client.chat(&settings.chat_model, &[ChatMessage::user(SMOKETEST_PROMPT)])?;
    tracing::info!(model = %settings.chat_model, "Chat model reachable");
    println!("{reply}");
    Ok(())
}
