use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "policy-risk", version, about = "Privacy-policy PDF risk assessment")]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run all five stages for one PDF.
    Pipeline {
        pdf: PathBuf,
        /// Isolates outputs under `outputs/{id}`; omitted, the shared directory is used.
        analysis_id: Option<String>,
    },
    /// Serve the HTTP API.
    Serve {
        /// Overrides POLICY_RISK_BIND.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Send a one-line prompt to the chat model and print the reply.
    Smoketest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn pipeline_id_is_optional() {
        let args = Args::try_parse_from(["policy-risk", "pipeline", "policy.pdf"]).unwrap();
        match args.command {
            Command::Pipeline { pdf, analysis_id } => {
                assert_eq!(pdf, PathBuf::from("policy.pdf"));
                assert!(analysis_id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::try_parse_from(["policy-risk", "pipeline", "p.pdf", "run-1"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Pipeline { analysis_id: Some(ref id), .. } if id == "run-1"
        ));
    }

    #[test]
    fn serve_accepts_bind_override() {
        let args = Args::try_parse_from(["policy-risk", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:9000"
        ));
    }
}
