//! verid — biometric identity verification CLI.
//!
//! Every invocation prints exactly one JSON object to stdout. Failures
//! become `{"error": "..."}` with exit code 1, except the deliberate
//! no-face case, which is an error payload with exit code 0 so callers can
//! tell "nobody there" apart from "something went wrong". Logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use verid_core::pipeline::{FaceVerifier, PipelineError};
use verid_ocr::Tesseract;

mod config;
use config::Config;

#[derive(Parser)]
#[command(name = "verid", about = "Biometric identity verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a 128-d face embedding from an image and persist the face crop
    Embed {
        /// Image file containing exactly one face
        image: PathBuf,
    },
    /// Compare two embeddings stored as whitespace-delimited text files
    Compare {
        first: PathBuf,
        second: PathBuf,
    },
    /// Extract identity fields from a photographed document
    Extract {
        /// Document image file
        image: PathBuf,
    },
}

/// Boundary failure: a JSON error payload plus whether the process still
/// exits 0.
struct Failure {
    message: String,
    exit_zero: bool,
}

fn fatal(err: impl std::fmt::Display) -> Failure {
    Failure { message: err.to_string(), exit_zero: false }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Usage errors also honor the one-JSON-object contract.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            return ExitCode::FAILURE;
        }
        Err(e) => {
            // --help / --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };
    let config = Config::from_env();
    tracing::debug!(model_dir = %config.model_dir.display(), "configuration loaded");

    match run(cli.command, &config) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            println!("{}", serde_json::json!({ "error": failure.message }));
            if failure.exit_zero {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<String, Failure> {
    match command {
        Commands::Embed { image } => {
            let mut verifier = FaceVerifier::load(
                &config.detector_model_path(),
                &config.recognizer_model_path(),
            )
            .map_err(fatal)?;

            let extraction = verifier.extract(&image).map_err(|e| match e {
                PipelineError::NoFaceDetected => Failure {
                    message: e.to_string(),
                    exit_zero: true,
                },
                other => fatal(other),
            })?;
            serde_json::to_string(&extraction).map_err(fatal)
        }
        Commands::Compare { first, second } => {
            let a = verid_core::read_embedding(&first).map_err(fatal)?;
            let b = verid_core::read_embedding(&second).map_err(fatal)?;
            let result = verid_core::compare(a.values(), b.values()).map_err(fatal)?;
            serde_json::to_string(&result).map_err(fatal)
        }
        Commands::Extract { image } => {
            let engine = Tesseract::new(config.tesseract_bin.clone());
            let fields = verid_ocr::extract(&image, &engine).map_err(fatal)?;
            serde_json::to_string(&fields).map_err(fatal)
        }
    }
}
