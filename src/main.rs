//! prdash CLI entrypoint for the open pull request dashboard.

mod cli;

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use prdash::{FetchError, PrdashConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_FILTER_ENV: &str = "PRDASH_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), FetchError> {
    let config = load_config()?;
    config.validate()?;
    cli::dashboard::run(&config).await
}

fn init_logging() {
    // Logs go to stderr so the listing on stdout stays clean.
    let _ignored = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env(LOG_FILTER_ENV))
        .with_writer(io::stderr)
        .try_init();
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`FetchError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrdashConfig, FetchError> {
    PrdashConfig::load().map_err(|error| FetchError::Configuration {
        message: error.to_string(),
    })
}
