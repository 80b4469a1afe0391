//! bootstrap: the echo custom runtime entrypoint.
//!
//! Polls the Runtime API named by `AWS_LAMBDA_RUNTIME_API` and posts every
//! invocation payload back as `{"receive":<payload>}`.
//!
//! # Exit codes
//!
//! - `1`: the runtime API address is missing or unusable, or any flag or
//!   environment value fails to parse
//! - `2`: a next-invocation response could not be classified
//!
//! # Usage
//!
//! ```text
//! AWS_LAMBDA_RUNTIME_API=127.0.0.1:9001 bootstrap
//! ```

mod config;

use std::process::ExitCode;

use clap::Parser;
use echo_runtime::{HyperTransport, PollLoop, RuntimeError};
use tracing::{error, info};

use config::{BootstrapConfig, Cli, LogFormat};

const DEFAULT_FILTER: &str = "info,bootstrap=debug,echo_runtime=debug";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            // Unreadable flags and env values are configuration errors too.
            let _ = e.print();
            return ExitCode::from(RuntimeError::CONFIG_EXIT_CODE);
        }
    };

    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let config = match BootstrapConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid runtime configuration");
            return ExitCode::from(RuntimeError::CONFIG_EXIT_CODE);
        }
    };

    info!(
        runtime_api = %config.endpoint.host_port(),
        next_retries = config.policy.max_retries,
        "echo bootstrap starting"
    );

    let poll = PollLoop::new(config.endpoint, HyperTransport::new()).with_policy(config.policy);
    match poll.run().await {
        Ok(never) => match never {},
        Err(e) => {
            let code = e.exit_code();
            error!(error = %e, exit_code = code, "poll loop stopped");
            ExitCode::from(code)
        }
    }
}

/// Log to stdout, filtered by `RUST_LOG` when set.
fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => DEFAULT_FILTER.parse()?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!(e))
}
