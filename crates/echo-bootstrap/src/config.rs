//! Command-line and environment configuration.
//!
//! The runtime API address normally arrives through
//! `AWS_LAMBDA_RUNTIME_API`; every flag can also be set from the
//! environment so the bootstrap runs unmodified inside the platform.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use echo_core::{EndpointError, RuntimeEndpoint};
use echo_runtime::FailurePolicy;
use thiserror::Error;

pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

#[derive(Debug, Parser)]
#[command(
    name = "bootstrap",
    about = "Custom runtime bootstrap that echoes each invocation back as {\"receive\":<payload>}",
    version
)]
pub struct Cli {
    /// Runtime API address (host:port).
    #[arg(long, env = RUNTIME_API_ENV)]
    pub runtime_api: Option<String>,

    /// Log output format.
    #[arg(long, env = "ECHO_BOOTSTRAP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Consecutive failed polls to tolerate before exiting. 0 exits on the
    /// first failure.
    #[arg(long, env = "ECHO_BOOTSTRAP_NEXT_RETRIES", default_value_t = 0)]
    pub next_retries: u32,

    /// Delay before the first retry, in milliseconds. Doubles per attempt.
    #[arg(long, env = "ECHO_BOOTSTRAP_RETRY_BACKOFF_MS", default_value_t = 100)]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} is not defined", RUNTIME_API_ENV)]
    MissingRuntimeApi,

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Resolved settings for one bootstrap process.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub endpoint: RuntimeEndpoint,
    pub policy: FailurePolicy,
}

impl BootstrapConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let runtime_api = cli
            .runtime_api
            .as_deref()
            .ok_or(ConfigError::MissingRuntimeApi)?;
        let endpoint = RuntimeEndpoint::new(runtime_api)?;
        let policy = FailurePolicy::with_retries(
            cli.next_retries,
            Duration::from_millis(cli.retry_backoff_ms),
        );
        Ok(Self { endpoint, policy })
    }
}
