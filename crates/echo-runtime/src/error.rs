//! Fatal runtime errors and their process exit codes.

use echo_core::EndpointError;
use thiserror::Error;

use crate::classify::ClassifyError;

/// Errors that stop the poll loop.
///
/// POST failures never show up here; they are logged and swallowed.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime API configuration: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("next invocation: {0}")]
    Classification(#[from] ClassifyError),
}

impl RuntimeError {
    /// Exit status for missing or unusable runtime API configuration.
    pub const CONFIG_EXIT_CODE: u8 = 1;

    /// Exit status for an unusable next-invocation response.
    pub const CLASSIFICATION_EXIT_CODE: u8 = 2;

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Endpoint(_) => Self::CONFIG_EXIT_CODE,
            Self::Classification(_) => Self::CLASSIFICATION_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let config = RuntimeError::from(EndpointError::Empty);
        assert_eq!(config.exit_code(), 1);

        let classify = RuntimeError::from(ClassifyError::MissingRequestId);
        assert_eq!(classify.exit_code(), 2);
    }

    #[test]
    fn display_includes_cause() {
        let err = RuntimeError::from(ClassifyError::MissingRequestId);
        assert_eq!(
            err.to_string(),
            "next invocation: header Lambda-Runtime-Aws-Request-Id not found"
        );
    }
}
