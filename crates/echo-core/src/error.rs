//! Error types for endpoint resolution.

use thiserror::Error;

/// Result type alias for endpoint resolution.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Errors raised while turning the runtime API address into URLs.
///
/// All of these are configuration errors: the bootstrap cannot talk to
/// its control plane and exits.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("runtime API address is empty")]
    Empty,

    #[error("runtime API address {0:?} is not a host:port pair")]
    NotHostPort(String),

    #[error("invalid runtime API url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}
