//! Runtime API endpoint resolution.
//!
//! The control plane is addressed by a bare `host:port` string. Both URLs
//! the bootstrap needs are derived from it; the next-invocation URL is
//! built once up front so a malformed address fails before any request.

use http::Uri;

use crate::error::{EndpointError, EndpointResult};

const INVOCATION_PREFIX: &str = "/runtime/invocation";

/// Immutable handle on the Runtime API address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEndpoint {
    host_port: String,
    next_invocation: Uri,
}

impl RuntimeEndpoint {
    /// Resolve a `host:port` address.
    ///
    /// Fails if the address is empty, does not form a valid URL, or carries
    /// anything beyond an authority (a path, query, or scheme).
    pub fn new(host_port: impl Into<String>) -> EndpointResult<Self> {
        let host_port = host_port.into();
        if host_port.trim().is_empty() {
            return Err(EndpointError::Empty);
        }

        let next_invocation = parse_url(format!("http://{host_port}{INVOCATION_PREFIX}/next"))?;
        let authority = next_invocation.authority().map(|a| a.as_str());
        if authority != Some(host_port.as_str()) {
            return Err(EndpointError::NotHostPort(host_port));
        }

        Ok(Self {
            host_port,
            next_invocation,
        })
    }

    /// The `host:port` this endpoint was built from.
    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// `http://<host:port>/runtime/invocation/next`
    pub fn next_invocation(&self) -> &Uri {
        &self.next_invocation
    }

    /// `http://<host:port>/runtime/invocation/<request_id>/response`
    ///
    /// The request id is spliced in as-is. Only ids that leave the result
    /// unparsable as a URI are rejected.
    pub fn invocation_response(&self, request_id: &str) -> EndpointResult<Uri> {
        parse_url(format!(
            "http://{}{INVOCATION_PREFIX}/{request_id}/response",
            self.host_port
        ))
    }
}

fn parse_url(url: String) -> EndpointResult<Uri> {
    match url.parse::<Uri>() {
        Ok(uri) => Ok(uri),
        Err(source) => Err(EndpointError::InvalidUrl { url, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_invocation_url() {
        let endpoint = RuntimeEndpoint::new("localhost:9001").unwrap();
        assert_eq!(
            endpoint.next_invocation().to_string(),
            "http://localhost:9001/runtime/invocation/next"
        );
    }

    #[test]
    fn invocation_response_url() {
        let endpoint = RuntimeEndpoint::new("127.0.0.1:9001").unwrap();
        let url = endpoint.invocation_response("abc123").unwrap();
        assert_eq!(
            url.to_string(),
            "http://127.0.0.1:9001/runtime/invocation/abc123/response"
        );
    }

    #[test]
    fn urls_follow_any_host_port() {
        for host_port in ["localhost:9001", "10.0.0.7:80", "runtime.internal:65535", "[::1]:9001"] {
            let endpoint = RuntimeEndpoint::new(host_port).unwrap();
            assert_eq!(endpoint.host_port(), host_port);
            assert_eq!(
                endpoint.next_invocation().to_string(),
                format!("http://{host_port}/runtime/invocation/next")
            );
            assert_eq!(
                endpoint.invocation_response("42").unwrap().to_string(),
                format!("http://{host_port}/runtime/invocation/42/response")
            );
        }
    }

    #[test]
    fn uuid_request_id() {
        let endpoint = RuntimeEndpoint::new("localhost:9001").unwrap();
        let id = "8476a536-e9f4-11e8-9739-2dfe598c3fcd";
        let url = endpoint.invocation_response(id).unwrap();
        assert_eq!(url.path(), format!("/runtime/invocation/{id}/response"));
    }

    #[test]
    fn empty_address_rejected() {
        assert!(matches!(RuntimeEndpoint::new(""), Err(EndpointError::Empty)));
        assert!(matches!(RuntimeEndpoint::new("   "), Err(EndpointError::Empty)));
    }

    #[test]
    fn malformed_address_rejected() {
        assert!(matches!(
            RuntimeEndpoint::new("local host:9001"),
            Err(EndpointError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn address_with_path_rejected() {
        assert!(matches!(
            RuntimeEndpoint::new("localhost:9001/extra"),
            Err(EndpointError::NotHostPort(_))
        ));
    }

    #[test]
    fn request_id_is_spliced_verbatim() {
        let endpoint = RuntimeEndpoint::new("localhost:9001").unwrap();
        assert_eq!(
            endpoint.invocation_response("").unwrap().to_string(),
            "http://localhost:9001/runtime/invocation//response"
        );
        assert_eq!(
            endpoint.invocation_response("a/b").unwrap().to_string(),
            "http://localhost:9001/runtime/invocation/a/b/response"
        );
    }

    #[test]
    fn request_id_with_space_is_invalid_url() {
        let endpoint = RuntimeEndpoint::new("localhost:9001").unwrap();
        assert!(matches!(
            endpoint.invocation_response("a b"),
            Err(EndpointError::InvalidUrl { .. })
        ));
    }
}
