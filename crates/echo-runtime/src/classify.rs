//! Next-invocation response classification.
//!
//! Turns an [`HttpOutcome`] into an [`InvocationEnvelope`] or a
//! [`ClassifyError`]. A response without a request id is unusable: the
//! poll loop has nowhere to post the result.

use echo_core::{InvocationEnvelope, DEADLINE_HEADER, FUNCTION_ARN_HEADER, REQUEST_ID_HEADER};
use http::{HeaderMap, Uri};
use thiserror::Error;
use tracing::error;

use crate::transport::{HttpOutcome, TransportError};

/// Why a next-invocation response could not be used.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Uri,
        #[source]
        source: TransportError,
    },

    #[error("header {} not found", REQUEST_ID_HEADER)]
    MissingRequestId,

    #[error("header {} is not valid visible ASCII", REQUEST_ID_HEADER)]
    UnreadableRequestId,
}

/// Extract the request id from response headers.
pub fn request_id(headers: &HeaderMap) -> Result<&str, ClassifyError> {
    let value = headers
        .get(REQUEST_ID_HEADER)
        .ok_or(ClassifyError::MissingRequestId)?;
    value
        .to_str()
        .map_err(|_| ClassifyError::UnreadableRequestId)
}

/// Classify the outcome of a GET against `url` (the next-invocation URL).
///
/// Failures are logged here; the caller decides what to do with them.
pub fn classify(url: &Uri, outcome: HttpOutcome) -> Result<InvocationEnvelope, ClassifyError> {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(source) => {
            error!(%url, error = %source, "next invocation request failed");
            return Err(ClassifyError::Transport {
                url: url.clone(),
                source,
            });
        }
    };

    let id = match request_id(&resp.headers) {
        Ok(id) => id.to_string(),
        Err(e) => {
            error!(%url, status = %resp.status, error = %e, "next invocation response unusable");
            return Err(e);
        }
    };

    let mut envelope = InvocationEnvelope::new(id, resp.body);
    if let Some(deadline) = header_str(&resp.headers, DEADLINE_HEADER).and_then(|v| v.parse().ok()) {
        envelope = envelope.with_deadline_ms(deadline);
    }
    if let Some(arn) = header_str(&resp.headers, FUNCTION_ARN_HEADER) {
        envelope = envelope.with_function_arn(arn);
    }
    Ok(envelope)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, StatusCode};

    use super::*;
    use crate::transport::HttpResponse;

    fn next_url() -> Uri {
        "http://localhost:9001/runtime/invocation/next".parse().unwrap()
    }

    fn response(headers: &[(&'static str, &str)], body: &str) -> HttpOutcome {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        Ok(HttpResponse::new(StatusCode::OK, map, body))
    }

    #[test]
    fn classifies_request_id_and_payload() {
        let outcome = response(
            &[("lambda-runtime-aws-request-id", "abc123")],
            r#"{"key":"value"}"#,
        );
        let envelope = classify(&next_url(), outcome).unwrap();
        assert_eq!(envelope.request_id, "abc123");
        assert_eq!(envelope.payload, "{\"key\":\"value\"}");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("lambda-runtime-aws-request-id", HeaderValue::from_static("xyz"));
        assert_eq!(request_id(&headers).unwrap(), "xyz");
    }

    #[test]
    fn missing_header_fails() {
        let outcome = response(&[("content-type", "application/json")], "{}");
        assert!(matches!(
            classify(&next_url(), outcome),
            Err(ClassifyError::MissingRequestId)
        ));
    }

    #[test]
    fn empty_header_still_classifies() {
        let outcome = response(&[("lambda-runtime-aws-request-id", "")], "{}");
        let envelope = classify(&next_url(), outcome).unwrap();
        assert_eq!(envelope.request_id, "");
        assert_eq!(envelope.payload, "{}");
    }

    #[test]
    fn non_ascii_header_fails() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "lambda-runtime-aws-request-id",
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );
        assert!(matches!(
            request_id(&headers),
            Err(ClassifyError::UnreadableRequestId)
        ));
    }

    #[test]
    fn transport_error_fails() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let result = classify(&next_url(), Err(TransportError::Io(err)));
        match result {
            Err(ClassifyError::Transport { url, .. }) => assert_eq!(url, next_url()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn error_status_still_classified() {
        let mut headers = HeaderMap::new();
        headers.insert("lambda-runtime-aws-request-id", HeaderValue::from_static("r1"));
        let outcome = Ok(HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, headers, ""));
        let envelope = classify(&next_url(), outcome).unwrap();
        assert_eq!(envelope.request_id, "r1");
        assert_eq!(envelope.payload, "");
    }

    #[test]
    fn metadata_headers_are_captured() {
        let outcome = response(
            &[
                ("lambda-runtime-aws-request-id", "r2"),
                ("lambda-runtime-deadline-ms", "1700000000000"),
                (
                    "lambda-runtime-invoked-function-arn",
                    "arn:aws:lambda:us-east-1:123456789012:function:echo",
                ),
            ],
            "null",
        );
        let envelope = classify(&next_url(), outcome).unwrap();
        assert_eq!(envelope.deadline_ms, Some(1_700_000_000_000));
        assert_eq!(
            envelope.function_arn.as_deref(),
            Some("arn:aws:lambda:us-east-1:123456789012:function:echo")
        );
    }

    #[test]
    fn unparsable_deadline_is_ignored() {
        let outcome = response(
            &[
                ("lambda-runtime-aws-request-id", "r3"),
                ("lambda-runtime-deadline-ms", "soon"),
            ],
            "{}",
        );
        let envelope = classify(&next_url(), outcome).unwrap();
        assert_eq!(envelope.deadline_ms, None);
    }
}
