//! Invocation envelope and the echo response body.

/// Header carrying the invocation's correlation id. Required on every
/// next-invocation response.
pub const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";

/// Header carrying the invocation deadline in epoch milliseconds.
pub const DEADLINE_HEADER: &str = "Lambda-Runtime-Deadline-Ms";

/// Header carrying the ARN of the invoked function.
pub const FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";

/// One invocation pulled from the Runtime API.
///
/// `deadline_ms` and `function_arn` are informational only; they are
/// logged but never drive control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationEnvelope {
    pub request_id: String,
    pub payload: String,
    pub deadline_ms: Option<u64>,
    pub function_arn: Option<String>,
}

impl InvocationEnvelope {
    pub fn new(request_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            payload: payload.into(),
            deadline_ms: None,
            function_arn: None,
        }
    }

    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    pub fn with_function_arn(mut self, function_arn: impl Into<String>) -> Self {
        self.function_arn = Some(function_arn.into());
        self
    }

    /// Body posted back for this invocation.
    pub fn response_body(&self) -> String {
        echo_response(&self.payload)
    }
}

/// Wrap a payload as `{"receive":<payload>}`.
///
/// The payload is spliced in verbatim, without escaping. It is expected to
/// already be JSON text.
pub fn echo_response(payload: &str) -> String {
    format!("{{\"receive\":{payload}}}")
}
