//! echo-core: shared types for the echo bootstrap.
//!
//! Resolves the two Runtime API URLs the bootstrap talks to and models
//! the invocation a poll response carries.
//!
//! # Architecture
//!
//! ```text
//! AWS_LAMBDA_RUNTIME_API (host:port)
//!   │
//!   ▼
//! RuntimeEndpoint
//!   ├── next_invocation()          → GET  /runtime/invocation/next
//!   └── invocation_response(id)    → POST /runtime/invocation/{id}/response
//!
//! InvocationEnvelope (request id + payload)
//!   └── response_body()            → {"receive":<payload>}
//! ```

pub mod endpoint;
pub mod error;
pub mod invocation;

pub use endpoint::RuntimeEndpoint;
pub use error::{EndpointError, EndpointResult};
pub use invocation::{
    echo_response, InvocationEnvelope, DEADLINE_HEADER, FUNCTION_ARN_HEADER, REQUEST_ID_HEADER,
};
