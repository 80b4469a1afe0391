//! echo-runtime: the invocation poll loop for the echo bootstrap.
//!
//! Polls the Runtime API for the next invocation, echoes its payload back
//! as `{"receive":<payload>}`, and repeats. One invocation is in flight at
//! a time: the response POST completes before the next GET is issued.
//!
//! # Architecture
//!
//! ```text
//! PollLoop
//!   ├── AwaitingInvocation
//!   │   ├── Transport::get(next_invocation) → HttpOutcome
//!   │   └── classify() → InvocationEnvelope | ClassifyError (fatal)
//!   └── AwaitingResponseAck
//!       ├── Transport::post(invocation_response(id), {"receive":...})
//!       └── log the outcome, never act on it
//! ```
//!
//! # Failure policy
//!
//! GET-side failures (transport error, missing request id) stop the loop
//! with exit status 2 unless a [`FailurePolicy`] allows retries. POST-side
//! failures are logged and the loop carries on.

pub mod classify;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod poll;
pub mod transport;

pub use classify::{classify, request_id, ClassifyError};
pub use error::RuntimeError;
pub use poll::{FailurePolicy, LoopState, PollLoop};
pub use transport::{HttpOutcome, HttpResponse, HyperTransport, Transport, TransportError};
