//! The invocation poll loop.
//!
//! Two states, no terminal one: fetch an invocation, acknowledge it, and
//! go back for the next. The loop only returns on a fatal error.

use std::convert::Infallible;
use std::time::Duration;

use echo_core::{InvocationEnvelope, RuntimeEndpoint};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::error::RuntimeError;
use crate::transport::Transport;

/// Where the loop is in the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting on `GET /runtime/invocation/next`.
    AwaitingInvocation,
    /// Holding an invocation whose response has not been posted yet.
    AwaitingResponseAck(InvocationEnvelope),
}

/// How the loop reacts to an unusable next-invocation response.
///
/// The default is fail-fast: the first failure stops the loop. With
/// retries enabled, each consecutive failure waits an exponentially
/// growing backoff before polling again. A usable response resets the
/// count. Response POSTs are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Consecutive GET failures tolerated before giving up.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_backoff: Duration,
    /// Upper bound on the delay.
    pub max_backoff: Duration,
}

impl FailurePolicy {
    pub fn fail_fast() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }

    pub fn with_retries(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
            ..Self::fail_fast()
        }
    }

    /// Delay before retry number `attempt` (zero-based): doubles per
    /// attempt, capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

/// Drives invocations through a [`Transport`], one at a time.
pub struct PollLoop<T> {
    endpoint: RuntimeEndpoint,
    transport: T,
    policy: FailurePolicy,
    consecutive_failures: u32,
    completed: u64,
}

impl<T: Transport> PollLoop<T> {
    pub fn new(endpoint: RuntimeEndpoint, transport: T) -> Self {
        Self {
            endpoint,
            transport,
            policy: FailurePolicy::default(),
            consecutive_failures: 0,
            completed: 0,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn endpoint(&self) -> &RuntimeEndpoint {
        &self.endpoint
    }

    /// Invocations whose response POST has completed (successfully or not).
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Run forever. Returns only on a fatal error.
    pub async fn run(mut self) -> Result<Infallible, RuntimeError> {
        info!(runtime_api = %self.endpoint.host_port(), "poll loop started");
        let mut state = LoopState::AwaitingInvocation;
        loop {
            state = self.step(state).await?;
        }
    }

    /// Perform one state transition.
    pub async fn step(&mut self, state: LoopState) -> Result<LoopState, RuntimeError> {
        match state {
            LoopState::AwaitingInvocation => self.next_invocation().await,
            LoopState::AwaitingResponseAck(envelope) => {
                self.respond(envelope).await?;
                Ok(LoopState::AwaitingInvocation)
            }
        }
    }

    async fn next_invocation(&mut self) -> Result<LoopState, RuntimeError> {
        let url = self.endpoint.next_invocation();
        let outcome = self.transport.get(url).await;

        match classify(url, outcome) {
            Ok(envelope) => {
                self.consecutive_failures = 0;
                debug!(
                    request_id = %envelope.request_id,
                    deadline_ms = ?envelope.deadline_ms,
                    function_arn = ?envelope.function_arn,
                    len = envelope.payload.len(),
                    "invocation received"
                );
                Ok(LoopState::AwaitingResponseAck(envelope))
            }
            Err(e) if self.consecutive_failures < self.policy.max_retries => {
                let delay = self.policy.backoff_for(self.consecutive_failures);
                self.consecutive_failures += 1;
                warn!(
                    error = %e,
                    attempt = self.consecutive_failures,
                    max_retries = self.policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying next invocation"
                );
                tokio::time::sleep(delay).await;
                Ok(LoopState::AwaitingInvocation)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn respond(&mut self, envelope: InvocationEnvelope) -> Result<(), RuntimeError> {
        let url = self.endpoint.invocation_response(&envelope.request_id)?;
        let body = envelope.response_body();

        match self.transport.post(&url, body).await {
            Ok(resp) => info!(
                request_id = %envelope.request_id,
                status = %resp.status,
                body = %resp.body,
                "invocation response posted"
            ),
            Err(e) => warn!(
                request_id = %envelope.request_id,
                %url,
                error = %e,
                "invocation response failed"
            ),
        }

        self.completed += 1;
        Ok(())
    }
}
