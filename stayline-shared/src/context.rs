use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Raised when a collaborator call outlives the caller's deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("caller deadline exceeded")]
pub struct DeadlineExceeded;

/// Per-request context threaded through every collaborator call.
///
/// Carries the correlation ID used to stamp domain events and the deadline
/// the caller is willing to wait. The context never invents a deadline of
/// its own: without one, calls run unbounded.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    correlation_id: Option<String>,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` bounded by the caller's deadline, if one was supplied.
    ///
    /// An elapsed deadline drops the in-flight future and surfaces as the
    /// collaborator's own error type.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DeadlineExceeded>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| E::from(DeadlineExceeded))?,
            None => fut.await,
        }
    }
}
