use crate::{Error, Result};
use std::{future::Future, time::Duration};
use tokio::time::{Instant, timeout_at};
use uuid::Uuid;

/// Request scoped metadata passed explicitly down the call chain.
///
/// Carries the trace identifier used in every log line, the caller identity
/// once authenticated and the deadline after which work is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub trace_id: String,
    pub origin: Option<String>,
    pub identity: Option<String>,
    pub deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Fresh context with a random trace id and no deadline.
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            origin: None,
            identity: None,
            deadline: None,
        }
    }

    /// Use the trace id received from upstream, a blank one keeps the generated id.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        let trace_id = trace_id.into();
        if !trace_id.trim().is_empty() {
            self.trace_id = trace_id;
        }
        self
    }

    /// Deadline `timeout` from now, a timeout past the clock range means no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Time left before the deadline, `None` when there is none.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|v| v.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|v| v <= Instant::now())
    }

    /// Drive `future` to completion unless the deadline expires first.
    ///
    /// On expiry the future is dropped, abandoning the in flight work.
    pub async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_expired() {
            log::warn!("[{}] Deadline already exceeded, operation not started", self.trace_id);
            return Err(Error::DeadlineExceeded);
        }
        match self.deadline {
            Some(deadline) => match timeout_at(deadline, future).await {
                Ok(result) => result,
                Err(..) => {
                    log::warn!("[{}] Deadline exceeded, abandoning the operation", self.trace_id);
                    Err(Error::DeadlineExceeded)
                }
            },
            None => future.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_without_deadline() {
        let ctx = RequestContext::new().with_identity("alice");
        assert_eq!(ctx.identity.as_deref(), Some("alice"));
        assert_eq!(ctx.run(async { Ok(5) }).await.unwrap(), 5);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.remaining(), None);
    }

    #[tokio::test]
    async fn expired_deadline_abandons_the_future() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
        assert!(ctx.is_expired());
    }

    #[tokio::test]
    async fn unbounded_timeout() {
        let ctx = RequestContext::new().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline, None);
        assert!(!ctx.is_expired());
        assert_eq!(ctx.run(async { Ok(7) }).await.unwrap(), 7);
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(60));
        assert!(ctx.remaining().unwrap() > Duration::from_secs(59));
    }

    #[test]
    fn trace_ids() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.trace_id, b.trace_id);
        assert_eq!(a.clone().with_trace_id("  ").trace_id, a.trace_id);
        assert_eq!(a.with_trace_id("req-1").trace_id, "req-1");
    }
}
