//! Request-scoped trace identifier for correlating logs and error payloads.
//!
//! The identifier lives in a Tokio task-local. Scans fan out onto spawned
//! tasks and blocking threads, which do not inherit task-locals, so work
//! handed to them is wrapped with [`TraceId::propagate`] or
//! [`TraceId::propagate_blocking`] first.

use std::future::Future;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: TraceId;
}

/// Identifier shared by every log line and error payload of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    #[must_use]
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The identifier of the request being served, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    /// Run `fut` with `trace_id` in scope.
    ///
    /// # Examples
    /// ```
    /// use pramana::TraceId;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let trace_id: TraceId = "00000000-0000-0000-0000-000000000000"
    ///     .parse()
    ///     .expect("valid UUID");
    /// let observed = TraceId::scope(trace_id, async move { TraceId::current() }).await;
    /// assert_eq!(observed, Some(trace_id));
    /// # });
    /// ```
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }

    /// Bind the caller's identifier to `fut` so it survives `tokio::spawn`.
    ///
    /// The identifier is captured when this is called, not when `fut` is
    /// first polled.
    pub fn propagate<Fut>(fut: Fut) -> impl Future<Output = Fut::Output>
    where
        Fut: Future,
    {
        let captured = Self::current();
        async move {
            match captured {
                Some(id) => TRACE_ID.scope(id, fut).await,
                None => fut.await,
            }
        }
    }

    /// Bind the caller's identifier to a closure bound for `spawn_blocking`.
    pub fn propagate_blocking<R>(f: impl FnOnce() -> R) -> impl FnOnce() -> R {
        let captured = Self::current();
        move || match captured {
            Some(id) => TRACE_ID.sync_scope(id, f),
            None => f(),
        }
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async move { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(TraceId::current().is_none());
    }

    #[tokio::test]
    async fn propagate_survives_spawn() {
        let expected = TraceId::generate();
        let handle = TraceId::scope(expected, async {
            tokio::spawn(TraceId::propagate(async { TraceId::current() }))
        })
        .await;
        assert_eq!(handle.await.expect("task joins"), Some(expected));
    }

    #[tokio::test]
    async fn propagate_blocking_survives_thread_hop() {
        let expected = TraceId::generate();
        let handle = TraceId::scope(expected, async {
            tokio::task::spawn_blocking(TraceId::propagate_blocking(TraceId::current))
        })
        .await;
        assert_eq!(handle.await.expect("task joins"), Some(expected));
    }

    #[tokio::test]
    async fn propagate_without_scope_stays_empty() {
        let observed = tokio::spawn(TraceId::propagate(async { TraceId::current() }))
            .await
            .expect("task joins");
        assert!(observed.is_none());
    }

    #[test]
    fn parses_and_displays_uuid() {
        let trace_id: TraceId = Uuid::nil().to_string().parse().expect("parse uuid");
        assert_eq!(trace_id.to_string(), Uuid::nil().to_string());
    }
}
