//! Scripted terminal link for testing.
//!
//! [`MockLink`] answers operations by name from a table of canned results,
//! optionally after a per-operation latency, and remembers every operation it
//! saw so tests can assert on network activity.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use serde_json::json;
//! use universal_query::link::mock::MockLink;
//!
//! let mock = MockLink::new()
//!     .respond(&"User", json!({"user": {"name": "Ada"}}))
//!     .with_latency(&"User", Duration::from_millis(20));
//!
//! assert_eq!(mock.call_count(&"User"), 0);
//! ```
//!
//! Clones share the same table and call log, so one clone can be handed to a
//! provider as its terminal link while the test keeps the other.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;

use crate::operation::{Operation, Response};

use super::{Link, LinkError, LinkResult, Next};

#[derive(Debug, Default)]
struct Inner {
    responses: DashMap<String, LinkResult>,
    latencies: DashMap<String, Duration>,
    calls: DashMap<String, usize>,
    log: Mutex<Vec<Operation>>,
}

/// A terminal link that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    inner: Arc<Inner>,
}

impl MockLink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `name` with a successful response carrying `data`.
    #[must_use]
    pub fn respond(self, name: &impl ToString, data: Value) -> Self {
        self.respond_with(name, Ok(Response::data(data)))
    }

    /// Answers `name` with `result`.
    #[must_use]
    pub fn respond_with(self, name: &impl ToString, result: LinkResult) -> Self {
        self.inner.responses.insert(name.to_string(), result);
        self
    }

    /// Delays answers for `name` by `latency`.
    #[must_use]
    pub fn with_latency(self, name: &impl ToString, latency: Duration) -> Self {
        self.inner.latencies.insert(name.to_string(), latency);
        self
    }

    /// Number of times `name` reached this link.
    #[must_use]
    pub fn call_count(&self, name: &impl ToString) -> usize {
        self.inner
            .calls
            .get(&name.to_string())
            .map_or(0, |count| *count)
    }

    /// Total number of operations that reached this link.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.inner.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Every operation seen so far, in arrival order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.log.lock().clone()
    }
}

impl Link for MockLink {
    fn request(&self, operation: Operation, _next: Next) -> BoxFuture<'static, LinkResult> {
        let name = operation.name.clone();
        *self.inner.calls.entry(name.clone()).or_insert(0) += 1;
        self.inner.log.lock().push(operation);

        let result = self.inner.responses.get(&name).map_or_else(
            || {
                Err(LinkError::network(
                    &format!("no mock response for `{name}`"),
                    None,
                ))
            },
            |entry| entry.value().clone(),
        );
        let latency = self.inner.latencies.get(&name).map(|entry| *entry.value());

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Chain;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_response() {
        let mock = MockLink::new().respond(&"Q", json!({"a": 1}));
        let chain = Chain::new(vec![Arc::new(mock.clone())]);

        let result = chain.execute(Operation::new(&"Q", &"{ a }")).await;
        assert_eq!(result, Ok(Response::data(json!({"a": 1}))));
        assert_eq!(mock.call_count(&"Q"), 1);
        assert_eq!(mock.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_operation_fails() {
        let mock = MockLink::new();
        let chain = Chain::new(vec![Arc::new(mock.clone())]);

        let result = chain.execute(Operation::new(&"Missing", &"{ a }")).await;
        assert!(matches!(result, Err(LinkError::Network { .. })));
        assert_eq!(mock.call_count(&"Missing"), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let mock1 = MockLink::new();
        let mock2 = mock1.clone().respond(&"Q", json!(null));
        assert!(mock1.inner.responses.contains_key("Q"));
        assert_eq!(mock2.call_count(&"Q"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let mock = MockLink::new()
            .respond(&"Slow", json!(1))
            .with_latency(&"Slow", Duration::from_millis(100));
        let chain = Chain::new(vec![Arc::new(mock)]);

        let start = tokio::time::Instant::now();
        let result = chain.execute(Operation::new(&"Slow", &"{ a }")).await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
