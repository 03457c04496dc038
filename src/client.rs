//! The query client.
//!
//! A [`Client`] owns a [`Cache`] and a [`Chain`]. Queries are answered from
//! the cache or sent through the chain according to their [`FetchPolicy`];
//! successful query results are written back to the cache.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use universal_query::cache::InMemoryCache;
//! use universal_query::client::Client;
//! use universal_query::link::ChainBuilder;
//! use universal_query::link::mock::MockLink;
//! use universal_query::operation::Operation;
//! use universal_query::options::ClientConfig;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! # rt.block_on(async {
//! let mock = MockLink::new().respond(&"Shop", json!({"shop": {"name": "Snowdevil"}}));
//! let chain = ChainBuilder::new().terminal(Some(Arc::new(mock.clone()))).build();
//! let cache = Arc::new(InMemoryCache::new());
//! let client = Client::new(ClientConfig::default(), chain, cache).unwrap();
//!
//! let data = client.query(Operation::new(&"Shop", &"{ shop { name } }")).await.unwrap();
//! assert_eq!(data, json!({"shop": {"name": "Snowdevil"}}));
//!
//! // Served from the cache the second time.
//! client.query(Operation::new(&"Shop", &"{ shop { name } }")).await.unwrap();
//! assert_eq!(mock.call_count(&"Shop"), 1);
//! # });
//! ```

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::{Cache, CacheSnapshot};
use crate::link::{Chain, LinkError};
use crate::operation::Operation;
use crate::options::{ClientConfig, FetchPolicy};
use crate::ssr::ExtractionTracker;

/// Header carrying [`ClientConfig::name`].
pub const CLIENT_NAME_HEADER: &str = "apollographql-client-name";

/// Header carrying [`ClientConfig::version`].
pub const CLIENT_VERSION_HEADER: &str = "apollographql-client-version";

/// Error type for client construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Invalid option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

/// Result data of a query or mutation.
pub type QueryResult = Result<Value, LinkError>;

/// A query client bound to one cache and one chain.
pub struct Client {
    config: ClientConfig,
    chain: Chain,
    cache: Arc<dyn Cache>,
    tracker: Option<Arc<ExtractionTracker>>,
    created_at: Instant,
}

impl Client {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOption`] when the client name or version
    /// cannot be sent as a header value.
    pub fn new(
        config: ClientConfig,
        chain: Chain,
        cache: Arc<dyn Cache>,
    ) -> Result<Self, ClientError> {
        validate_header_value("name", config.name.as_deref())?;
        validate_header_value("version", config.version.as_deref())?;

        if config.dev_tools {
            tracing::debug!(chain = ?chain, cached = cache.len(), "dev tools connected");
        }

        Ok(Self {
            config,
            chain,
            cache,
            tracker: None,
            created_at: Instant::now(),
        })
    }

    /// Keeps each network query pending on `tracker` until its result has
    /// been written to the cache.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<ExtractionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Copies the cache contents for serialization.
    #[must_use]
    pub fn extract(&self) -> CacheSnapshot {
        self.cache.extract()
    }

    /// Runs a query with the configured default policy.
    ///
    /// The chain is entered before this returns, so links observe the
    /// request at issuance even if the future is polled later.
    pub fn query(&self, operation: Operation) -> BoxFuture<'static, QueryResult> {
        self.query_with_policy(operation, self.config.default_fetch_policy)
    }

    /// Runs a query with an explicit policy.
    pub fn query_with_policy(
        &self,
        operation: Operation,
        policy: FetchPolicy,
    ) -> BoxFuture<'static, QueryResult> {
        let policy = self.effective_policy(policy);
        let key = operation.cache_key();

        if self.config.dev_tools {
            tracing::debug!(key = %key, ?policy, "query");
        }

        if policy != FetchPolicy::NetworkOnly {
            if let Some(data) = self.cache.read(&key) {
                return future::ready(Ok(data)).boxed();
            }
        }
        if policy == FetchPolicy::CacheOnly {
            return future::ready(Err(LinkError::CacheMiss(key))).boxed();
        }

        let settlement = self.tracker.as_ref().and_then(|tracker| tracker.begin(&key));
        let cache = self.cache.clone();
        let response = self.chain.execute(self.decorate(operation));
        async move {
            let data = response.await?.data.unwrap_or(Value::Null);
            if !data.is_null() {
                cache.write(key, data.clone());
            }
            drop(settlement);
            Ok(data)
        }
        .boxed()
    }

    /// Sends a mutation through the chain. Results are not cached.
    pub fn mutate(&self, operation: Operation) -> BoxFuture<'static, QueryResult> {
        if self.config.dev_tools {
            tracing::debug!(operation = %operation.name, "mutation");
        }

        let response = self.chain.execute(self.decorate(operation));
        async move { Ok(response.await?.data.unwrap_or(Value::Null)) }.boxed()
    }

    /// Network-only queries are served cache-first in SSR mode and during
    /// the forced-fetch window.
    fn effective_policy(&self, requested: FetchPolicy) -> FetchPolicy {
        let network_disabled = self.config.ssr_mode
            || self.created_at.elapsed() < self.config.forced_fetch_delay;

        if requested == FetchPolicy::NetworkOnly && network_disabled {
            FetchPolicy::CacheFirst
        } else {
            requested
        }
    }

    fn decorate(&self, mut operation: Operation) -> Operation {
        if let Some(name) = &self.config.name {
            operation
                .headers
                .insert(CLIENT_NAME_HEADER.to_string(), name.clone());
        }
        if let Some(version) = &self.config.version {
            operation
                .headers
                .insert(CLIENT_VERSION_HEADER.to_string(), version.clone());
        }
        operation
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("cache", &self.cache)
            .field("tracked", &self.tracker.is_some())
            .finish_non_exhaustive()
    }
}

fn validate_header_value(option: &'static str, value: Option<&str>) -> Result<(), ClientError> {
    let Some(value) = value else {
        return Ok(());
    };

    let reason = if value.trim().is_empty() {
        "must not be empty"
    } else if value.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };

    Err(ClientError::InvalidOption {
        option,
        reason: reason.to_string(),
    })
}
