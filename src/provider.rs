//! The universal provider.
//!
//! [`UniversalProvider`] owns the query client of one mounted render tree.
//! The first render builds the client, its chain and its cache exactly once;
//! later renders see the same [`Arc<Client>`]. Children reach the client
//! through the [`ClientContext`] handed to them.
//!
//! On the server, [`UniversalProvider::serialize`] waits for every request
//! issued during the render and then writes the cache snapshot to the
//! serialization channel under [`SERIALIZATION_KEY`]. On the client, the
//! snapshot is read from the channel while the client is being built and
//! restored before the first request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use universal_query::link::mock::MockLink;
//! use universal_query::mode::ExecutionMode;
//! use universal_query::operation::Operation;
//! use universal_query::options::ClientOptions;
//! use universal_query::provider::UniversalProvider;
//! use universal_query::serialization::SerializationChannel;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let mock = MockLink::new().respond(&"Shop", json!({"name": "Snowdevil"}));
//!
//! // Server pass
//! let link = mock.clone();
//! let server = UniversalProvider::new(
//!     move || ClientOptions::new().with_link(Arc::new(link.clone())),
//!     ExecutionMode::Server,
//!     SerializationChannel::new(),
//! );
//! let page = server
//!     .render_to_page(|ctx| {
//!         let request = ctx.client().query(Operation::new(&"Shop", &"{ shop { name } }"));
//!         tokio::spawn(request);
//!         "<div id=\"app\"></div>"
//!     })
//!     .await
//!     .unwrap();
//!
//! // Client pass: answered from the hydrated cache.
//! let client = UniversalProvider::new(
//!     ClientOptions::new,
//!     ExecutionMode::Client,
//!     SerializationChannel::from_payload(&page.payload),
//! );
//! let data = client
//!     .client()
//!     .unwrap()
//!     .query(Operation::new(&"Shop", &"{ shop { name } }"))
//!     .await
//!     .unwrap();
//! assert_eq!(data, json!({"name": "Snowdevil"}));
//! assert_eq!(mock.call_count(&"Shop"), 1);
//! # });
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::cache::{Cache, CacheSnapshot, InMemoryCache};
use crate::client::{Client, ClientError};
use crate::link::ChainBuilder;
use crate::mode::{ExecutionMode, ModeOracle};
use crate::options::{ClientConfig, ClientOptions};
use crate::serialization::{SerializationChannel, SerializationError};
use crate::ssr::ExtractionTracker;

/// Serialization channel key reserved for the cache snapshot.
pub const SERIALIZATION_KEY: &str = "apollo";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// What children of a provider receive.
#[derive(Debug, Clone)]
pub struct ClientContext {
    client: Arc<Client>,
    tracker: Arc<ExtractionTracker>,
}

impl ClientContext {
    /// The provider's client.
    #[must_use]
    pub const fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Spawns render work on the tokio runtime.
    ///
    /// On the server the task counts as pending from this call until it
    /// completes, so [`UniversalProvider::serialize`] also waits for requests
    /// the task has not issued yet, including follow-ups that depend on
    /// earlier results.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let pending = self.tracker.begin(&"render task");
        tokio::spawn(async move {
            let output = task.await;
            drop(pending);
            output
        })
    }
}

/// Output of a server render together with its serialized data.
#[derive(Debug, Clone)]
pub struct Page<R> {
    /// Whatever the children rendered.
    pub body: R,
    /// Serialization channel contents, see
    /// [`SerializationChannel::from_payload`].
    pub payload: String,
}

struct Mounted {
    mode: ExecutionMode,
    client: Arc<Client>,
    tracker: Arc<ExtractionTracker>,
}

/// Builds and owns the query client for one mount.
pub struct UniversalProvider<F> {
    factory: F,
    oracle: Box<dyn ModeOracle>,
    channel: SerializationChannel,
    mounted: OnceLock<Mounted>,
    init: Mutex<()>,
}

impl<F> UniversalProvider<F>
where
    F: Fn() -> ClientOptions,
{
    /// Creates a provider. Nothing is built until the first render.
    ///
    /// * `factory` - returns options that override the mode defaults
    /// * `oracle` - asked once whether this is a server render
    /// * `channel` - where the snapshot is read from and written to
    pub fn new(
        factory: F,
        oracle: impl ModeOracle + 'static,
        channel: SerializationChannel,
    ) -> Self {
        Self {
            factory,
            oracle: Box::new(oracle),
            channel,
            mounted: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Renders `children` with access to the client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Client`] if the first render cannot build the
    /// client. Later renders retry construction.
    pub fn render<R>(
        &self,
        children: impl FnOnce(&ClientContext) -> R,
    ) -> Result<R, ProviderError> {
        let mounted = self.mounted()?;
        let context = ClientContext {
            client: mounted.client.clone(),
            tracker: mounted.tracker.clone(),
        };
        Ok(children(&context))
    }

    /// The client, building it if this is the first access.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Client`] if the client cannot be built.
    pub fn client(&self) -> Result<Arc<Client>, ProviderError> {
        Ok(self.mounted()?.client.clone())
    }

    /// The execution mode, once the client has been built.
    #[must_use]
    pub fn mode(&self) -> Option<ExecutionMode> {
        self.mounted.get().map(|mounted| mounted.mode)
    }

    /// The channel this provider reads from and writes to.
    #[must_use]
    pub const fn channel(&self) -> &SerializationChannel {
        &self.channel
    }

    /// Finishes a render.
    ///
    /// On the server, drains outstanding requests and writes the resulting
    /// snapshot under [`SERIALIZATION_KEY`]; returns `true`. On the client
    /// this does nothing and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Serialization`] if a snapshot was already
    /// written for this render, or [`ProviderError::Client`] if the client
    /// cannot be built.
    pub async fn serialize(&self) -> Result<bool, ProviderError> {
        let mounted = self.mounted()?;
        if !mounted.mode.is_server() {
            return Ok(false);
        }

        let client = &mounted.client;
        let snapshot = mounted.tracker.drain(|| client.extract()).await;
        tracing::debug!(entries = snapshot.len(), "writing cache snapshot");
        self.channel.write(&SERIALIZATION_KEY, &snapshot)?;
        Ok(true)
    }

    /// Renders `children`, then [`serialize`](Self::serialize)s and encodes
    /// the channel.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`render`](Self::render),
    /// [`serialize`](Self::serialize) and
    /// [`SerializationChannel::to_payload`].
    pub async fn render_to_page<R>(
        &self,
        children: impl FnOnce(&ClientContext) -> R,
    ) -> Result<Page<R>, ProviderError> {
        let body = self.render(children)?;
        self.serialize().await?;
        let payload = self.channel.to_payload()?;
        Ok(Page { body, payload })
    }

    fn mounted(&self) -> Result<&Mounted, ProviderError> {
        if let Some(mounted) = self.mounted.get() {
            return Ok(mounted);
        }

        let _init = self.init.lock();
        if let Some(mounted) = self.mounted.get() {
            return Ok(mounted);
        }
        let mounted = self.construct()?;
        Ok(self.mounted.get_or_init(|| mounted))
    }

    fn construct(&self) -> Result<Mounted, ProviderError> {
        let mode = self.oracle.mode();
        let options = (self.factory)();
        let config = options.resolve(ClientConfig::defaults_for(mode));

        let tracker = Arc::new(ExtractionTracker::new(mode));
        let chain = ChainBuilder::new()
            .tracker(tracker.clone())
            .terminal(options.link)
            .build();

        let cache: Arc<dyn Cache> = match options.cache {
            Some(cache) => cache,
            None => Arc::new(InMemoryCache::new()),
        };
        if let Some(snapshot) = self.initial_snapshot() {
            tracing::debug!(entries = snapshot.len(), "restoring cache snapshot");
            cache.restore(snapshot);
        }

        let client = Client::new(config, chain, cache)?.with_tracker(tracker.clone());
        tracing::debug!(%mode, ssr_mode = client.config().ssr_mode, "client constructed");

        Ok(Mounted {
            mode,
            client: Arc::new(client),
            tracker,
        })
    }

    fn initial_snapshot(&self) -> Option<CacheSnapshot> {
        let value = self.channel.take(SERIALIZATION_KEY)?;
        match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                tracing::warn!(%error, "ignoring malformed cache snapshot");
                None
            }
        }
    }
}

impl<F> fmt::Debug for UniversalProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniversalProvider")
            .field("mode", &self.mounted.get().map(|mounted| mounted.mode))
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
