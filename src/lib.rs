//! # Universal Query - server and client query provider
//!
//! Universal Query renders the same component tree twice: once on a server
//! to produce the initial page, and once in the end user's runtime where
//! that page resumes. A [`UniversalProvider`](provider::UniversalProvider)
//! owns the query client for one mount and makes sure the second pass starts
//! from the data the first pass fetched, instead of fetching it again.
//!
//! ## Lifecycle
//!
//! 1. **Construct**: on first render the provider asks a
//!    [`ModeOracle`](mode::ModeOracle) where it runs, resolves the
//!    factory's [`ClientOptions`](options::ClientOptions) over the mode
//!    defaults and builds the client exactly once.
//! 2. **Track**: on the server, every request passes through an
//!    [`ExtractionTracker`](ssr::ExtractionTracker) at the front of the
//!    [`Chain`](link::Chain).
//! 3. **Drain and serialize**: after the render,
//!    [`serialize`](provider::UniversalProvider::serialize) waits until no
//!    request is pending, then writes the cache snapshot to the
//!    [`SerializationChannel`](serialization::SerializationChannel).
//! 4. **Hydrate**: on the client, the snapshot is restored into the cache
//!    before the first query runs.
//!
//! ## Core Components
//!
//! - [`UniversalProvider`](provider::UniversalProvider): The per-mount
//!   client owner
//! - [`Client`](client::Client): Cache-backed query client
//! - [`Link`](link::Link) and [`Chain`](link::Chain): Request middleware
//! - [`Cache`](cache::Cache): Normalized result storage with
//!   extract/restore
//! - [`DelayedCallback`](delayed::DelayedCallback) and
//!   [`Lifetime`](lifetime::Lifetime): Timers that never outlive their
//!   component
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use universal_query::prelude::*;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let api = MockLink::new().respond(&"Viewer", json!({"viewer": {"id": 1}}));
//!
//! let link = api.clone();
//! let server = UniversalProvider::new(
//!     move || ClientOptions::new().with_link(Arc::new(link.clone())),
//!     ExecutionMode::Server,
//!     SerializationChannel::new(),
//! );
//! let page = server
//!     .render_to_page(|ctx| {
//!         tokio::spawn(ctx.client().query(Operation::new(&"Viewer", &"{ viewer { id } }")));
//!         "<main></main>"
//!     })
//!     .await
//!     .unwrap();
//!
//! let browser = UniversalProvider::new(
//!     ClientOptions::new,
//!     ExecutionMode::Client,
//!     SerializationChannel::from_payload(&page.payload),
//! );
//! let viewer = browser
//!     .render(|ctx| ctx.client().query(Operation::new(&"Viewer", &"{ viewer { id } }")))
//!     .unwrap()
//!     .await
//!     .unwrap();
//! assert_eq!(viewer, json!({"viewer": {"id": 1}}));
//! assert_eq!(api.total_calls(), 1);
//! # });
//! ```

pub mod cache;
pub mod client;
pub mod delayed;
pub mod lifetime;
pub mod link;
pub mod mode;
pub mod operation;
pub mod options;
pub mod prelude;
pub mod provider;
pub mod serialization;
pub mod ssr;
