//! Prelude module for convenient imports.
//!
//! ```
//! use universal_query::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`UniversalProvider`] - Owns the client of one mount
//! - [`Client`] - For running queries and mutations
//! - [`ClientOptions`] - Factory output for a provider
//! - [`Link`] - For writing request middleware
//! - [`Operation`] - A query or mutation request
//! - [`DelayedCallback`] - Lifetime-bound timers

pub use crate::cache::{Cache, CacheSnapshot, InMemoryCache};
pub use crate::client::Client;
pub use crate::delayed::DelayedCallback;
pub use crate::lifetime::Lifetime;
pub use crate::link::mock::MockLink;
pub use crate::link::{Chain, Link, LinkError, LinkResult, Next};
pub use crate::mode::{ExecutionMode, HostOracle, ModeOracle};
pub use crate::operation::{Operation, Response};
pub use crate::options::{ClientOptions, FetchPolicy};
pub use crate::provider::{ClientContext, UniversalProvider};
pub use crate::serialization::SerializationChannel;
