//! Request-processing middleware ("links").
//!
//! A [`Chain`] is an ordered list of [`Link`]s executed by a single driver,
//! [`Next`]. Each link receives the outgoing [`Operation`] together with a
//! `Next` handle for the rest of the chain. It may change the operation before
//! forwarding, change the result on the way back, or answer without
//! forwarding at all.
//!
//! Outgoing operations visit links in chain order and results come back in
//! reverse order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use futures::FutureExt;
//! use futures::future::BoxFuture;
//! use serde_json::json;
//! use universal_query::link::{Chain, Link, LinkResult, Next};
//! use universal_query::operation::{Operation, Response};
//!
//! struct Echo;
//!
//! impl Link for Echo {
//!     fn request(&self, operation: Operation, _next: Next) -> BoxFuture<'static, LinkResult> {
//!         async move { Ok(Response::data(json!(operation.name))) }.boxed()
//!     }
//! }
//!
//! let chain = Chain::new(vec![Arc::new(Echo) as Arc<dyn Link>]);
//! let request = chain.execute(Operation::new(&"Hello", &"{ hello }"));
//! let response = futures::executor::block_on(request);
//! assert_eq!(response.unwrap().data, Some(json!("Hello")));
//! ```

pub mod csrf;
pub mod error;
pub mod mock;
pub mod network_error;

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use thiserror::Error;

use crate::operation::{Operation, Response, ResponseError};

pub use csrf::CsrfLink;
pub use error::ErrorLink;
pub use network_error::{NetworkErrorKind, NetworkErrorLink};

/// Result produced by a link.
pub type LinkResult = Result<Response, LinkError>;

/// Error type for request failures.
///
/// Request failures are local to the caller that issued the request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// HTTP status, when the transport reported one.
        status: Option<u16>,
        /// Classification assigned by [`NetworkErrorLink`].
        kind: Option<NetworkErrorKind>,
    },

    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQL(Vec<ResponseError>),

    #[error("No terminating link handled operation `{0}`")]
    Unhandled(String),

    #[error("Cache miss for `{0}`")]
    CacheMiss(String),
}

impl LinkError {
    /// An unclassified network error.
    #[must_use]
    pub fn network(message: &impl ToString, status: Option<u16>) -> Self {
        Self::Network {
            message: message.to_string(),
            status,
            kind: None,
        }
    }
}

fn join_messages(errors: &[ResponseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A unit in the request-processing chain.
pub trait Link: Send + Sync + 'static {
    /// Handles `operation`, usually by calling [`Next::run`].
    ///
    /// Work done before the returned future is created happens at issuance,
    /// in chain order.
    fn request(&self, operation: Operation, next: Next) -> BoxFuture<'static, LinkResult>;

    /// Human-readable name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Handle for the remainder of a chain.
#[derive(Clone)]
pub struct Next {
    links: Arc<[Arc<dyn Link>]>,
    index: usize,
}

impl Next {
    /// Forwards `operation` to the next link.
    ///
    /// Past the last link, resolves to [`LinkError::Unhandled`].
    pub fn run(self, operation: Operation) -> BoxFuture<'static, LinkResult> {
        let Some(link) = self.links.get(self.index).cloned() else {
            return future::ready(Err(LinkError::Unhandled(operation.name))).boxed();
        };

        tracing::trace!(link = link.name(), operation = %operation.name, "forwarding");
        let next = Self {
            links: self.links,
            index: self.index + 1,
        };
        link.request(operation, next)
    }
}

/// An ordered, immutable list of links.
#[derive(Clone)]
pub struct Chain {
    links: Arc<[Arc<dyn Link>]>,
}

impl Chain {
    #[must_use]
    pub fn new(links: Vec<Arc<dyn Link>>) -> Self {
        Self {
            links: links.into(),
        }
    }

    /// Runs `operation` through the chain, starting at the first link.
    pub fn execute(&self, operation: Operation) -> BoxFuture<'static, LinkResult> {
        Next {
            links: self.links.clone(),
            index: 0,
        }
        .run(operation)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Names of the links, in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Assembles the provider's chain.
///
/// The layout is always
/// `[tracker?, CsrfLink, ErrorLink, NetworkErrorLink, terminal?]`.
/// The tracker goes first so it observes every request, including requests
/// issued by inner links. A missing terminal leaves no placeholder behind.
pub struct ChainBuilder {
    tracker: Option<Arc<dyn Link>>,
    terminal: Option<Arc<dyn Link>>,
}

impl ChainBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: None,
            terminal: None,
        }
    }

    /// Sets the outermost link.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<dyn Link>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Sets the caller's terminal link, if any.
    #[must_use]
    pub fn terminal(mut self, terminal: Option<Arc<dyn Link>>) -> Self {
        self.terminal = terminal;
        self
    }

    #[must_use]
    pub fn build(self) -> Chain {
        let mut links: Vec<Arc<dyn Link>> = Vec::with_capacity(5);
        links.extend(self.tracker);
        links.push(Arc::new(CsrfLink::new()));
        links.push(Arc::new(ErrorLink::new()));
        links.push(Arc::new(NetworkErrorLink::new()));
        links.extend(self.terminal);
        Chain::new(links)
    }
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
