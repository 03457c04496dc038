//! CSRF token attachment.

use futures::future::BoxFuture;
use serde_json::Value;

use crate::operation::Operation;

use super::{Link, LinkResult, Next};

/// Context key holding the CSRF token for an operation.
pub const CSRF_CONTEXT_KEY: &str = "csrfToken";

/// Header the token is sent in.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Copies the operation's `csrfToken` context entry into the
/// `X-CSRF-Token` header.
///
/// Operations without a token (or with a non-string token) are forwarded
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfLink;

impl CsrfLink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Link for CsrfLink {
    fn request(&self, mut operation: Operation, next: Next) -> BoxFuture<'static, LinkResult> {
        if let Some(Value::String(token)) = operation.context.get(CSRF_CONTEXT_KEY) {
            let token = token.clone();
            operation.headers.insert(CSRF_HEADER.to_string(), token);
        }
        next.run(operation)
    }
}
