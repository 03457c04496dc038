//! Translation of server-reported errors.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::operation::Operation;

use super::{Link, LinkError, LinkResult, Next};

/// Normalizes error-only responses into [`LinkError::GraphQL`].
///
/// A response that carries errors together with partial data is passed
/// through unchanged; its errors are logged at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLink;

impl ErrorLink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Link for ErrorLink {
    fn request(&self, operation: Operation, next: Next) -> BoxFuture<'static, LinkResult> {
        let name = operation.name.clone();
        next.run(operation)
            .map(move |result| {
                let response = result?;
                if !response.has_errors() {
                    return Ok(response);
                }

                for error in &response.errors {
                    tracing::warn!(operation = %name, message = %error.message, "graphql error");
                }

                if response.data.is_none() {
                    Err(LinkError::GraphQL(response.errors))
                } else {
                    Ok(response)
                }
            })
            .boxed()
    }
}
