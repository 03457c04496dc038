//! Classification of transport failures.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::operation::Operation;

use super::{Link, LinkError, LinkResult, Next};

/// Coarse category of a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// Any other 4xx.
    Client,
    /// 5xx.
    Server,
    /// No status, or a status outside the error ranges.
    Unknown,
}

impl NetworkErrorKind {
    #[must_use]
    pub const fn from_status(status: Option<u16>) -> Self {
        match status {
            Some(401) => Self::Unauthorized,
            Some(403) => Self::Forbidden,
            Some(400..=499) => Self::Client,
            Some(500..=599) => Self::Server,
            _ => Self::Unknown,
        }
    }
}

/// Tags every [`LinkError::Network`] coming back up the chain with a
/// [`NetworkErrorKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkErrorLink;

impl NetworkErrorLink {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Link for NetworkErrorLink {
    fn request(&self, operation: Operation, next: Next) -> BoxFuture<'static, LinkResult> {
        let name = operation.name.clone();
        next.run(operation)
            .map(move |result| {
                result.map_err(|error| match error {
                    LinkError::Network {
                        message, status, ..
                    } => {
                        let kind = NetworkErrorKind::from_status(status);
                        tracing::debug!(operation = %name, ?status, ?kind, "network error");
                        LinkError::Network {
                            message,
                            status,
                            kind: Some(kind),
                        }
                    }
                    other => other,
                })
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Chain;
    use crate::link::mock::MockLink;
    use std::sync::Arc;

    #[test]
    fn test_from_status() {
        assert_eq!(NetworkErrorKind::from_status(Some(401)), NetworkErrorKind::Unauthorized);
        assert_eq!(NetworkErrorKind::from_status(Some(403)), NetworkErrorKind::Forbidden);
        assert_eq!(NetworkErrorKind::from_status(Some(404)), NetworkErrorKind::Client);
        assert_eq!(NetworkErrorKind::from_status(Some(502)), NetworkErrorKind::Server);
        assert_eq!(NetworkErrorKind::from_status(Some(200)), NetworkErrorKind::Unknown);
        assert_eq!(NetworkErrorKind::from_status(None), NetworkErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_network_errors_are_classified() {
        let mock = MockLink::new().respond_with(
            &"Q",
            Err(LinkError::network(&"upstream down", Some(503))),
        );
        let chain = Chain::new(vec![Arc::new(NetworkErrorLink::new()), Arc::new(mock)]);

        let result = chain.execute(Operation::new(&"Q", &"{ q }")).await;
        assert_eq!(
            result,
            Err(LinkError::Network {
                message: "upstream down".to_string(),
                status: Some(503),
                kind: Some(NetworkErrorKind::Server),
            })
        );
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let chain = Chain::new(vec![Arc::new(NetworkErrorLink::new())]);
        let result = chain.execute(Operation::new(&"Q", &"{ q }")).await;
        assert_eq!(result, Err(LinkError::Unhandled("Q".to_string())));
    }
}
