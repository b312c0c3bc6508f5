//! Service layer
//!
//! Services are plain async functions taking a `ServiceContext`. Each service
//! reports failures through its own error enum implementing `ServiceError`,
//! whose resolved name (`<service>.<code>`) is what API callers see.

pub mod health;

use std::sync::Arc;

use crate::dispatch::DispatchClient;

/// Error taxonomy shared by every service
pub trait ServiceError: std::error::Error + Send + Sync + 'static {
    /// Service prefix of the error, e.g. `health`
    fn service(&self) -> &'static str;

    /// Error code within the service, e.g. `service_unhealthy`
    fn code(&self) -> &'static str;

    /// HTTP status code the API layer should answer with
    fn status_code(&self) -> u16;

    /// Fully qualified error name: `<service>.<code>`
    fn resolve_name(&self) -> String {
        format!("{}.{}", self.service(), self.code())
    }
}

/// Dependencies available to services
#[derive(Clone)]
pub struct ServiceContext {
    pubsub: Arc<DispatchClient>,
}

impl ServiceContext {
    pub fn new(pubsub: Arc<DispatchClient>) -> Self {
        Self { pubsub }
    }

    pub fn pubsub(&self) -> &DispatchClient {
        &self.pubsub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    enum ExampleError {
        #[error("example not found")]
        NotFound,
    }

    impl ServiceError for ExampleError {
        fn service(&self) -> &'static str {
            "example"
        }

        fn code(&self) -> &'static str {
            match self {
                Self::NotFound => "not_found",
            }
        }

        fn status_code(&self) -> u16 {
            404
        }
    }

    #[test]
    fn test_resolve_name() {
        assert_eq!(ExampleError::NotFound.resolve_name(), "example.not_found");
    }
}
