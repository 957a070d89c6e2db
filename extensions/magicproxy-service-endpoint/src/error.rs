use thiserror::Error;

/// Errors raised while setting up an endpoint. Per-request failures are
/// [`RequestError`](magicproxy_service::RequestError)s instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("method {0} is not part of the service contract")]
    UnknownMethod(String),

    #[error("a handler for method {0} is already registered")]
    AlreadyRegistered(String),

    /// A generic method registered with a plain invoker, or the reverse.
    #[error("method {method} {reason}")]
    BindingMismatch {
        method: String,
        reason: &'static str,
    },

    #[error("no handler registered for: {}", .0.join(", "))]
    Unregistered(Vec<String>),
}
