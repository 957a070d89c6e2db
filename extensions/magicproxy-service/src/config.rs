use crate::{SerializerConfig, TypeResolutionError, TypeSource, TypeToken, builtin_types};
use magicproxy::constants::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SOCKET_TIMEOUT_MS};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How much of an implementation failure is forwarded to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDetail {
    /// Message, cause chain and backtrace (when captured).
    #[default]
    Full,
    /// Top-level message only.
    Redacted,
}

/// Settings shared by endpoint, server and client.
///
/// Passed explicitly to constructors; there is no global configuration.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Limit on `error + data + extension` bytes of one message.
    pub max_message_size: usize,

    /// Applied to TCP connect, TLS handshake, the initial state exchange and
    /// every write.
    pub socket_timeout: Duration,

    /// Upper bound on waiting for a response after a request was written.
    /// `None` waits as long as the method takes.
    pub response_timeout: Option<Duration>,

    pub serializer: SerializerConfig,

    /// Consulted in order after the built-in types when resolving generic
    /// type arguments.
    pub type_sources: Vec<Arc<dyn TypeSource>>,

    pub error_detail: ErrorDetail,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            socket_timeout: Duration::from_millis(DEFAULT_SOCKET_TIMEOUT_MS),
            response_timeout: None,
            serializer: SerializerConfig::default(),
            type_sources: Vec::new(),
            error_detail: ErrorDetail::default(),
        }
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("max_message_size", &self.max_message_size)
            .field("socket_timeout", &self.socket_timeout)
            .field("response_timeout", &self.response_timeout)
            .field("serializer", &self.serializer)
            .field("type_sources", &self.type_sources.len())
            .field("error_detail", &self.error_detail)
            .finish()
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn with_socket_timeout(mut self, socket_timeout: Duration) -> Self {
        self.socket_timeout = socket_timeout;
        self
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = Some(response_timeout);
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerConfig) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_type_source(mut self, source: Arc<dyn TypeSource>) -> Self {
        self.type_sources.push(source);
        self
    }

    pub fn with_error_detail(mut self, error_detail: ErrorDetail) -> Self {
        self.error_detail = error_detail;
        self
    }

    /// Resolves a wire type name: built-in types first, then each
    /// configured source in order.
    pub fn resolve_type(&self, name: &str) -> Result<TypeToken, TypeResolutionError> {
        builtin_types()
            .resolve(name)
            .or_else(|| self.type_sources.iter().find_map(|s| s.resolve(name)))
            .ok_or_else(|| TypeResolutionError(name.to_string()))
    }
}
