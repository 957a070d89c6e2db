use magicproxy_service::RuntimeConfig;
use magicproxy_tls::ClientTransport;
use std::sync::Arc;

/// Where and how a [`MagicProxyClient`](crate::MagicProxyClient) connects.
#[derive(Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub transport: ClientTransport,
    pub config: Arc<RuntimeConfig>,
}

impl ClientOptions {
    /// Plaintext with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            transport: ClientTransport::Plaintext,
            config: Arc::new(RuntimeConfig::default()),
        }
    }

    pub fn with_transport(mut self, transport: ClientTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_config(mut self, config: Arc<RuntimeConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
