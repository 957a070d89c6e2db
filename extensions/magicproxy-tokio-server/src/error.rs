use magicproxy_service_endpoint::EndpointError;
use magicproxy_tls::TlsSetupError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Tls(#[from] TlsSetupError),

    /// The endpoint is missing handlers for some contract methods.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
