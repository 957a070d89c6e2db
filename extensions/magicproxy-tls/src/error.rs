use thiserror::Error;

/// A certificate configuration that cannot be turned into a transport.
#[derive(Debug, Error)]
pub enum TlsSetupError {
    #[error("at least one server identity is required")]
    NoIdentity,

    #[error("server identity #{0} has no DNS name")]
    NoDnsName(usize),

    #[error("DNS name {0} is claimed by more than one server identity")]
    DuplicateDnsName(String),

    #[error("server identity #{0} has an empty certificate chain")]
    EmptyChain(usize),

    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    #[error("client CA could not be used: {0}")]
    ClientCa(#[from] rustls::server::VerifierBuilderError),

    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}
