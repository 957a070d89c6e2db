use std::net::SocketAddr;

/// What the runtime knows about a connection when the service object for it
/// is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Stable per-connection identifier, used as the log prefix.
    pub id: u64,

    pub remote_addr: Option<SocketAddr>,

    /// DER-encoded certificate chain presented by the peer, leaf first.
    /// Empty when the peer presented none (or the transport is plaintext).
    pub peer_certificates: Vec<Vec<u8>>,
}

impl ConnectionInfo {
    pub fn new(id: u64, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            id,
            remote_addr,
            peer_certificates: Vec::new(),
        }
    }

    pub fn with_peer_certificates(mut self, peer_certificates: Vec<Vec<u8>>) -> Self {
        self.peer_certificates = peer_certificates;
        self
    }

    /// The peer's leaf certificate, if any.
    pub fn client_certificate(&self) -> Option<&[u8]> {
        self.peer_certificates.first().map(Vec::as_slice)
    }
}

/// The collaborator contract every service implementation fulfils.
///
/// One instance exists per connection. It owns the connection state bitmask;
/// the runtime only reads it and pushes it to the peer with every message.
#[async_trait::async_trait]
pub trait ServiceBackend: Send + Sync + 'static {
    /// The current connection state in its 32-bit wire form.
    fn connection_state(&self) -> u32;

    /// Called once after the handshake, before any request is served.
    ///
    /// Return `None` to accept, or a reason to decline; a declined
    /// connection receives that reason and is closed.
    async fn approve_connection(&self) -> Option<String> {
        None
    }
}
