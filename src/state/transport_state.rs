use std::fmt;

/// Lifecycle of one client or server connection.
///
/// ```text
/// Disconnected -> Handshaking -> AwaitingInitialState -> Ready <-> InFlight
///      ^                                                   |
///      +---------------------------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportState {
    #[default]
    Disconnected,

    /// TCP connect and TLS handshake in progress.
    Handshaking,

    /// Handshake finished; waiting for the server's initial state push.
    AwaitingInitialState,

    Ready,

    /// A request has been sent and its response is outstanding.
    InFlight,
}

impl TransportState {
    pub fn is_connected(self) -> bool {
        matches!(self, TransportState::Ready | TransportState::InFlight)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Disconnected => "disconnected",
            TransportState::Handshaking => "handshaking",
            TransportState::AwaitingInitialState => "awaiting-initial-state",
            TransportState::Ready => "ready",
            TransportState::InFlight => "in-flight",
        };
        f.write_str(name)
    }
}
