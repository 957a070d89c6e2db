mod connection_flags;
mod transport_state;

pub use connection_flags::ConnectionFlags;
pub use transport_state::TransportState;
