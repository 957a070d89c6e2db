use magicproxy::message::MessageIoError;
use magicproxy_service::SerializerError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a call, from the perspective of the caller.
#[derive(Debug, Error)]
pub enum CallerError {
    /// A transport-level I/O error (connect, handshake, socket).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Message(#[from] MessageIoError),

    /// The server processed the request and reported a failure.
    /// The text is the server's description, unmodified.
    #[error("{0}")]
    Remote(String),

    #[error("Proxy not connected")]
    NotConnected,

    /// The server's approval hook rejected the connection.
    #[error("Connection declined: {0}")]
    Declined(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Raised locally, before anything is sent, when the last known
    /// connection state lacks flags the method requires.
    #[error("Method [{method}] is not allowed, state(s) missing: [{missing}]")]
    NotAuthorized { method: String, missing: String },

    #[error("Method [{0}] not found")]
    UnknownMethod(String),

    /// The call does not match the method's declared shape.
    #[error("Method [{method}] {reason}")]
    Signature { method: String, reason: String },

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error(transparent)]
    Serialization(#[from] SerializerError),

    #[error("No response within {0:?}")]
    TimedOut(Duration),
}

impl From<serde_json::Error> for CallerError {
    fn from(err: serde_json::Error) -> Self {
        CallerError::Serialization(SerializerError::Json(err))
    }
}

impl CallerError {
    /// The server-supplied failure description, if this is a remote failure.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            CallerError::Remote(message) => Some(message),
            _ => None,
        }
    }

    /// `true` when the error left the client without a usable connection.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            CallerError::Io(_)
                | CallerError::Message(_)
                | CallerError::NotConnected
                | CallerError::Declined(_)
                | CallerError::Handshake(_)
                | CallerError::Protocol(_)
                | CallerError::ConnectionClosed
                | CallerError::TimedOut(_)
        )
    }
}
