use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageEncodeError {
    /// The error and data segments together exceed the configured maximum.
    #[error("message to be sent is too long: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageDecodeError {
    /// Fewer than 16 bytes were supplied to the header decoder.
    #[error("incomplete message header: {0} bytes")]
    IncompleteHeader(usize),

    #[error("negative segment length in message header: {0}")]
    NegativeLength(i32),

    /// The declared segment lengths exceed the configured maximum. Nothing
    /// of the declared size has been allocated when this is returned.
    #[error("received message too long: {len} bytes (max {max})")]
    TooLarge { len: i64, max: usize },

    /// The peer closed the stream after the first header byte but before
    /// the message was complete.
    #[error("stream closed in the middle of a message")]
    Truncated,
}

#[derive(Debug, Error)]
pub enum MessageIoError {
    #[error(transparent)]
    Encode(#[from] MessageEncodeError),

    #[error(transparent)]
    Decode(#[from] MessageDecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("socket operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl MessageIoError {
    /// `true` when the peer simply went away mid-message, which callers treat
    /// as an orderly disconnect rather than a failure worth reporting.
    pub fn is_disconnect(&self) -> bool {
        match self {
            MessageIoError::Decode(MessageDecodeError::Truncated) => true,
            MessageIoError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
