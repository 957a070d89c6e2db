/// The decoded fixed-size header of a message.
///
/// Lengths are kept signed because that is how they travel on the wire; a
/// negative value is a framing error and is rejected by
/// [`MessageCodec::validate_header`](crate::message::MessageCodec::validate_header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// The connection state (or info) word pushed with every message.
    pub state: u32,

    pub error_len: i32,

    pub data_len: i32,

    /// Reserved for future protocol extensions. Always produced as `0`, but
    /// a receiver must still read and discard this many bytes.
    pub extension_len: i32,
}

impl MessageHeader {
    /// Sum of all declared segment lengths, widened so it cannot overflow.
    pub fn declared_len(&self) -> i64 {
        self.error_len as i64 + self.data_len as i64 + self.extension_len as i64
    }
}

/// A single message exchanged on a connection.
///
/// Requests carry the envelope in `data` and an empty `error`. Responses
/// carry either an error description or the encoded result, never both.
/// Extension bytes are never surfaced; they are discarded on read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub state: u32,
    pub error: Vec<u8>,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(state: u32, error: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            state,
            error: error.into(),
            data: data.into(),
        }
    }

    /// Creates a message with an empty error segment.
    pub fn with_data(state: u32, data: impl Into<Vec<u8>>) -> Self {
        Self::new(state, Vec::new(), data)
    }

    /// Creates a message carrying only an error description.
    pub fn with_error(state: u32, error: &str) -> Self {
        Self::new(state, error.as_bytes().to_vec(), Vec::new())
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Returns the error segment as text, or `None` if it is empty.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the error text is
    /// informational only.
    pub fn error_text(&self) -> Option<String> {
        if self.error.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.error).into_owned())
        }
    }

    pub fn header(&self) -> MessageHeader {
        MessageHeader {
            state: self.state,
            error_len: self.error.len() as i32,
            data_len: self.data.len() as i32,
            extension_len: 0,
        }
    }
}
