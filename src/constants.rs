// Message header layout
pub const MESSAGE_LENGTH_FIELD_SIZE: usize = 4;
pub const MESSAGE_STATE_OFFSET: usize = 0;
pub const MESSAGE_ERROR_LENGTH_OFFSET: usize = 4;
pub const MESSAGE_DATA_LENGTH_OFFSET: usize = 8;
pub const MESSAGE_EXTENSION_LENGTH_OFFSET: usize = 12;

/// Total size of the fixed-length header that precedes every message.
///
/// Four little-endian words: state, error length, data length, extension length.
pub const MESSAGE_HEADER_SIZE: usize =
    MESSAGE_EXTENSION_LENGTH_OFFSET + MESSAGE_LENGTH_FIELD_SIZE; // 12 + 4 = 16

/// Upper bound for `error + data + extension` bytes of a single message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 20 * 1024 * 1024;

/// Socket read/write timeout applied to handshake and writes, in milliseconds.
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 5_000;
