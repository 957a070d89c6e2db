use crate::{
    constants::{
        MESSAGE_DATA_LENGTH_OFFSET, MESSAGE_ERROR_LENGTH_OFFSET, MESSAGE_EXTENSION_LENGTH_OFFSET,
        MESSAGE_HEADER_SIZE, MESSAGE_STATE_OFFSET,
    },
    message::{Message, MessageDecodeError, MessageEncodeError, MessageHeader},
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Provides encoding and decoding functionality for messages.
///
/// The layout is a fixed 16-byte little-endian header followed by the error,
/// data and extension segments, in that order:
///
/// ```text
/// [0..4)   state word        (u32)
/// [4..8)   error length      (i32)
/// [8..12)  data length       (i32)
/// [12..16) extension length  (i32, reserved)
/// [error bytes][data bytes][extension bytes]
/// ```
pub struct MessageCodec;

impl MessageCodec {
    /// Serializes a header into its 16-byte wire form.
    pub fn encode_header(header: &MessageHeader) -> [u8; MESSAGE_HEADER_SIZE] {
        let mut buf = [0u8; MESSAGE_HEADER_SIZE];
        buf[MESSAGE_STATE_OFFSET..MESSAGE_ERROR_LENGTH_OFFSET]
            .copy_from_slice(&header.state.to_le_bytes());
        buf[MESSAGE_ERROR_LENGTH_OFFSET..MESSAGE_DATA_LENGTH_OFFSET]
            .copy_from_slice(&header.error_len.to_le_bytes());
        buf[MESSAGE_DATA_LENGTH_OFFSET..MESSAGE_EXTENSION_LENGTH_OFFSET]
            .copy_from_slice(&header.data_len.to_le_bytes());
        buf[MESSAGE_EXTENSION_LENGTH_OFFSET..MESSAGE_HEADER_SIZE]
            .copy_from_slice(&header.extension_len.to_le_bytes());
        buf
    }

    /// Decodes the first 16 bytes of `buf` into a header.
    ///
    /// This only parses; it does not check the lengths. Use
    /// [`MessageCodec::validate_header`] before acting on them.
    pub fn decode_header(buf: &[u8]) -> Result<MessageHeader, MessageDecodeError> {
        if buf.len() < MESSAGE_HEADER_SIZE {
            return Err(MessageDecodeError::IncompleteHeader(buf.len()));
        }

        let mut cursor = &buf[..MESSAGE_HEADER_SIZE];
        Ok(MessageHeader {
            state: cursor.get_u32_le(),
            error_len: cursor.get_i32_le(),
            data_len: cursor.get_i32_le(),
            extension_len: cursor.get_i32_le(),
        })
    }

    /// Checks a decoded header against `max_message_size`.
    ///
    /// # Returns
    ///
    /// The `(error, data, extension)` segment lengths as `usize`, or an error
    /// if any length is negative or their sum exceeds the maximum.
    pub fn validate_header(
        header: &MessageHeader,
        max_message_size: usize,
    ) -> Result<(usize, usize, usize), MessageDecodeError> {
        for len in [header.error_len, header.data_len, header.extension_len] {
            if len < 0 {
                return Err(MessageDecodeError::NegativeLength(len));
            }
        }

        let total = header.declared_len();
        if total > max_message_size as i64 {
            return Err(MessageDecodeError::TooLarge {
                len: total,
                max: max_message_size,
            });
        }

        Ok((
            header.error_len as usize,
            header.data_len as usize,
            header.extension_len as usize,
        ))
    }

    /// Encodes a complete message (header, error, data) into one buffer.
    ///
    /// The extension segment is always written with length `0`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageEncodeError::TooLarge`] if `error + data` exceeds
    /// `max_message_size` or cannot be represented as an `i32` length.
    pub fn encode(message: &Message, max_message_size: usize) -> Result<Bytes, MessageEncodeError> {
        let payload_len = message.error.len() + message.data.len();
        if payload_len > max_message_size || payload_len > i32::MAX as usize {
            return Err(MessageEncodeError::TooLarge {
                len: payload_len,
                max: max_message_size,
            });
        }

        let mut buf = BytesMut::with_capacity(MESSAGE_HEADER_SIZE + payload_len);
        buf.put_u32_le(message.state);
        buf.put_i32_le(message.error.len() as i32);
        buf.put_i32_le(message.data.len() as i32);
        buf.put_i32_le(0);
        buf.put_slice(&message.error);
        buf.put_slice(&message.data);

        Ok(buf.freeze())
    }
}
