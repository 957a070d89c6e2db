mod message_codec;
mod message_error;
mod message_io;
mod message_struct;

pub use message_codec::MessageCodec;
pub use message_error::{MessageDecodeError, MessageEncodeError, MessageIoError};
pub use message_io::{read_message, write_message};
pub use message_struct::{Message, MessageHeader};
