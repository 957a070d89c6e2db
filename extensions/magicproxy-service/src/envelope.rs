use crate::{SerializerConfig, SerializerError};
use magicproxy::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The client-to-server request payload.
///
/// On the wire this is the JSON array `[method, typeArgNames, args]`; any
/// other arity fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope(pub String, pub Vec<String>, pub Vec<Value>);

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, type_args: Vec<String>, args: Vec<Value>) -> Self {
        Self(method.into(), type_args, args)
    }

    pub fn method(&self) -> &str {
        &self.0
    }

    pub fn type_args(&self) -> &[String] {
        &self.1
    }

    pub fn args(&self) -> &[Value] {
        &self.2
    }

    pub fn into_parts(self) -> (String, Vec<String>, Vec<Value>) {
        (self.0, self.1, self.2)
    }

    pub fn to_bytes(&self, serializer: &SerializerConfig) -> Result<Vec<u8>, SerializerError> {
        serializer.encode(self)
    }

    pub fn from_bytes(
        bytes: &[u8],
        serializer: &SerializerConfig,
    ) -> Result<Self, SerializerError> {
        serializer.decode(bytes)
    }
}

/// A server response as seen by the caller: an error description or a
/// payload, plus the state word that came with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseEnvelope {
    pub state: u32,
    pub error: Option<String>,
    pub data: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn into_result(self) -> Result<Vec<u8>, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl From<Message> for ResponseEnvelope {
    fn from(message: Message) -> Self {
        Self {
            state: message.state,
            error: message.error_text(),
            data: message.data,
        }
    }
}
