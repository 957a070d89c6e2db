use crate::SerializerError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Object key through which a payload could name its own type.
pub const TYPE_NAME_KEY: &str = "$type";

/// Structural encoding rules shared by both ends of a connection.
///
/// Values are JSON. Date/time values use chrono's RFC 3339 representation,
/// which keeps the UTC offset, so a `DateTime<FixedOffset>` comes back with
/// the same offset it was sent with. Strings are never speculatively parsed
/// as dates; only the static target type decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerConfig {
    /// Reject any object that carries a `"$type"` key.
    pub forbid_type_names: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            forbid_type_names: true,
        }
    }
}

impl SerializerConfig {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, SerializerError> {
        Ok(serde_json::to_value(value)?)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.from_value(value)
    }

    pub fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, SerializerError> {
        self.check(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Applies the structural rules to an already-parsed value.
    pub fn check(&self, value: &Value) -> Result<(), SerializerError> {
        if self.forbid_type_names {
            find_type_name(value, "$")
        } else {
            Ok(())
        }
    }
}

fn find_type_name(value: &Value, path: &str) -> Result<(), SerializerError> {
    match value {
        Value::Object(map) => {
            if map.contains_key(TYPE_NAME_KEY) {
                return Err(SerializerError::EmbeddedTypeName {
                    path: path.to_string(),
                });
            }
            for (key, child) in map {
                find_type_name(child, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                find_type_name(child, &format!("{path}[{index}]"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
