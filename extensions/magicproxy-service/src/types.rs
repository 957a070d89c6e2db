use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Serialize, de::DeserializeOwned};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Anything that can cross the wire as an argument or result.
pub trait WireType: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> WireType for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A runtime tag for a concrete type, paired with its wire name.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Debug, Clone, Copy)]
pub struct TypeToken {
    name: &'static str,
    id: TypeId,
}

impl TypeToken {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl Hash for TypeToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The wire name sent for a generic type argument `T`.
///
/// Names come from `std::any::type_name`, so client and server must be built
/// with the same compiler to agree on them.
pub fn type_arg<T: ?Sized>() -> String {
    type_name::<T>().to_string()
}

/// A lookup from wire type names to concrete types.
pub trait TypeSource: Send + Sync {
    fn resolve(&self, name: &str) -> Option<TypeToken>;
}

/// A name-keyed set of types, populated explicitly at startup.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_name: HashMap<&'static str, TypeToken>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ?Sized + 'static>(&mut self) -> &mut Self {
        let token = TypeToken::of::<T>();
        self.by_name.insert(token.name(), token);
        self
    }

    pub fn with<T: ?Sized + 'static>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl TypeSource for TypeRegistry {
    fn resolve(&self, name: &str) -> Option<TypeToken> {
        self.by_name.get(name).copied()
    }
}

static BUILTIN_TYPES: Lazy<TypeRegistry> = Lazy::new(|| {
    TypeRegistry::new()
        .with::<bool>()
        .with::<char>()
        .with::<i8>()
        .with::<i16>()
        .with::<i32>()
        .with::<i64>()
        .with::<u8>()
        .with::<u16>()
        .with::<u32>()
        .with::<u64>()
        .with::<f32>()
        .with::<f64>()
        .with::<String>()
        .with::<Vec<u8>>()
        .with::<serde_json::Value>()
        .with::<DateTime<Utc>>()
        .with::<DateTime<FixedOffset>>()
        .with::<NaiveDate>()
        .with::<NaiveDateTime>()
});

/// Primitive and standard types every endpoint can resolve without
/// additional configuration.
pub fn builtin_types() -> &'static TypeRegistry {
    &BUILTIN_TYPES
}
