use chrono::{DateTime, Utc};
use magicproxy_service::TypeRegistry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub born: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bar {
    pub id: i32,
    pub tags: Vec<String>,
}

/// Application types usable as generic type arguments of [`Backend`](crate::Backend)
/// methods, beyond the built-in ones.
pub fn backend_types() -> TypeRegistry {
    TypeRegistry::new().with::<Person>().with::<Bar>()
}
