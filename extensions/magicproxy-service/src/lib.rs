mod backend;
pub use backend::*;

mod config;
pub use config::*;

mod contract;
pub use contract::*;

pub mod descriptor;
pub use descriptor::{MethodDescriptor, MethodKind, ReturnShape, ServiceDescriptor, TypeDescriptor};

mod envelope;
pub use envelope::*;

mod error;
pub use error::*;

mod serializer;
pub use serializer::*;

mod types;
pub use types::*;

pub use magicproxy::state::ConnectionFlags;
