mod server;
pub use server::*;

pub mod error;
pub use error::ServerError;

pub mod utils;

pub use magicproxy_service_endpoint::{ServiceEndpoint, ServiceEndpointInterface};
