mod client;
pub use client::*;

mod options;
pub use options::*;

pub use magicproxy::state::TransportState;
pub use magicproxy_service_caller::{CallerError, ServiceCallerInterface};
