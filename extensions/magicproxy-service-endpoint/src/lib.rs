mod endpoint;
pub use endpoint::*;

mod endpoint_interface;
pub use endpoint_interface::*;

pub mod error;
pub use error::EndpointError;

mod invoker;
pub use invoker::*;

mod method_entry;
pub use method_entry::*;

mod mock_connection;
pub use mock_connection::*;

mod with_entries_trait;
pub use with_entries_trait::*;

#[doc(hidden)]
pub use magicproxy_service::TypeToken;
