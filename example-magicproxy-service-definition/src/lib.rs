mod backend;
pub use backend::*;

mod contract;
pub use contract::*;

mod example_backend;
pub use example_backend::ExampleBackend;

mod flags;
pub use flags::BackendFlags;

mod proxy;
pub use proxy::BackendProxy;

mod types;
pub use types::*;
