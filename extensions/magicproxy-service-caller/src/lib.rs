mod admission;
pub use admission::*;

mod caller_interface;
pub use caller_interface::*;

pub mod error;
pub use error::CallerError;

mod macros;
