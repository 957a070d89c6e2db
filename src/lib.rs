pub mod constants;
pub mod message;
pub mod state;
pub mod utils;
