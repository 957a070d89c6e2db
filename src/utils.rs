mod next_connection_id;
pub use next_connection_id::next_connection_id;
