use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream, plain or encrypted.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxedStream = Box<dyn AsyncStream>;
