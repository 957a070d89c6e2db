use std::io::Result;
use tokio::net::TcpListener;

/// Binds a listener to an OS-assigned free port on the loopback interface.
///
/// The listener is returned already bound, so the port cannot be taken by
/// another process between choosing it and serving on it. Hand the listener
/// to [`MagicProxyServer::spawn_with_listener`] and point clients at the
/// returned port.
///
/// Only reachable from the local machine; bind explicitly for anything else.
///
/// [`MagicProxyServer::spawn_with_listener`]: crate::MagicProxyServer::spawn_with_listener
pub async fn bind_tcp_listener_on_random_port() -> Result<(TcpListener, u16)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}
