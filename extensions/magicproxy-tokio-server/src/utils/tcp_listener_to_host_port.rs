use std::io::Result;
use std::net::IpAddr;
use tokio::net::TcpListener;

/// The address a bound listener actually accepts on, split into host and
/// port.
///
/// After binding to port 0 this is the only way to learn which port the OS
/// picked. The pair plugs straight into a client's host and port options.
///
/// # Errors
///
/// Fails if the socket's local address cannot be queried, for example
/// because the listener was created from a socket that is no longer valid.
pub fn tcp_listener_to_host_port(listener: &TcpListener) -> Result<(IpAddr, u16)> {
    let local = listener.local_addr()?;
    Ok((local.ip(), local.port()))
}
