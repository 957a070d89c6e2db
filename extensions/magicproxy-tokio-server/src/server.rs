//! A TCP server that runs one sequential request loop per connection.
//!
//! Each accepted socket goes through the transport handshake, the
//! service's approval hook and the initial state push, then alternates
//! between reading one request and writing one response until the peer
//! leaves or the server shuts down. Nothing that happens on one connection
//! affects the listener or any other connection.

use crate::ServerError;
use magicproxy::message::{Message, MessageEncodeError, MessageIoError, read_message, write_message};
use magicproxy::utils::next_connection_id;
use magicproxy_service::{ConnectionInfo, RequestError, RuntimeConfig, ServiceBackend};
use magicproxy_service_endpoint::{Outcome, ServiceEndpoint, ServiceEndpointInterface};
use magicproxy_tls::{BoxedStream, ServerTransport};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Creates the per-connection service object.
pub type ServiceFactory<S> = Arc<dyn Fn(ConnectionInfo) -> Arc<S> + Send + Sync>;

pub struct MagicProxyServer<S>
where
    S: ServiceBackend,
{
    endpoint: Arc<ServiceEndpoint<S>>,
    factory: ServiceFactory<S>,
    transport: ServerTransport,
    shutdown: Arc<watch::Sender<bool>>,
}

impl<S> MagicProxyServer<S>
where
    S: ServiceBackend,
{
    /// `factory` is called once per connection, after the handshake, with
    /// what is known about the peer.
    pub fn new<F>(endpoint: Arc<ServiceEndpoint<S>>, transport: ServerTransport, factory: F) -> Self
    where
        F: Fn(ConnectionInfo) -> Arc<S> + Send + Sync + 'static,
    {
        let (shutdown, _) = watch::channel(false);
        Self {
            endpoint,
            factory: Arc::new(factory),
            transport,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Returns an `Arc` clone of the underlying endpoint, for registering
    /// handlers.
    pub fn endpoint(&self) -> Arc<ServiceEndpoint<S>> {
        self.endpoint.clone()
    }

    /// Binds to an address and serves for as long as the returned future
    /// is polled.
    ///
    /// The server is consumed, so nothing can reach
    /// [`shutdown`](Self::shutdown) afterwards. To stop it, keep an `Arc`
    /// and call [`serve_with_listener`](Self::serve_with_listener), or use
    /// [`spawn_with_listener`](Self::spawn_with_listener) for a
    /// [`ServerHandle`].
    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> Result<SocketAddr, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let server = Arc::new(self);
        server.serve_with_listener(listener).await
    }

    /// [`serve`](Self::serve) on `host:port`; the same lifetime applies.
    pub async fn serve_on(self, host: &str, port: u16) -> Result<SocketAddr, ServerError> {
        let addr = format!("{host}:{port}");
        self.serve(addr).await
    }

    /// Serves on a pre-bound listener until [`shutdown`](Self::shutdown)
    /// is called through another clone of the `Arc`.
    ///
    /// Fails up front if any contract method has no registered handler.
    pub async fn serve_with_listener(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> Result<SocketAddr, ServerError> {
        self.endpoint.verify().await?;

        let address = listener.local_addr()?;
        let mut shutdown = self.shutdown.subscribe();
        tracing::info!("Server running on {:?}", address);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => {}
                accepted = listener.accept() => match accepted {
                    Ok((tcp, remote_addr)) => {
                        let server = self.clone();
                        tokio::spawn(async move {
                            server.handle_connection(tcp, remote_addr).await;
                        });
                    }
                    Err(err) => {
                        tracing::error!("Accept error on {}: {}", address, err);
                    }
                },
            }
        }

        tracing::info!("Server on {:?} shutting down", address);
        Ok(address)
    }

    /// Serves on a pre-bound listener in a background task.
    pub fn spawn_with_listener(
        self: Arc<Self>,
        listener: TcpListener,
    ) -> Result<ServerHandle, ServerError> {
        let local_addr = listener.local_addr()?;
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.serve_with_listener(listener));
        Ok(ServerHandle {
            local_addr,
            shutdown,
            task: Some(task),
        })
    }

    /// Stops accepting and closes idle connections. A request already being
    /// dispatched is finished and answered first.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    async fn handle_connection(self: Arc<Self>, tcp: TcpStream, remote_addr: SocketAddr) {
        let id = next_connection_id();
        let config = self.endpoint.config_arc();
        tracing::info!("[{}] Client connected: {}", id, remote_addr);

        if let Err(err) = tcp.set_nodelay(true) {
            tracing::debug!("[{}] Could not disable Nagle: {}", id, err);
        }

        let (mut stream, peer_certificates) =
            match timeout(config.socket_timeout, self.transport.accept(tcp)).await {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(err)) => {
                    tracing::warn!("[{}] Handshake failed: {}", id, err);
                    return;
                }
                Err(_) => {
                    tracing::warn!(
                        "[{}] Handshake timed out after {:?}",
                        id,
                        config.socket_timeout
                    );
                    return;
                }
            };

        let info = ConnectionInfo::new(id, Some(remote_addr))
            .with_peer_certificates(peer_certificates);
        let service = (self.factory)(info);

        if self.greet(id, &service, &mut stream, &config).await {
            self.serve_requests(id, &service, &mut stream, &config).await;
        }

        if let Err(err) = stream.shutdown().await {
            tracing::debug!("[{}] Close failed: {}", id, err);
        }
        tracing::info!("[{}] Connection closed", id);
    }

    /// Runs the approval hook and pushes the initial state. Returns `false`
    /// when the connection must be closed without serving requests.
    async fn greet(
        &self,
        id: u64,
        service: &Arc<S>,
        stream: &mut BoxedStream,
        config: &RuntimeConfig,
    ) -> bool {
        let declined = service.approve_connection().await;
        let state = service.connection_state();
        let initial = match &declined {
            Some(reason) => Message::with_error(state, reason),
            None => Message::with_data(state, Vec::new()),
        };

        if let Err(err) = write_with_timeout(stream, &initial, config).await {
            tracing::warn!("[{}] Could not send initial state: {}", id, err);
            return false;
        }

        match declined {
            Some(reason) => {
                tracing::info!("[{}] Connection declined: {}", id, reason);
                false
            }
            None => true,
        }
    }

    async fn serve_requests(
        &self,
        id: u64,
        service: &Arc<S>,
        stream: &mut BoxedStream,
        config: &RuntimeConfig,
    ) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            let read = tokio::select! {
                read = read_message(stream, config.max_message_size) => read,
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::info!("[{}] Server shutting down, closing connection", id);
                    return;
                }
            };

            let request = match read {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::info!("[{}] Client disconnected", id);
                    return;
                }
                Err(err) if err.is_disconnect() => {
                    tracing::info!("[{}] Client disconnected mid-message", id);
                    return;
                }
                Err(err) => {
                    tracing::warn!("[{}] Closing connection: {}", id, err);
                    return;
                }
            };

            let outcome = self.endpoint.handle_request(service, &request.data).await;
            log_outcome(id, &outcome);

            let method = outcome.method.clone().unwrap_or_default();
            let run = outcome.elapsed;
            let response = fit_response(
                outcome.into_message(service.connection_state()),
                config.max_message_size,
            );

            let sent = Instant::now();
            if let Err(err) = write_with_timeout(stream, &response, config).await {
                tracing::warn!("[{}] Could not send response: {}", id, err);
                return;
            }

            tracing::debug!(
                "[{}] run:{}ms tx:{}ms {}",
                id,
                run.as_millis(),
                sent.elapsed().as_millis(),
                method
            );
        }
    }
}

/// Controls a server started with
/// [`spawn_with_listener`](MagicProxyServer::spawn_with_listener).
/// Dropping the handle shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<watch::Sender<bool>>,
    task: Option<JoinHandle<Result<SocketAddr, ServerError>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Shuts down and waits for the accept loop to exit.
    pub async fn stop(mut self) -> Result<SocketAddr, ServerError> {
        self.shutdown();
        match self.task.take() {
            Some(task) => task.await?,
            None => Ok(self.local_addr),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // An error means the sender is gone, which only happens once the
    // server itself is dropped.
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

async fn write_with_timeout(
    stream: &mut BoxedStream,
    message: &Message,
    config: &RuntimeConfig,
) -> Result<(), MessageIoError> {
    timeout(
        config.socket_timeout,
        write_message(stream, message, config.max_message_size),
    )
    .await
    .map_err(|_| MessageIoError::TimedOut(config.socket_timeout))?
}

/// Replaces a response that would exceed the message limit with an error
/// response, so an oversized result fails the request rather than the
/// connection.
fn fit_response(response: Message, max_message_size: usize) -> Message {
    let len = response.error.len() + response.data.len();
    if len <= max_message_size {
        return response;
    }
    let err = RequestError::Parse(
        MessageEncodeError::TooLarge {
            len,
            max: max_message_size,
        }
        .to_string(),
    );
    Message::with_error(response.state, &err.to_string())
}

fn log_outcome(id: u64, outcome: &Outcome) {
    match &outcome.result {
        Ok(_) => {}
        Err(err @ RequestError::Implementation(_)) => tracing::error!("[{}] {}", id, err),
        Err(err) => tracing::warn!("[{}] {}", id, err),
    }
}
