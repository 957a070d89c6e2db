use crate::ClientOptions;
use magicproxy::message::{
    Message, MessageEncodeError, MessageIoError, read_message, write_message,
};
use magicproxy::state::{ConnectionFlags, TransportState};
use magicproxy_service::{ResponseEnvelope, SerializerConfig, ServiceContract};
use magicproxy_service_caller::{CallerError, ServiceCallerInterface, SingleFlight};
use magicproxy_tls::BoxedStream;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    transport_state: Option<Handler<TransportState>>,
    connected: Option<Handler<bool>>,
    connection_state: Option<Handler<u32>>,
    response_time: Option<Handler<Duration>>,
}

/// An established stream on which exactly one exchange may be active.
struct Session {
    stream: BoxedStream,
}

/// A connection to a MagicProxy server.
///
/// Any number of tasks may call through one client; their exchanges are
/// serialized on the single underlying connection.
pub struct MagicProxyClient {
    options: ClientOptions,
    contract: Arc<ServiceContract>,
    session: SingleFlight<Option<Session>>,
    connected: AtomicBool,
    state: AtomicU32,
    transport_state: Mutex<TransportState>,
    last_response_time: Mutex<Option<Duration>>,
    handlers: Mutex<Handlers>,
}

impl MagicProxyClient {
    /// Creates a disconnected client; call [`connect`](Self::connect) before
    /// making calls.
    pub fn new(options: ClientOptions, contract: Arc<ServiceContract>) -> Self {
        Self {
            options,
            contract,
            session: SingleFlight::new(None),
            connected: AtomicBool::new(false),
            state: AtomicU32::new(0),
            transport_state: Mutex::new(TransportState::Disconnected),
            last_response_time: Mutex::new(None),
            handlers: Mutex::new(Handlers::default()),
        }
    }

    /// Connects, performs the handshake and waits for the server's initial
    /// state. Does nothing when already connected.
    ///
    /// # Errors
    ///
    /// [`CallerError::Declined`] when the server's approval hook rejected the
    /// connection; I/O, handshake and timeout errors otherwise. The client is
    /// `Disconnected` after any error.
    pub async fn connect(&self) -> Result<(), CallerError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        self.set_transport_state(TransportState::Handshaking);
        match self.open().await {
            Ok(stream) => {
                *session = Some(Session { stream });
                self.set_connected(true);
                self.set_transport_state(TransportState::Ready);
                tracing::info!("Connected to {}", self.options.address());
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Connection to {} failed: {}", self.options.address(), err);
                self.set_transport_state(TransportState::Disconnected);
                Err(err)
            }
        }
    }

    /// Closes the connection in an orderly way, after any exchange in
    /// progress has completed.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        if let Some(mut session) = session.take() {
            if let Err(err) = session.stream.shutdown().await {
                tracing::debug!("Close failed: {}", err);
            }
            tracing::info!("Disconnected from {}", self.options.address());
        }
        self.mark_disconnected();
    }

    pub fn transport_state(&self) -> TransportState {
        *self
            .transport_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` while any caller is waiting for or holding the connection.
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// The connection state interpreted as the service's flag type.
    pub fn connection_flags<F: ConnectionFlags>(&self) -> F {
        F::from_wire(self.state.load(Ordering::SeqCst))
    }

    /// Round-trip time of the most recent successful exchange.
    pub fn last_response_time(&self) -> Option<Duration> {
        *self
            .last_response_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Registers a transport state handler. It is invoked immediately with
    /// the current state, then on every change.
    pub fn set_state_change_handler<F>(&self, handler: F)
    where
        F: Fn(TransportState) + Send + Sync + 'static,
    {
        let handler: Handler<TransportState> = Arc::new(handler);
        self.lock_handlers().transport_state = Some(handler.clone());
        handler(self.transport_state());
    }

    pub fn set_connected_handler<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.lock_handlers().connected = Some(Arc::new(handler));
    }

    /// Called whenever a message from the server changes the state word.
    pub fn set_connection_state_handler<F>(&self, handler: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.lock_handlers().connection_state = Some(Arc::new(handler));
    }

    pub fn set_response_time_handler<F>(&self, handler: F)
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.lock_handlers().response_time = Some(Arc::new(handler));
    }

    /// Called with `true` when the first caller starts waiting and with
    /// `false` when the last one is done.
    pub fn set_busy_handler<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.session.set_busy_handler(handler);
    }

    async fn open(&self) -> Result<BoxedStream, CallerError> {
        let config = &self.options.config;
        let limit = config.socket_timeout;

        let tcp = timeout(limit, TcpStream::connect(self.options.address()))
            .await
            .map_err(|_| CallerError::TimedOut(limit))??;
        tcp.set_nodelay(true)?;

        let mut stream = timeout(limit, self.options.transport.connect(tcp))
            .await
            .map_err(|_| CallerError::TimedOut(limit))?
            .map_err(|err| CallerError::Handshake(err.to_string()))?;

        self.set_transport_state(TransportState::AwaitingInitialState);
        let initial = timeout(limit, read_message(&mut stream, config.max_message_size))
            .await
            .map_err(|_| CallerError::TimedOut(limit))??
            .ok_or(CallerError::ConnectionClosed)?;

        self.apply_state(initial.state);
        if let Some(reason) = initial.error_text() {
            if let Err(err) = stream.shutdown().await {
                tracing::debug!("Close after decline failed: {}", err);
            }
            return Err(CallerError::Declined(reason));
        }
        Ok(stream)
    }

    async fn round_trip(
        &self,
        stream: &mut BoxedStream,
        request: &Message,
    ) -> Result<Message, CallerError> {
        let config = &self.options.config;

        timeout(
            config.socket_timeout,
            write_message(stream, request, config.max_message_size),
        )
        .await
        .map_err(|_| CallerError::TimedOut(config.socket_timeout))??;

        let read = read_message(stream, config.max_message_size);
        let response = match config.response_timeout {
            Some(limit) => timeout(limit, read)
                .await
                .map_err(|_| CallerError::TimedOut(limit))??,
            None => read.await?,
        };
        response.ok_or(CallerError::ConnectionClosed)
    }

    fn apply_state(&self, state: u32) {
        if self.state.swap(state, Ordering::SeqCst) != state {
            let handler = self.lock_handlers().connection_state.clone();
            if let Some(handler) = handler {
                handler(state);
            }
        }
    }

    fn record_response_time(&self, elapsed: Duration) {
        *self
            .last_response_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(elapsed);
        let handler = self.lock_handlers().response_time.clone();
        if let Some(handler) = handler {
            handler(elapsed);
        }
    }

    fn set_connected(&self, connected: bool) {
        if self.connected.swap(connected, Ordering::SeqCst) != connected {
            let handler = self.lock_handlers().connected.clone();
            if let Some(handler) = handler {
                handler(connected);
            }
        }
    }

    fn set_transport_state(&self, next: TransportState) {
        let changed = {
            let mut current = self
                .transport_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let changed = *current != next;
            *current = next;
            changed
        };
        if changed {
            tracing::trace!("Transport state: {}", next);
            let handler = self.lock_handlers().transport_state.clone();
            if let Some(handler) = handler {
                handler(next);
            }
        }
    }

    fn mark_disconnected(&self) {
        self.set_connected(false);
        self.set_transport_state(TransportState::Disconnected);
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, Handlers> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MagicProxyClient {
    fn drop(&mut self) {
        self.mark_disconnected();
    }
}

/// Marks the client disconnected if an exchange is abandoned midway, e.g.
/// because the calling future was dropped.
struct InFlight<'a> {
    client: &'a MagicProxyClient,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Exchange abandoned; dropping the connection");
            self.client.mark_disconnected();
        }
    }
}

#[async_trait::async_trait]
impl ServiceCallerInterface for MagicProxyClient {
    fn contract(&self) -> &ServiceContract {
        &self.contract
    }

    fn serializer(&self) -> &SerializerConfig {
        &self.options.config.serializer
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }

    async fn exchange(&self, request: Vec<u8>) -> Result<ResponseEnvelope, CallerError> {
        let max = self.options.config.max_message_size;
        if request.len() > max {
            let err = MessageEncodeError::TooLarge {
                len: request.len(),
                max,
            };
            return Err(MessageIoError::from(err).into());
        }
        let request = Message::with_data(0, request);

        let mut admission = self.session.admit().await;
        // Taken out for the duration of the exchange; only a completed
        // exchange puts it back.
        let mut session = admission.take().ok_or(CallerError::NotConnected)?;

        self.set_transport_state(TransportState::InFlight);
        let mut in_flight = InFlight {
            client: self,
            settled: false,
        };

        let started = Instant::now();
        let result = self.round_trip(&mut session.stream, &request).await;
        in_flight.settled = true;

        match result {
            Ok(response) => {
                *admission = Some(session);
                self.apply_state(response.state);
                self.record_response_time(started.elapsed());
                self.set_transport_state(TransportState::Ready);
                Ok(ResponseEnvelope::from(response))
            }
            Err(err) => {
                tracing::warn!("Exchange failed, closing connection: {}", err);
                drop(session);
                self.mark_disconnected();
                Err(err)
            }
        }
    }
}
