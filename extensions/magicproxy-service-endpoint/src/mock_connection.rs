use crate::{ServiceEndpoint, ServiceEndpointInterface};
use magicproxy::message::{Message, MessageCodec, MessageIoError};
use magicproxy_service::{ResponseEnvelope, SerializerConfig, ServiceBackend, ServiceContract};
use magicproxy_service_caller::{CallerError, ServiceCallerInterface, SingleFlight};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Observes every exchange as `(request, error, response data)`.
pub type WireSniffer = Arc<dyn Fn(&[u8], Option<&str>, &[u8]) + Send + Sync>;

/// An in-process connection: calls go straight to an endpoint and a service
/// object, without sockets, but with the same admission, authorization and
/// encoding rules as a network client.
pub struct MockConnection<S>
where
    S: ServiceBackend,
{
    endpoint: Arc<ServiceEndpoint<S>>,
    service: Arc<S>,
    flight: SingleFlight<()>,
    connected: AtomicBool,
    state: AtomicU32,
    request_delay: Option<Duration>,
    sniffer: Option<WireSniffer>,
}

impl<S> MockConnection<S>
where
    S: ServiceBackend,
{
    pub fn new(endpoint: Arc<ServiceEndpoint<S>>, service: Arc<S>) -> Self {
        Self {
            endpoint,
            service,
            flight: SingleFlight::new(()),
            connected: AtomicBool::new(false),
            state: AtomicU32::new(0),
            request_delay: None,
            sniffer: None,
        }
    }

    /// Delays every request before it is dispatched, to simulate latency.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    pub fn with_wire_sniffer<F>(mut self, sniffer: F) -> Self
    where
        F: Fn(&[u8], Option<&str>, &[u8]) + Send + Sync + 'static,
    {
        self.sniffer = Some(Arc::new(sniffer));
        self
    }

    /// Runs the service's approval hook and adopts its initial state.
    pub async fn connect(&self) -> Result<(), CallerError> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let declined = self.service.approve_connection().await;
        self.state
            .store(self.service.connection_state(), Ordering::SeqCst);

        match declined {
            Some(reason) => Err(CallerError::Declined(reason)),
            None => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    pub fn set_busy_handler<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.flight.set_busy_handler(handler);
    }

    fn check_size(&self, message: &Message) -> Result<(), CallerError> {
        MessageCodec::encode(message, self.endpoint.config().max_message_size)
            .map(|_| ())
            .map_err(|err| CallerError::Message(MessageIoError::Encode(err)))
    }
}

#[async_trait::async_trait]
impl<S> ServiceCallerInterface for MockConnection<S>
where
    S: ServiceBackend,
{
    fn contract(&self) -> &ServiceContract {
        self.endpoint.contract()
    }

    fn serializer(&self) -> &SerializerConfig {
        &self.endpoint.config().serializer
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }

    async fn exchange(&self, request: Vec<u8>) -> Result<ResponseEnvelope, CallerError> {
        let _admission = self.flight.admit().await;
        if !self.is_connected() {
            return Err(CallerError::NotConnected);
        }

        let request = Message::with_data(0, request);
        self.check_size(&request)?;

        if let Some(delay) = self.request_delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .endpoint
            .handle_request(&self.service, &request.data)
            .await;
        let response = outcome.into_message(self.service.connection_state());
        self.check_size(&response)?;

        if let Some(sniffer) = &self.sniffer {
            sniffer(
                &request.data,
                response.error_text().as_deref(),
                &response.data,
            );
        }

        self.state.store(response.state, Ordering::SeqCst);
        Ok(ResponseEnvelope::from(response))
    }
}
