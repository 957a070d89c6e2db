use bitflags::bitflags;
use magicproxy_service::{
    MethodDescriptor, ReturnShape, RuntimeConfig, ServiceBackend, ServiceContract,
    ServiceDescriptor,
};
use magicproxy_service_endpoint::{ServiceEndpoint, ServiceEndpointInterface, invoker};
use magicproxy_tls::ServerTransport;
use magicproxy_tokio_client::{ClientOptions, MagicProxyClient};
use magicproxy_tokio_server::utils::bind_tcp_listener_on_random_port;
use magicproxy_tokio_server::{MagicProxyServer, ServerHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PacerFlags: u32 {
        const TOGGLED = 1;
    }
}

/// How many `step` calls the server ran, and the most it ever ran at once.
#[derive(Default)]
pub struct Overlap {
    running: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

/// A service whose only method takes a while and may flip a flag.
pub struct Pacer {
    state: AtomicU32,
    overlap: Arc<Overlap>,
}

#[async_trait::async_trait]
impl ServiceBackend for Pacer {
    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }
}

pub fn pacer_contract() -> Arc<ServiceContract> {
    let descriptor = ServiceDescriptor::new("Pacer")
        .with_flags::<PacerFlags>()
        .default_required(PacerFlags::empty())
        .method(
            MethodDescriptor::new("step")
                .param::<bool>("flip")
                .returns(ReturnShape::future::<u32>()),
        );
    Arc::new(ServiceContract::build(descriptor).unwrap())
}

/// Serves [`Pacer`] in plaintext; every connection reports into one [`Overlap`].
pub async fn start_pacer() -> (ServerHandle, Arc<Overlap>) {
    let endpoint = ServiceEndpoint::new(pacer_contract(), Arc::new(RuntimeConfig::default()));
    endpoint
        .register(
            "step",
            invoker(|svc: Arc<Pacer>, (flip,): (bool,)| async move {
                let overlap = &svc.overlap;
                let running = overlap.running.fetch_add(1, Ordering::SeqCst) + 1;
                overlap.peak.fetch_max(running, Ordering::SeqCst);
                overlap.calls.fetch_add(1, Ordering::SeqCst);

                tokio::time::sleep(Duration::from_millis(5)).await;
                if flip {
                    svc.state
                        .fetch_xor(PacerFlags::TOGGLED.bits(), Ordering::SeqCst);
                }

                overlap.running.fetch_sub(1, Ordering::SeqCst);
                anyhow::Ok(svc.state.load(Ordering::SeqCst))
            }),
        )
        .await
        .unwrap();

    let overlap = Arc::new(Overlap::default());
    let shared = overlap.clone();
    let server = MagicProxyServer::new(
        Arc::new(endpoint),
        ServerTransport::Plaintext,
        move |_info| {
            Arc::new(Pacer {
                state: AtomicU32::new(0),
                overlap: shared.clone(),
            })
        },
    );

    let (listener, _port) = bind_tcp_listener_on_random_port().await.unwrap();
    let handle = Arc::new(server).spawn_with_listener(listener).unwrap();
    (handle, overlap)
}

pub fn pacer_client(handle: &ServerHandle) -> Arc<MagicProxyClient> {
    let addr = handle.local_addr();
    let options = ClientOptions::new(addr.ip().to_string(), addr.port());
    Arc::new(MagicProxyClient::new(options, pacer_contract()))
}
