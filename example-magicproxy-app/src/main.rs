mod pki;

use example_magicproxy_service_definition::{
    BackendFlags, BackendProxy, ExampleBackend, Person, backend_contract, backend_types,
    register_backend,
};
use magicproxy_service::RuntimeConfig;
use magicproxy_tokio_client::{ClientOptions, MagicProxyClient};
use magicproxy_tokio_server::utils::{bind_tcp_listener_on_random_port, tcp_listener_to_host_port};
use magicproxy_tokio_server::{MagicProxyServer, ServiceEndpoint};
use pki::DemoPki;
use std::sync::Arc;
use tokio::join;
use tracing_subscriber::EnvFilter;

const CLIENT_VERSION: i32 = 77;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pki = DemoPki::new()?;
    let config = Arc::new(RuntimeConfig::default().with_type_source(Arc::new(backend_types())));

    // Server
    let endpoint = ServiceEndpoint::new(backend_contract()?, config.clone());
    register_backend(&endpoint).await?;
    let server = MagicProxyServer::new(Arc::new(endpoint), pki.server_transport()?, |info| {
        Arc::new(ExampleBackend::new(info))
    });
    let (listener, _) = bind_tcp_listener_on_random_port().await?;
    let (host, port) = tcp_listener_to_host_port(&listener)?;
    let handle = Arc::new(server).spawn_with_listener(listener)?;

    // Client
    let options = ClientOptions::new(host.to_string(), port)
        .with_transport(pki.client_transport("demo-client")?)
        .with_config(config);
    let client = Arc::new(MagicProxyClient::new(options, backend_contract()?));
    client.set_state_change_handler(|state| tracing::info!("Transport state: {}", state));
    client.set_busy_handler(|busy| tracing::debug!("Busy: {}", busy));
    client.connect().await?;

    let proxy = BackendProxy::new(client.clone());

    if proxy.client_update_required(CLIENT_VERSION).await? {
        anyhow::bail!("client version {CLIENT_VERSION} is not supported");
    }
    if !proxy.authenticate("foo", "bar").await? {
        anyhow::bail!("login rejected");
    }
    tracing::info!(
        "Logged in: {:?}",
        client.connection_flags::<BackendFlags>()
    );

    // Concurrent calls are serialized on the one connection.
    let (a, b, c) = join!(proxy.foo(1), proxy.foo(2), proxy.foo(3));
    println!("foo results: {:?} {:?} {:?}", a?, b?, c?);

    match proxy.simple_throws().await {
        Ok(()) => println!("simple_throws unexpectedly succeeded"),
        Err(err) => println!("simple_throws failed remotely: {}", err),
    }

    let raw = proxy.get_raw(1024).await?;
    println!(
        "get_raw: {} bytes, first {:?}, last {:?}",
        raw.len(),
        raw.first(),
        raw.last()
    );

    let person: Person = proxy.get_from_db(1).await?;
    println!("get_from_db::<Person>: {:?}", person);
    println!("nested::<String>: {:?}", proxy.nested::<String>().await?);

    if let Some(rtt) = client.last_response_time() {
        println!("last round trip: {:?}", rtt);
    }

    proxy.logout().await?;
    client.disconnect().await;
    handle.stop().await?;
    Ok(())
}
