#![allow(dead_code)]

pub mod pacer;

use example_magicproxy_service_definition::{
    BackendProxy, ExampleBackend, backend_contract, backend_types, register_backend,
};
use magicproxy_service::{ConnectionInfo, RuntimeConfig};
use magicproxy_tls::{
    CertificateDer, ClientTlsSettings, ClientTransport, PrivateKeyDer, PrivatePkcs8KeyDer,
    ServerIdentity, ServerTlsSettings, ServerTransport,
};
use magicproxy_tokio_client::{ClientOptions, MagicProxyClient};
use magicproxy_tokio_server::utils::bind_tcp_listener_on_random_port;
use magicproxy_tokio_server::{MagicProxyServer, ServerHandle, ServiceEndpoint};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use std::sync::{Arc, Mutex};

pub const SERVER_NAME: &str = "backend.test";

/// A throwaway CA issuing one server and any number of client certificates.
pub struct Pki {
    cert: Certificate,
    key: KeyPair,
}

pub struct Issued {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl Pki {
    pub fn new() -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        params.distinguished_name.push(DnType::CommonName, "Test CA");
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn ca(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    fn issue(&self, name: &str, purpose: ExtendedKeyUsagePurpose) -> Issued {
        let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
        params.extended_key_usages = vec![purpose];
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        Issued {
            chain: vec![cert.der().clone()],
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        }
    }

    pub fn server_transport(&self) -> ServerTransport {
        let issued = self.issue(SERVER_NAME, ExtendedKeyUsagePurpose::ServerAuth);
        ServerTlsSettings::new()
            .with_identity(ServerIdentity::new(issued.chain, issued.key, [SERVER_NAME]))
            .with_client_ca(self.ca())
            .build()
            .unwrap()
    }

    /// A client that presents a certificate issued by this CA.
    pub fn client_transport(&self, client_name: &str) -> ClientTransport {
        let issued = self.issue(client_name, ExtendedKeyUsagePurpose::ClientAuth);
        ClientTlsSettings::new(SERVER_NAME)
            .with_server_ca(self.ca())
            .with_identity(issued.chain, issued.key)
            .build()
            .unwrap()
    }

    /// A client that verifies the server but presents no certificate.
    pub fn anonymous_transport(&self) -> ClientTransport {
        ClientTlsSettings::new(SERVER_NAME)
            .with_server_ca(self.ca())
            .build()
            .unwrap()
    }
}

pub fn config() -> RuntimeConfig {
    RuntimeConfig::default().with_type_source(Arc::new(backend_types()))
}

/// Serves the example backend. Every connection's [`ConnectionInfo`] is
/// recorded in the returned list.
pub async fn start_server(
    transport: ServerTransport,
) -> (ServerHandle, Arc<Mutex<Vec<ConnectionInfo>>>) {
    let endpoint = ServiceEndpoint::new(backend_contract().unwrap(), Arc::new(config()));
    register_backend(&endpoint).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let factory_seen = seen.clone();
    let server = MagicProxyServer::new(Arc::new(endpoint), transport, move |info| {
        factory_seen.lock().unwrap().push(info.clone());
        Arc::new(ExampleBackend::new(info))
    });

    let (listener, _port) = bind_tcp_listener_on_random_port().await.unwrap();
    let handle = Arc::new(server).spawn_with_listener(listener).unwrap();
    (handle, seen)
}

pub fn client(handle: &ServerHandle, transport: ClientTransport) -> Arc<MagicProxyClient> {
    let addr = handle.local_addr();
    let options = ClientOptions::new(addr.ip().to_string(), addr.port())
        .with_transport(transport)
        .with_config(Arc::new(config()));
    Arc::new(MagicProxyClient::new(options, backend_contract().unwrap()))
}

/// Connects, passes the version check and logs in.
pub async fn logged_in(client: Arc<MagicProxyClient>) -> BackendProxy<MagicProxyClient> {
    client.connect().await.unwrap();
    let proxy = BackendProxy::new(client);
    assert!(!proxy.client_update_required(77).await.unwrap());
    assert!(proxy.authenticate("foo", "bar").await.unwrap());
    proxy
}
