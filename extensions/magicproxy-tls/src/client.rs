use crate::{BoxedStream, TlsSetupError};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

/// Client-side certificate configuration.
///
/// Without a server CA the client connects in plaintext.
#[derive(Debug)]
pub struct ClientTlsSettings {
    server_ca: Vec<CertificateDer<'static>>,
    identity: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
    server_name: String,
}

impl ClientTlsSettings {
    /// `server_name` is sent as SNI and checked against the server
    /// certificate.
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_ca: Vec::new(),
            identity: None,
            server_name: server_name.into(),
        }
    }

    pub fn with_server_ca(mut self, ca: CertificateDer<'static>) -> Self {
        self.server_ca.push(ca);
        self
    }

    /// The certificate presented for mutual authentication.
    pub fn with_identity(
        mut self,
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        self.identity = Some((cert_chain, key));
        self
    }

    pub fn build(self) -> Result<ClientTransport, TlsSetupError> {
        if self.server_ca.is_empty() {
            return Ok(ClientTransport::Plaintext);
        }

        let server_name = ServerName::try_from(self.server_name.clone())
            .map_err(|_| TlsSetupError::InvalidServerName(self.server_name))?;

        let mut roots = RootCertStore::empty();
        for ca in self.server_ca {
            roots.add(ca)?;
        }

        let builder = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots);
        let config = match self.identity {
            Some((cert_chain, key)) => builder.with_client_auth_cert(cert_chain, key)?,
            None => builder.with_no_client_auth(),
        };

        Ok(ClientTransport::Tls {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }
}

/// How connected sockets are turned into streams.
#[derive(Clone)]
pub enum ClientTransport {
    Plaintext,
    Tls {
        connector: TlsConnector,
        server_name: ServerName<'static>,
    },
}

impl ClientTransport {
    pub fn is_tls(&self) -> bool {
        matches!(self, ClientTransport::Tls { .. })
    }

    /// Runs the client side of the handshake.
    pub async fn connect(&self, tcp: TcpStream) -> io::Result<BoxedStream> {
        match self {
            ClientTransport::Plaintext => Ok(Box::new(tcp)),
            ClientTransport::Tls {
                connector,
                server_name,
            } => {
                let stream = connector.connect(server_name.clone(), tcp).await?;
                tracing::debug!("TLS handshake completed with {:?}", server_name);
                Ok(Box::new(stream))
            }
        }
    }
}
