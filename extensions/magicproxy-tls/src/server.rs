use crate::verifier::AcceptAnyClientCert;
use crate::{BoxedStream, TlsSetupError};
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::{ClientHello, ResolvesServerCert, WebPkiClientVerifier};
use rustls::sign::CertifiedKey;
use rustls::{RootCertStore, ServerConfig};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

/// A server certificate chain, its private key and the DNS names it is
/// presented for.
#[derive(Debug)]
pub struct ServerIdentity {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub dns_names: Vec<String>,
}

impl ServerIdentity {
    pub fn new(
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        dns_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            cert_chain,
            key,
            dns_names: dns_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Picks the server certificate by the SNI name the client asked for.
///
/// Lookup ignores ASCII case. A client that sends no name, or a name no
/// identity claims, gets the first identity.
#[derive(Debug)]
pub struct SniCertResolver {
    by_name: HashMap<String, Arc<CertifiedKey>>,
    fallback: Arc<CertifiedKey>,
}

impl SniCertResolver {
    pub fn new(
        identities: Vec<ServerIdentity>,
        provider: &CryptoProvider,
    ) -> Result<Self, TlsSetupError> {
        let mut by_name = HashMap::new();
        let mut fallback = None;

        for (index, identity) in identities.into_iter().enumerate() {
            if identity.dns_names.is_empty() {
                return Err(TlsSetupError::NoDnsName(index));
            }
            if identity.cert_chain.is_empty() {
                return Err(TlsSetupError::EmptyChain(index));
            }

            let key = provider.key_provider.load_private_key(identity.key)?;
            let certified = Arc::new(CertifiedKey::new(identity.cert_chain, key));

            for name in identity.dns_names {
                let name = name.to_ascii_lowercase();
                if by_name.insert(name.clone(), certified.clone()).is_some() {
                    return Err(TlsSetupError::DuplicateDnsName(name));
                }
            }
            fallback.get_or_insert(certified);
        }

        Ok(Self {
            by_name,
            fallback: fallback.ok_or(TlsSetupError::NoIdentity)?,
        })
    }

    pub fn select(&self, server_name: Option<&str>) -> Arc<CertifiedKey> {
        server_name
            .and_then(|name| self.by_name.get(&name.to_ascii_lowercase()))
            .unwrap_or(&self.fallback)
            .clone()
    }
}

impl ResolvesServerCert for SniCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        Some(self.select(client_hello.server_name()))
    }
}

/// Server-side certificate configuration.
///
/// Without identities the server runs in plaintext. With identities it always
/// asks the client for a certificate but never requires one; a presented
/// chain is verified against the client CA when one is configured, and
/// accepted as-is otherwise.
#[derive(Debug, Default)]
pub struct ServerTlsSettings {
    identities: Vec<ServerIdentity>,
    client_ca: Vec<CertificateDer<'static>>,
}

impl ServerTlsSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: ServerIdentity) -> Self {
        self.identities.push(identity);
        self
    }

    pub fn with_client_ca(mut self, ca: CertificateDer<'static>) -> Self {
        self.client_ca.push(ca);
        self
    }

    pub fn build(self) -> Result<ServerTransport, TlsSetupError> {
        if self.identities.is_empty() {
            return Ok(ServerTransport::Plaintext);
        }

        let provider = Arc::new(ring::default_provider());
        let resolver = SniCertResolver::new(self.identities, &provider)?;

        let verifier: Arc<dyn ClientCertVerifier> = if self.client_ca.is_empty() {
            AcceptAnyClientCert::new(provider.clone())
        } else {
            let mut roots = RootCertStore::empty();
            for ca in self.client_ca {
                roots.add(ca)?;
            }
            WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                .allow_unauthenticated()
                .build()?
        };

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_client_cert_verifier(verifier)
            .with_cert_resolver(Arc::new(resolver));

        Ok(ServerTransport::Tls(TlsAcceptor::from(Arc::new(config))))
    }
}

/// How accepted sockets are turned into streams.
#[derive(Clone)]
pub enum ServerTransport {
    Plaintext,
    Tls(TlsAcceptor),
}

impl ServerTransport {
    pub fn is_tls(&self) -> bool {
        matches!(self, ServerTransport::Tls(_))
    }

    /// Runs the server side of the handshake. Returns the stream and the
    /// DER-encoded certificate chain the client presented (empty if none).
    pub async fn accept(&self, tcp: TcpStream) -> io::Result<(BoxedStream, Vec<Vec<u8>>)> {
        match self {
            ServerTransport::Plaintext => Ok((Box::new(tcp), Vec::new())),
            ServerTransport::Tls(acceptor) => {
                let stream = acceptor.accept(tcp).await?;
                let peer_certificates: Vec<Vec<u8>> = stream
                    .get_ref()
                    .1
                    .peer_certificates()
                    .map(|chain| chain.iter().map(|cert| cert.to_vec()).collect())
                    .unwrap_or_default();
                tracing::debug!(
                    "TLS handshake accepted: client certificates={}",
                    peer_certificates.len()
                );
                Ok((Box::new(stream), peer_certificates))
            }
        }
    }
}
