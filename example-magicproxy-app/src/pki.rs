//! An in-memory certificate authority, so the demo runs mutual TLS
//! without any files on disk.

use magicproxy_tls::{
    ClientTlsSettings, ClientTransport, PrivateKeyDer, PrivatePkcs8KeyDer, ServerIdentity,
    ServerTlsSettings, ServerTransport,
};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};

pub const SERVER_NAME: &str = "localhost";

pub struct DemoPki {
    cert: Certificate,
    key: KeyPair,
}

impl DemoPki {
    pub fn new() -> anyhow::Result<Self> {
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params
            .distinguished_name
            .push(DnType::CommonName, "MagicProxy Demo CA");
        let key = KeyPair::generate()?;
        let cert = params.self_signed(&key)?;
        Ok(Self { cert, key })
    }

    fn issue(
        &self,
        name: &str,
        purpose: ExtendedKeyUsagePurpose,
    ) -> anyhow::Result<(Certificate, PrivateKeyDer<'static>)> {
        let mut params = CertificateParams::new(vec![name.to_string()])?;
        params.extended_key_usages = vec![purpose];
        let key = KeyPair::generate()?;
        let cert = params.signed_by(&key, &self.cert, &self.key)?;
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
        Ok((cert, key))
    }

    pub fn server_transport(&self) -> anyhow::Result<ServerTransport> {
        let (cert, key) = self.issue(SERVER_NAME, ExtendedKeyUsagePurpose::ServerAuth)?;
        let identity = ServerIdentity::new(vec![cert.der().clone()], key, [SERVER_NAME]);
        Ok(ServerTlsSettings::new()
            .with_identity(identity)
            .with_client_ca(self.cert.der().clone())
            .build()?)
    }

    pub fn client_transport(&self, client_name: &str) -> anyhow::Result<ClientTransport> {
        let (cert, key) = self.issue(client_name, ExtendedKeyUsagePurpose::ClientAuth)?;
        Ok(ClientTlsSettings::new(SERVER_NAME)
            .with_server_ca(self.cert.der().clone())
            .with_identity(vec![cert.der().clone()], key)
            .build()?)
    }
}
