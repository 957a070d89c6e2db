mod client;
pub use client::*;

mod error;
pub use error::TlsSetupError;

mod server;
pub use server::*;

mod stream;
pub use stream::*;

mod verifier;

pub use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
