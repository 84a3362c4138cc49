//! TLS support for the client side of the proxy
//!
//! Clients may open their link with an SSLRequest; when a certificate bundle
//! is configured the proxy answers `'S'` and upgrades the client link before
//! the startup exchange continues. The backend link is never encrypted.
//!
//! Certificate and private key live together in one PEM bundle file, the way
//! PostgreSQL-side tooling commonly ships them. Uses rustls throughout;
//! TLS 1.2 minimum, TLS 1.3 preferred.

mod acceptor;
mod config;
mod error;

pub use acceptor::TlsAcceptor;
pub use config::TlsServerConfig;
pub use error::TlsError;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;

/// Load the certificate chain and private key from a single PEM bundle.
pub(crate) fn load_pem_bundle(
    path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
    let data = std::fs::read(path).map_err(|e| TlsError::bundle_load(path, e.to_string()))?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::bundle_load(path, e.to_string()))?;
    if certs.is_empty() {
        return Err(TlsError::bundle_load(path, "no certificates found in file"));
    }

    let key = rustls_pemfile::private_key(&mut data.as_slice())
        .map_err(|e| TlsError::key_load(path, e.to_string()))?
        .ok_or_else(|| TlsError::key_load(path, "no private key found in file"))?;

    Ok((certs, key))
}
