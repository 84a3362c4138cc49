//! TLS configuration types

use serde::Deserialize;
use std::path::PathBuf;

/// Server-side TLS configuration (proxy accepting client connections)
///
/// TLS is offered when `pem_path` points at a PEM bundle containing the
/// server certificate chain and its private key in one file. When unset,
/// SSLRequest is answered with `'N'` and the session continues in cleartext.
///
/// # Example YAML
/// ```yaml
/// server:
///   tls:
///     pem_path: "/etc/pg-warden/server.pem"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TlsServerConfig {
    /// Path to the PEM bundle (certificate chain + private key)
    #[serde(default)]
    pub pem_path: Option<PathBuf>,
}

impl TlsServerConfig {
    /// Whether TLS material is configured.
    pub fn enabled(&self) -> bool {
        self.pem_path.is_some()
    }
}
