//! TLS acceptor for upgrading client links
//!
//! Wraps `tokio_rustls::TlsAcceptor` with PEM bundle loading. The acceptor
//! is built per session from the configured bundle path and consumed when
//! the client sends an SSLRequest.

use std::sync::Arc;

use rustls::ServerConfig;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

use crate::tls::{load_pem_bundle, TlsError, TlsServerConfig};

/// TLS acceptor for upgrading TCP connections to TLS
///
/// # Example
///
/// ```ignore
/// let config = TlsServerConfig {
///     pem_path: Some("/etc/pg-warden/server.pem".into()),
/// };
/// let acceptor = TlsAcceptor::new(&config)?;
/// let tls_stream = acceptor.accept(tcp_stream).await?;
/// ```
#[derive(Clone)]
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl TlsAcceptor {
    /// Create a new TLS acceptor from configuration.
    ///
    /// Loads the certificate chain and private key from the configured PEM
    /// bundle. No client certificates are requested.
    pub fn new(config: &TlsServerConfig) -> Result<Self, TlsError> {
        let pem_path = config
            .pem_path
            .as_ref()
            .ok_or_else(|| TlsError::config("pem_path is required"))?;

        let (certs, key) = load_pem_bundle(pem_path)?;

        let provider = rustls::crypto::ring::default_provider();
        let server_config = ServerConfig::builder_with_provider(Arc::new(provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::config(format!("Failed to set protocol versions: {}", e)))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TlsError::config(format!("Failed to build TLS config: {}", e)))?;

        Ok(Self {
            inner: tokio_rustls::TlsAcceptor::from(Arc::new(server_config)),
        })
    }

    /// Upgrade a TCP stream to TLS by running the server-side handshake.
    pub async fn accept(&self, stream: TcpStream) -> Result<TlsStream<TcpStream>, TlsError> {
        self.inner
            .accept(stream)
            .await
            .map_err(|e| TlsError::handshake(e.to_string()))
    }
}
