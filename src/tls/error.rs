//! TLS-specific error types

use std::path::PathBuf;
use thiserror::Error;

/// TLS-specific errors
///
/// These capture the failure modes of certificate loading and the client
/// handshake, with enough context to debug a bad deployment.
#[derive(Error, Debug)]
pub enum TlsError {
    /// Failed to load the certificate bundle
    #[error("Failed to load certificate bundle from {path}: {reason}")]
    BundleLoad {
        /// Path to the PEM bundle
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// Failed to load the private key from the bundle
    #[error("Failed to load private key from {path}: {reason}")]
    PrivateKeyLoad {
        /// Path to the PEM bundle
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    Config(String),

    /// I/O error during TLS operation
    #[error("TLS I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TlsError {
    /// Create a bundle load error
    pub fn bundle_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TlsError::BundleLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a private key load error
    pub fn key_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TlsError::PrivateKeyLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a handshake error
    pub fn handshake(reason: impl Into<String>) -> Self {
        TlsError::Handshake(reason.into())
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        TlsError::Config(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_load_error_display() {
        let err = TlsError::bundle_load("/path/to/server.pem", "file not found");
        let msg = err.to_string();
        assert!(msg.contains("/path/to/server.pem"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_key_load_error_display() {
        let err = TlsError::key_load("/path/to/server.pem", "no private key found in file");
        assert!(err.to_string().contains("no private key"));
    }

    #[test]
    fn test_handshake_error_display() {
        let err = TlsError::handshake("client disconnected");
        assert_eq!(err.to_string(), "TLS handshake failed: client disconnected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let tls_err: TlsError = io_err.into();
        assert!(tls_err.to_string().contains("file not found"));
    }
}
