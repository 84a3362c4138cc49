//! Configuration types

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tls::TlsServerConfig;

/// Root configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Listener and relay configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend to forward authorized sessions to
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Authorization callout configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and per-link relay configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Port to listen on
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Per-operation read timeout, applied to both links
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Timeout for the upstream connect at session start
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Reassembly chain cap in bytes; the in-flight message always completes
    #[serde(default = "default_max_chain")]
    pub max_chain_bytes: usize,

    /// Maximum number of concurrent sessions (0 = unlimited)
    #[serde(default)]
    pub max_connections: usize,

    /// TLS configuration for accepting client connections
    #[serde(default)]
    pub tls: TlsServerConfig,
}

impl ServerConfig {
    /// The per-operation read timeout as a Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// The upstream connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            read_timeout_secs: default_read_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_chain_bytes: default_max_chain(),
            max_connections: 0,
            tls: TlsServerConfig::default(),
        }
    }
}

/// Backend endpoint configuration
///
/// `address` doubles as a Unix-domain socket path: when it names an existing
/// filesystem path the session connects there, otherwise it is treated as a
/// hostname and paired with `port`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Socket path or hostname of the backend
    #[serde(default = "default_upstream_address")]
    pub address: String,

    /// TCP port, used only when `address` is not a filesystem path
    #[serde(default = "default_upstream_port")]
    pub port: u16,
}

impl UpstreamConfig {
    /// Whether the configured address selects a Unix-domain socket.
    pub fn is_unix_socket(&self) -> bool {
        Path::new(&self.address).exists()
    }

    /// The `host:port` form for a TCP connect.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_upstream_address(),
            port: default_upstream_port(),
        }
    }
}

impl std::fmt::Display for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unix_socket() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Authorization callout configuration
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// External decision program; unset means every session is admitted
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Upper bound on one invocation of the program; expiry is a denial
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

impl AuthConfig {
    /// The per-invocation timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            script: None,
            timeout_secs: default_auth_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    6000
}

fn default_read_timeout() -> u64 {
    3600
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_max_chain() -> usize {
    10_000_000
}

fn default_upstream_address() -> String {
    "/var/run/postgresql/.s.PGSQL.5432".to_string()
}

fn default_upstream_port() -> u16 {
    5432
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_address, "0.0.0.0");
        assert_eq!(config.server.listen_port, 6000);
        assert_eq!(config.server.read_timeout_secs, 3600);
        assert_eq!(config.server.max_chain_bytes, 10_000_000);
        assert_eq!(config.server.max_connections, 0);
        assert!(!config.server.tls.enabled());
        assert_eq!(config.upstream.address, "/var/run/postgresql/.s.PGSQL.5432");
        assert_eq!(config.upstream.port, 5432);
        assert!(config.auth.script.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_upstream_tcp_when_path_absent() {
        let upstream = UpstreamConfig {
            address: "db.internal".to_string(),
            port: 5432,
        };
        assert!(!upstream.is_unix_socket());
        assert_eq!(upstream.tcp_addr(), "db.internal:5432");
        assert_eq!(upstream.to_string(), "db.internal:5432");
    }

    #[test]
    fn test_upstream_unix_when_path_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sock");
        std::fs::File::create(&path).unwrap();

        let upstream = UpstreamConfig {
            address: path.to_string_lossy().to_string(),
            port: 5432,
        };
        assert!(upstream.is_unix_socket());
        assert_eq!(upstream.to_string(), path.to_string_lossy());
    }
}
