//! Configuration loader

use std::path::Path;

use super::Config;
use crate::error::Result;

/// Load configuration from a YAML file.
///
/// Also applies PG_WARDEN_* env var overrides after loading.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a YAML string (useful for testing).
///
/// Also applies PG_WARDEN_* env var overrides after loading.
pub fn load_config_from_str(yaml: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(yaml)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Apply PG_WARDEN_* environment variable overrides to a config.
///
/// Any set env var overrides the corresponding config value:
/// - `PG_WARDEN_LISTEN_ADDRESS` - Override listen address
/// - `PG_WARDEN_LISTEN_PORT` - Override listen port
/// - `PG_WARDEN_UPSTREAM` - Override upstream address (path or hostname)
/// - `PG_WARDEN_UPSTREAM_PORT` - Override upstream TCP port
/// - `PG_WARDEN_AUTH_SCRIPT` - Override authorization program path
/// - `PG_WARDEN_LOG_LEVEL` - Override log level
/// - `PG_WARDEN_READ_TIMEOUT_SECS` - Override per-operation read timeout
/// - `PG_WARDEN_MAX_CHAIN_BYTES` - Override reassembly chain cap
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("PG_WARDEN_LISTEN_ADDRESS") {
        debug!("Overriding listen_address from PG_WARDEN_LISTEN_ADDRESS");
        config.server.listen_address = val;
    }
    if let Ok(val) = std::env::var("PG_WARDEN_LISTEN_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            debug!("Overriding listen_port from PG_WARDEN_LISTEN_PORT");
            config.server.listen_port = port;
        }
    }
    if let Ok(val) = std::env::var("PG_WARDEN_UPSTREAM") {
        debug!("Overriding upstream address from PG_WARDEN_UPSTREAM");
        config.upstream.address = val;
    }
    if let Ok(val) = std::env::var("PG_WARDEN_UPSTREAM_PORT") {
        if let Ok(port) = val.parse::<u16>() {
            debug!("Overriding upstream port from PG_WARDEN_UPSTREAM_PORT");
            config.upstream.port = port;
        }
    }
    if let Ok(val) = std::env::var("PG_WARDEN_AUTH_SCRIPT") {
        debug!("Overriding auth script from PG_WARDEN_AUTH_SCRIPT");
        config.auth.script = Some(val.into());
    }
    if let Ok(val) = std::env::var("PG_WARDEN_LOG_LEVEL") {
        debug!("Overriding log level from PG_WARDEN_LOG_LEVEL");
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var("PG_WARDEN_READ_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            debug!("Overriding read_timeout from PG_WARDEN_READ_TIMEOUT_SECS");
            config.server.read_timeout_secs = secs;
        }
    }
    if let Ok(val) = std::env::var("PG_WARDEN_MAX_CHAIN_BYTES") {
        if let Ok(bytes) = val.parse::<usize>() {
            debug!("Overriding max_chain from PG_WARDEN_MAX_CHAIN_BYTES");
            config.server.max_chain_bytes = bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env overrides are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_load_config_empty_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.upstream.address, "/var/run/postgresql/.s.PGSQL.5432");
        assert_eq!(config.server.read_timeout_secs, 3600);
    }

    #[test]
    fn test_load_config_full() {
        let _guard = ENV_LOCK.lock().unwrap();
        let yaml = r#"
server:
  listen_address: "127.0.0.1"
  listen_port: 6432
  read_timeout_secs: 120
  max_chain_bytes: 65536
  tls:
    pem_path: /etc/pg-warden/server.pem

upstream:
  address: db.internal
  port: 15432

auth:
  script: /usr/local/bin/check-session
  timeout_secs: 3

logging:
  level: debug
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.server.listen_address, "127.0.0.1");
        assert_eq!(config.server.listen_port, 6432);
        assert_eq!(config.server.read_timeout_secs, 120);
        assert_eq!(config.server.max_chain_bytes, 65536);
        assert!(config.server.tls.enabled());
        assert_eq!(config.upstream.address, "db.internal");
        assert_eq!(config.upstream.port, 15432);
        assert_eq!(
            config.auth.script.as_deref(),
            Some(std::path::Path::new("/usr/local/bin/check-session"))
        );
        assert_eq!(config.auth.timeout_secs, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_config_partial() {
        let _guard = ENV_LOCK.lock().unwrap();
        let yaml = r#"
upstream:
  address: localhost
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.upstream.address, "localhost");
        assert_eq!(config.upstream.port, 5432);
    }

    #[test]
    fn test_env_override_listen_port() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PG_WARDEN_LISTEN_PORT", "7001");
        let config = load_config_from_str("{}").unwrap();
        std::env::remove_var("PG_WARDEN_LISTEN_PORT");
        assert_eq!(config.server.listen_port, 7001);
    }

    #[test]
    fn test_env_override_auth_script() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PG_WARDEN_AUTH_SCRIPT", "/opt/warden/decide");
        let config = load_config_from_str("{}").unwrap();
        std::env::remove_var("PG_WARDEN_AUTH_SCRIPT");
        assert_eq!(
            config.auth.script.as_deref(),
            Some(std::path::Path::new("/opt/warden/decide"))
        );
    }

    #[test]
    fn test_env_override_ignores_garbage_numbers() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("PG_WARDEN_MAX_CHAIN_BYTES", "not-a-number");
        let config = load_config_from_str("{}").unwrap();
        std::env::remove_var("PG_WARDEN_MAX_CHAIN_BYTES");
        assert_eq!(config.server.max_chain_bytes, 10_000_000);
    }

    #[test]
    fn test_load_config_from_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        file.write_all(b"server:\n  listen_port: 6400\n").unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.listen_port, 6400);
    }
}
