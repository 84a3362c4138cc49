//! Configuration module for pg-warden
//!
//! Every knob has a default, so the proxy runs with no config file at all:
//! listen on `0.0.0.0:6000`, forward to the local PostgreSQL socket, admit
//! every session.
//!
//! ```yaml
//! server:
//!   listen_address: "0.0.0.0"
//!   listen_port: 6000
//!   read_timeout_secs: 3600
//!   max_chain_bytes: 10000000
//!   tls:
//!     pem_path: "/etc/pg-warden/server.pem"
//! upstream:
//!   address: "db.internal"
//!   port: 5432
//! auth:
//!   script: "/usr/local/bin/check-session"
//! logging:
//!   level: "debug"
//! ```

mod loader;
mod types;

pub use loader::{apply_env_overrides, load_config, load_config_from_str};
pub use types::*;
