//! pg-warden - authorizing interception proxy for PostgreSQL
//!
//! This library provides the core functionality for a proxy that:
//! - Speaks the PostgreSQL 3.0 startup exchange on behalf of the backend
//! - Gates every session on an external authorization decision
//! - Optionally upgrades the client link to TLS before startup completes
//! - Relays all post-startup traffic byte-for-byte as reassembled message
//!   chains, in both directions

#[macro_use]
mod logging;

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tls;

pub use auth::{AuthRequest, Authorizer, ScriptAuthorizer, StaticAuthorizer};
pub use config::Config;
pub use error::{ProxyError, Result};
pub use server::{Listener, ListenerStats, NetworkStream, Session};
pub use tls::{TlsAcceptor, TlsError, TlsServerConfig};
