//! Request context for authorization decisions.

use std::net::SocketAddr;

/// Identity tuple handed to an [`Authorizer`](crate::auth::Authorizer).
///
/// Built once per session from the client's peer address and the decoded
/// startup parameters.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Client's socket address (IP and port).
    pub client_address: SocketAddr,

    /// Role named in the startup parameters (`user`).
    pub user: String,

    /// Database named in the startup parameters.
    pub database: String,
}

impl AuthRequest {
    /// Create a new AuthRequest.
    pub fn new(
        client_address: SocketAddr,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            client_address,
            user: user.into(),
            database: database.into(),
        }
    }

    /// The client IP without the port, as passed to the decision procedure.
    pub fn client_ip(&self) -> String {
        self.client_address.ip().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_strips_port() {
        let request = AuthRequest::new("192.0.2.7:54321".parse().unwrap(), "alice", "db1");
        assert_eq!(request.client_ip(), "192.0.2.7");
    }

    #[test]
    fn test_client_ip_v6() {
        let request = AuthRequest::new("[::1]:54321".parse().unwrap(), "alice", "db1");
        assert_eq!(request.client_ip(), "::1");
    }
}
