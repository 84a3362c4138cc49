//! Static authorizer.
//!
//! Admits or denies every session unconditionally. The allow-all form is
//! what the proxy runs with when no authorization script is configured.

use async_trait::async_trait;

use crate::error::Result;

use super::{AuthRequest, Authorizer};

/// Authorizer with a fixed answer.
pub struct StaticAuthorizer {
    allow: bool,
}

impl StaticAuthorizer {
    /// Admit every session.
    pub fn allow_all() -> Self {
        Self { allow: true }
    }

    /// Deny every session.
    pub fn deny_all() -> Self {
        Self { allow: false }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, _request: &AuthRequest) -> Result<bool> {
        Ok(self.allow)
    }
}
