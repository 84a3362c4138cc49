//! Authorizer trait definition.

use async_trait::async_trait;

use crate::error::Result;

use super::AuthRequest;

/// Trait for pluggable session authorizers.
///
/// Called exactly once per session, after the StartupMessage has been
/// decoded and before any of its bytes are forwarded. The trait is
/// object-safe so `Arc<dyn Authorizer>` can be shared across sessions; the
/// decision procedure may be invoked concurrently from many of them.
///
/// `Ok(true)` admits the session, `Ok(false)` denies it. An `Err` is an
/// operational failure of the authorizer itself; callers treat it as a
/// denial.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Decide whether the session described by `request` may proceed.
    async fn authorize(&self, request: &AuthRequest) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockAuthorizer;

    #[async_trait]
    impl Authorizer for MockAuthorizer {
        async fn authorize(&self, _request: &AuthRequest) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_trait_is_object_safe() {
        let _boxed: Box<dyn Authorizer> = Box::new(MockAuthorizer);
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockAuthorizer>();
    }

    #[tokio::test]
    async fn test_mock_authorizer() {
        let authorizer = MockAuthorizer;
        let request = AuthRequest::new("127.0.0.1:12345".parse().unwrap(), "alice", "db1");
        assert!(authorizer.authorize(&request).await.unwrap());
    }
}
