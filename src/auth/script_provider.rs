//! Script-exec authorizer.
//!
//! Invokes an external program with three positional arguments:
//! `client_ip user database`. Exit status 0 admits the session; any other
//! exit status denies it. The program is a shared external resource invoked
//! concurrently from many sessions; no assumption is made about its own
//! concurrency handling.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{ProxyError, Result};

use super::{AuthRequest, Authorizer};

/// Authorizer that shells out to an external decision program.
pub struct ScriptAuthorizer {
    /// Program to invoke
    program: PathBuf,
    /// Upper bound on one invocation; expiry is a denial
    timeout: Duration,
}

impl ScriptAuthorizer {
    /// Create a new ScriptAuthorizer.
    ///
    /// `program` is resolved like any command (PATH lookup applies when it
    /// is not an absolute path).
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Authorizer for ScriptAuthorizer {
    async fn authorize(&self, request: &AuthRequest) -> Result<bool> {
        let status = Command::new(&self.program)
            .arg(request.client_ip())
            .arg(&request.user)
            .arg(&request.database)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match timeout(self.timeout, status).await {
            Ok(Ok(status)) => {
                trace!(
                    "Authorizer {} exited with {} for user={} database={}",
                    self.program.display(),
                    status,
                    request.user,
                    request.database
                );
                Ok(status.success())
            }
            Ok(Err(e)) => Err(ProxyError::Auth(format!(
                "failed to run {}: {}",
                self.program.display(),
                e
            ))),
            Err(_) => {
                warn!(
                    "Authorizer {} did not finish within {:?}, denying",
                    self.program.display(),
                    self.timeout
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn request() -> AuthRequest {
        AuthRequest::new("127.0.0.1:5000".parse().unwrap(), "alice", "db1")
    }

    // Returns a closed TempPath: exec of a script with an open write handle
    // fails with ETXTBSY.
    fn script(contents: &str) -> tempfile::TempPath {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        let mut perms = file.as_file().metadata().unwrap().permissions();
        perms.set_mode(0o755);
        file.as_file().set_permissions(perms).unwrap();
        file.into_temp_path()
    }

    #[tokio::test]
    async fn test_zero_exit_authorizes() {
        let authorizer = ScriptAuthorizer::new("true", Duration::from_secs(5));
        assert!(authorizer.authorize(&request()).await.unwrap());
    }

    #[tokio::test]
    async fn test_nonzero_exit_denies() {
        let authorizer = ScriptAuthorizer::new("false", Duration::from_secs(5));
        assert!(!authorizer.authorize(&request()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let authorizer =
            ScriptAuthorizer::new("/nonexistent/auth-check", Duration::from_secs(5));
        let err = authorizer.authorize(&request()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Auth(_)));
    }

    #[tokio::test]
    async fn test_arguments_reach_the_program() {
        let path = script(
            "#!/bin/sh\ntest \"$1\" = \"127.0.0.1\" && test \"$2\" = \"alice\" && test \"$3\" = \"db1\"\n",
        );
        let authorizer = ScriptAuthorizer::new(path.to_path_buf(), Duration::from_secs(5));
        assert!(authorizer.authorize(&request()).await.unwrap());

        let other = AuthRequest::new("127.0.0.1:5000".parse().unwrap(), "mallory", "db1");
        assert!(!authorizer.authorize(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_hung_program_times_out_to_deny() {
        let path = script("#!/bin/sh\nsleep 60\n");
        let authorizer = ScriptAuthorizer::new(path.to_path_buf(), Duration::from_millis(100));
        assert!(!authorizer.authorize(&request()).await.unwrap());
    }
}
