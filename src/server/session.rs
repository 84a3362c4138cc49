//! Per-session lifecycle
//!
//! A session owns one client link and one backend link. The backend link is
//! opened on accept; the startup state machine then runs on the client side
//! and ends in one of three ways: the startup bytes were forwarded and the
//! two relay halves take over, a fatal frame was sent and the session tears
//! down, or a cancel request was passed through and the backend closes the
//! link itself. Both links are closed together, exactly once, on every path.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::auth::{AuthRequest, Authorizer};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::protocol::startup::{
    build_fatal_frame, decode_startup_frame, read_startup_frame, StartupFrame,
    AUTH_FAILED_MESSAGE, UNKNOWN_STARTUP_MESSAGE,
};
use crate::tls::TlsAcceptor;

use super::relay::relay_half;
use super::stream::NetworkStream;

/// Where the startup state machine left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartupOutcome {
    /// StartupMessage forwarded verbatim; the relay halves may start
    Authorized,
    /// Fatal frame sent (or the client left); tear down without relaying
    Denied,
    /// CancelRequest forwarded verbatim; the backend closes the link itself
    Cancelled,
}

/// One proxied session.
pub struct Session {
    /// Client link (Option for safe taking during TLS upgrade and relay)
    client: Option<NetworkStream>,
    /// Client address
    peer_addr: SocketAddr,
    /// Configuration
    config: Arc<Config>,
    /// Authorization decision procedure
    authorizer: Arc<dyn Authorizer>,
    /// TLS acceptor, consumed by the first SSLRequest
    tls_acceptor: Option<TlsAcceptor>,
    /// Session identifier for log correlation
    session_id: String,
}

impl Session {
    /// Create a new session for an accepted client connection.
    pub fn new(
        client: TcpStream,
        peer_addr: SocketAddr,
        config: Arc<Config>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<Self> {
        let tls_acceptor = if config.server.tls.enabled() {
            Some(TlsAcceptor::new(&config.server.tls)?)
        } else {
            None
        };

        Ok(Self {
            client: Some(NetworkStream::Tcp(client)),
            peer_addr,
            config,
            authorizer,
            tls_acceptor,
            session_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    fn client_mut(&mut self) -> Result<&mut NetworkStream> {
        self.client
            .as_mut()
            .ok_or_else(|| ProxyError::Connection("client stream not available".into()))
    }

    fn take_client(&mut self) -> Result<NetworkStream> {
        self.client
            .take()
            .ok_or_else(|| ProxyError::Connection("client stream not available".into()))
    }

    /// Run the session to completion.
    pub async fn handle(mut self) -> Result<()> {
        let mut backend = self.connect_upstream().await?;

        let outcome = self.run_startup(&mut backend).await?;
        debug!(
            session_id = %self.session_id,
            peer = %self.peer_addr,
            outcome = ?outcome,
            "Startup phase complete"
        );

        match outcome {
            StartupOutcome::Authorized => self.relay(backend).await,
            StartupOutcome::Denied | StartupOutcome::Cancelled => Ok(()),
        }
    }

    /// Open the backend link: a Unix-domain socket when the configured
    /// upstream is an existing filesystem path, TCP otherwise.
    async fn connect_upstream(&self) -> Result<NetworkStream> {
        let upstream = &self.config.upstream;
        let connect_timeout = self.config.server.connect_timeout();

        #[cfg(unix)]
        if upstream.is_unix_socket() {
            trace!("Connecting to upstream socket {}", upstream.address);
            let stream = timeout(connect_timeout, UnixStream::connect(&upstream.address))
                .await
                .map_err(|_| ProxyError::Timeout(format!("connecting to {}", upstream.address)))?
                .map_err(|e| {
                    ProxyError::Connection(format!(
                        "failed to connect to {}: {}",
                        upstream.address, e
                    ))
                })?;
            return Ok(NetworkStream::Unix(stream));
        }

        let addr = upstream.tcp_addr();
        trace!("Connecting to upstream {}", addr);
        let stream = timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ProxyError::Timeout(format!("connecting to {}", addr)))?
            .map_err(|e| ProxyError::Connection(format!("failed to connect to {}: {}", addr, e)))?;
        Ok(NetworkStream::Tcp(stream))
    }

    /// Drive the startup exchange on the client side.
    ///
    /// Consumes one startup frame per iteration: an SSLRequest keeps the
    /// machine waiting for the real startup (upgraded or not), everything
    /// else resolves the session.
    async fn run_startup(&mut self, backend: &mut NetworkStream) -> Result<StartupOutcome> {
        let read_timeout = self.config.server.read_timeout();

        loop {
            let frame = match timeout(read_timeout, read_startup_frame(self.client_mut()?)).await {
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) => {
                    debug!(
                        session_id = %self.session_id,
                        "Client closed before sending a startup frame"
                    );
                    return Ok(StartupOutcome::Denied);
                }
                Ok(Err(ProxyError::Protocol(reason))) => {
                    debug!(session_id = %self.session_id, %reason, "Bad startup frame");
                    self.reject(UNKNOWN_STARTUP_MESSAGE).await?;
                    return Ok(StartupOutcome::Denied);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(ProxyError::Timeout("waiting for client startup".into()));
                }
            };

            match decode_startup_frame(&frame) {
                StartupFrame::SslRequest => {
                    if let Some(acceptor) = self.tls_acceptor.take() {
                        self.client_mut()?.write_all(b"S").await?;
                        let tcp = self.take_client()?.into_tcp().map_err(|_| {
                            ProxyError::Protocol("client link is already encrypted".into())
                        })?;
                        let tls_stream = acceptor.accept(tcp).await.map_err(|e| {
                            error!(
                                session_id = %self.session_id,
                                peer = %self.peer_addr,
                                "TLS handshake failed: {}",
                                e
                            );
                            ProxyError::from(e)
                        })?;
                        self.client = Some(NetworkStream::Tls(Box::new(tls_stream)));
                        if let Some(version) = self.client_mut()?.tls_version() {
                            debug!(session_id = %self.session_id, "Client link upgraded to {}", version);
                        }
                    } else {
                        self.client_mut()?.write_all(b"N").await?;
                        debug!(session_id = %self.session_id, "Rejected SSL request (TLS not configured)");
                    }
                    // Still awaiting the real startup frame.
                }
                StartupFrame::CancelRequest => {
                    backend.write_all(&frame).await?;
                    backend.flush().await?;
                    debug!(
                        session_id = %self.session_id,
                        peer = %self.peer_addr,
                        "Cancel request forwarded"
                    );
                    return Ok(StartupOutcome::Cancelled);
                }
                StartupFrame::Startup(params) => {
                    let admitted = match (params.user(), params.database()) {
                        (Some(user), Some(database)) => {
                            let request = AuthRequest::new(self.peer_addr, user, database);
                            let admitted = match self.authorizer.authorize(&request).await {
                                Ok(admitted) => admitted,
                                Err(e) => {
                                    warn!(
                                        session_id = %self.session_id,
                                        error = %e,
                                        "Authorizer failed, denying session"
                                    );
                                    false
                                }
                            };
                            info!(
                                session_id = %self.session_id,
                                peer = %self.peer_addr,
                                user = %request.user,
                                database = %request.database,
                                admitted,
                                "Authorization decision"
                            );
                            admitted
                        }
                        _ => {
                            debug!(
                                session_id = %self.session_id,
                                "Startup message missing user or database"
                            );
                            false
                        }
                    };

                    if admitted {
                        backend.write_all(&frame).await?;
                        backend.flush().await?;
                        return Ok(StartupOutcome::Authorized);
                    }
                    self.reject(AUTH_FAILED_MESSAGE).await?;
                    return Ok(StartupOutcome::Denied);
                }
                StartupFrame::Unknown(code) => {
                    debug!(
                        session_id = %self.session_id,
                        peer = %self.peer_addr,
                        "Unrecognized startup discriminator {:#010x}",
                        code
                    );
                    self.reject(UNKNOWN_STARTUP_MESSAGE).await?;
                    return Ok(StartupOutcome::Denied);
                }
            }
        }
    }

    /// Send a fatal ErrorResponse to the client and flush it.
    async fn reject(&mut self, message: &str) -> Result<()> {
        let frame = build_fatal_frame(message);
        let client = self.client_mut()?;
        client.write_all(&frame).await?;
        client.flush().await?;
        Ok(())
    }

    /// Run the two relay halves until either finishes, then take the other
    /// one down with it.
    async fn relay(mut self, backend: NetworkStream) -> Result<()> {
        let client = self.take_client()?;
        let read_timeout = self.config.server.read_timeout();
        let chain_cap = self.config.server.max_chain_bytes;

        let (client_read, client_write) = tokio::io::split(client);
        let (backend_read, backend_write) = tokio::io::split(backend);

        let mut client_to_backend = tokio::spawn(relay_half(
            client_read,
            backend_write,
            "client->backend",
            read_timeout,
            chain_cap,
        ));
        let mut backend_to_client = tokio::spawn(relay_half(
            backend_read,
            client_write,
            "backend->client",
            read_timeout,
            chain_cap,
        ));

        tokio::select! {
            result = &mut client_to_backend => {
                backend_to_client.abort();
                let _ = backend_to_client.await;
                trace!(session_id = %self.session_id, result = ?result, "client->backend half finished first");
            }
            result = &mut backend_to_client => {
                client_to_backend.abort();
                let _ = client_to_backend.await;
                trace!(session_id = %self.session_id, result = ?result, "backend->client half finished first");
            }
        }

        debug!(
            session_id = %self.session_id,
            peer = %self.peer_addr,
            "Session torn down"
        );
        Ok(())
    }
}
