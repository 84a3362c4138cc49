//! TCP listener for incoming client connections

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};

use crate::auth::Authorizer;
use crate::config::Config;
use crate::error::Result;

use super::session::Session;

/// Listener statistics
#[derive(Debug, Default)]
pub struct ListenerStats {
    /// Total sessions accepted
    pub sessions_accepted: AtomicU64,
    /// Currently active sessions
    pub sessions_active: AtomicU64,
    /// Sessions rejected due to the connection limit
    pub sessions_rejected: AtomicU64,
}

/// TCP listener that accepts client connections and spawns sessions
pub struct Listener {
    /// TCP listener
    listener: TcpListener,
    /// Configuration
    config: Arc<Config>,
    /// Authorization decision procedure shared by all sessions
    authorizer: Arc<dyn Authorizer>,
    /// Statistics
    stats: Arc<ListenerStats>,
    /// Shutdown signal receiver
    shutdown_rx: broadcast::Receiver<()>,
    /// Connection limit semaphore (None = unlimited)
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured address and create a new listener.
    pub async fn bind(
        config: Arc<Config>,
        authorizer: Arc<dyn Authorizer>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let addr = format!(
            "{}:{}",
            config.server.listen_address, config.server.listen_port
        );

        let listener = TcpListener::bind(&addr).await?;

        let connection_semaphore = if config.server.max_connections > 0 {
            info!(
                "Listening on {} (max {} sessions)",
                addr, config.server.max_connections
            );
            Some(Arc::new(Semaphore::new(config.server.max_connections)))
        } else {
            info!("Listening on {}", addr);
            None
        };

        Ok(Self {
            listener,
            config,
            authorizer,
            stats: Arc::new(ListenerStats::default()),
            shutdown_rx,
            connection_semaphore,
        })
    }

    /// Get listener statistics.
    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Get the local address the listener is bound to.
    ///
    /// Useful when binding to port 0 to get an OS-assigned port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop.
    ///
    /// Per-session errors are logged and confined to their session; only a
    /// shutdown signal stops the loop.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let permit = if let Some(ref semaphore) = self.connection_semaphore {
                                match semaphore.clone().try_acquire_owned() {
                                    Ok(permit) => Some(permit),
                                    Err(_) => {
                                        warn!(
                                            "Session from {} rejected: max sessions ({}) reached",
                                            addr,
                                            self.config.server.max_connections
                                        );
                                        self.stats.sessions_rejected.fetch_add(1, Ordering::Relaxed);
                                        drop(stream);
                                        continue;
                                    }
                                }
                            } else {
                                None
                            };

                            debug!("Accepted connection from {}", addr);
                            self.stats.sessions_accepted.fetch_add(1, Ordering::Relaxed);
                            self.stats.sessions_active.fetch_add(1, Ordering::Relaxed);

                            let config = Arc::clone(&self.config);
                            let authorizer = Arc::clone(&self.authorizer);
                            let stats = Arc::clone(&self.stats);

                            tokio::spawn(async move {
                                // Hold the permit for the session lifetime.
                                let _permit = permit;

                                match Session::new(stream, addr, config, authorizer) {
                                    Ok(session) => {
                                        if let Err(e) = session.handle().await {
                                            warn!("Session from {} error: {}", addr, e);
                                        }
                                    }
                                    Err(e) => {
                                        error!("Failed to set up session from {}: {}", addr, e);
                                    }
                                }
                                stats.sessions_active.fetch_sub(1, Ordering::Relaxed);
                                debug!("Connection from {} closed", addr);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            // Brief delay before retrying
                            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        info!(
            "Listener stopped. Total: {}, Active: {}, Rejected: {}",
            self.stats.sessions_accepted.load(Ordering::Relaxed),
            self.stats.sessions_active.load(Ordering::Relaxed),
            self.stats.sessions_rejected.load(Ordering::Relaxed)
        );

        Ok(())
    }
}
