//! pg-warden - authorizing interception proxy for PostgreSQL
//!
//! This binary fronts a PostgreSQL backend and admits, denies, or upgrades
//! client sessions based on an external authorization program, then relays
//! traffic transparently.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use pg_warden::{Authorizer, Config, Listener, Result, ScriptAuthorizer, StaticAuthorizer};

#[derive(Parser)]
#[command(name = "pg-warden")]
#[command(version)]
#[command(about = "Authorizing interception proxy for PostgreSQL")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listen address
    #[arg(long)]
    listen_address: Option<String>,

    /// Override listen port
    #[arg(long)]
    listen_port: Option<u16>,

    /// Override upstream (socket path or hostname)
    #[arg(long)]
    upstream: Option<String>,

    /// Override authorization program
    #[arg(long)]
    auth_script: Option<PathBuf>,

    /// Serve TLS to clients from this PEM bundle (certificate + key)
    #[arg(long)]
    ssl: Option<PathBuf>,

    /// Override per-operation read timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Override reassembly chain cap in bytes
    #[arg(long)]
    max_chain: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (defaults when no file is given)
    let mut config = match &cli.config {
        Some(path) => pg_warden::config::load_config(path)?,
        None => {
            let mut config = Config::default();
            pg_warden::config::apply_env_overrides(&mut config);
            config
        }
    };

    // Apply CLI overrides
    if let Some(addr) = cli.listen_address {
        config.server.listen_address = addr;
    }
    if let Some(port) = cli.listen_port {
        config.server.listen_port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.address = upstream;
    }
    if let Some(script) = cli.auth_script {
        config.auth.script = Some(script);
    }
    if let Some(pem) = cli.ssl {
        config.server.tls.pem_path = Some(pem);
    }
    if let Some(secs) = cli.timeout {
        config.server.read_timeout_secs = secs;
    }
    if let Some(bytes) = cli.max_chain {
        config.server.max_chain_bytes = bytes;
    }

    // Initialize logging
    // Priority: RUST_LOG env var, then --verbose flag, then config level
    let log_level = std::env::var("RUST_LOG").ok().unwrap_or_else(|| {
        if cli.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        }
    });
    tracing_subscriber::fmt().with_env_filter(&log_level).init();

    info!("Starting pg-warden v{}", env!("CARGO_PKG_VERSION"));

    let authorizer: Arc<dyn Authorizer> = match &config.auth.script {
        Some(script) => {
            info!("Authorizing sessions via {}", script.display());
            Arc::new(ScriptAuthorizer::new(script.clone(), config.auth.timeout()))
        }
        None => {
            info!("No authorization program configured, admitting every session");
            Arc::new(StaticAuthorizer::allow_all())
        }
    };

    let config = Arc::new(config);

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let listener = Listener::bind(Arc::clone(&config), authorizer, shutdown_rx).await?;
    let stats = listener.stats();

    info!(
        "Proxy ready: listening on {}:{} -> {}",
        config.server.listen_address, config.server.listen_port, config.upstream
    );

    // Spawn the listener task
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            error!("Listener error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    // Send shutdown signal
    let _ = shutdown_tx.send(());

    // Wait for the listener to finish
    let _ = listener_handle.await;

    info!(
        "Shutdown complete. Total sessions handled: {}",
        stats
            .sessions_accepted
            .load(std::sync::atomic::Ordering::Relaxed)
    );

    Ok(())
}
