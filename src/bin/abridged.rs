//! abridged: the Abridge daemon.
//!
//! Serves the [`Orchestrator`](abridge::Orchestrator) over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use abridge::server::config::{Config, LogFormat, Secrets};
use abridge::server::{AppState, build_orchestrator, router};

/// Abridge daemon, a resilient summarization service.
#[derive(Parser)]
#[command(name = "abridged")]
#[command(version)]
#[command(about = "Abridge summarization daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "ABRIDGE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Override the bind address from the configuration file.
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    let secrets = Secrets::load()?;

    init_tracing(&config);

    let orchestrator = build_orchestrator(&config, &secrets)?;

    // Parse address
    let addr: SocketAddr = config.server.address.parse().map_err(|e| {
        abridge::SummaryError::Configuration(format!("Invalid address: {e}"))
    })?;

    if secrets.api_keys.is_empty() {
        warn!("no API keys configured, authentication is disabled");
    }

    let state = AppState::new(Arc::new(orchestrator), secrets.api_keys.clone())
        .trust_forwarded_for(config.server.trust_forwarded_for);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        model = %config.provider.model,
        store = ?config.store.backend,
        "abridged starting"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("abridged stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    match config.server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
