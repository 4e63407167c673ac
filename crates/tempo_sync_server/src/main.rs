//! The `tempo-sync-server` binary.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempo_sync_server::{routes, ServerConfig, SyncServer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Sync server for tempo timer data.
#[derive(Parser, Debug)]
#[command(name = "tempo-sync-server", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Secret used to sign session tokens.
    #[arg(long, env = "TEMPO_AUTH_SECRET", default_value = "tempo-dev-secret")]
    auth_secret: String,

    /// Session token lifetime in hours.
    #[arg(long, default_value_t = 24)]
    token_expiry_hours: u64,

    /// Number of recent events in summary responses.
    #[arg(long, default_value_t = 5)]
    recent_preview: usize,

    /// Maximum records accepted in one incremental request.
    #[arg(long, default_value_t = 1000)]
    max_batch: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempo_sync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::new(args.listen, args.auth_secret.into_bytes())
        .with_token_expiry(Duration::from_secs(args.token_expiry_hours * 3600))
        .with_recent_preview(args.recent_preview)
        .with_max_batch(args.max_batch);

    let server = Arc::new(SyncServer::new(config));
    let app = routes::router(server);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(addr = %args.listen, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
