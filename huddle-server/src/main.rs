use anyhow::{Context, Result};
use clap::Parser;
use huddle_signaling::server::{RelayService, router};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Standalone signaling relay for huddle clients. Keeps room
/// membership and forwards call setup traffic; no media flows through
/// it.
#[derive(Parser)]
#[command(name = "huddle-server", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:9400")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let service = RelayService::new();

    // Browser clients connect from a different origin than the relay.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(service).layer(cors);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("signaling relay listening on ws://{}/ws/{{participant_id}}", args.listen);

    axum::serve(listener, app)
        .await
        .context("relay server terminated")?;

    Ok(())
}
