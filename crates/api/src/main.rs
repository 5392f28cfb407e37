use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyperspace_core::shape::ShapeGenerator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hyperspace_api::background::SceneBroadcaster;
use hyperspace_api::config::ServerConfig;
use hyperspace_api::state::AppState;
use hyperspace_api::{app, ws};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hyperspace_api=debug,hyperspace_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Core components ---
    let processor = Arc::new(ShapeGenerator::new(config.job_simulated_latency()));
    let (state, completions) = AppState::new(config.clone(), processor);
    tracing::info!(workers = config.job_workers, "Job executor started");

    // Spawn the correlation router (delivers job outcomes to bound connections).
    let router_handle = tokio::spawn(Arc::clone(&state.correlation).run(completions));

    // --- Heartbeat ---
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&state.connections),
        config.heartbeat_interval(),
        heartbeat_cancel.clone(),
    );

    // --- Scene broadcaster ---
    let broadcaster = SceneBroadcaster::new(Arc::clone(&state.connections), config.scene_tick());
    broadcaster.start().await;

    // --- Router ---
    let connections = Arc::clone(&state.connections);
    let executor = Arc::clone(&state.executor);
    let app = app::build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    broadcaster.stop().await;

    // Let running jobs finish so their results still reach bound clients.
    executor.shutdown(config.shutdown_timeout()).await;

    // Dropping the executor closes the completion channel, which ends the
    // correlation router once the remaining outcomes are delivered.
    drop(executor);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;
    tracing::info!("Correlation router stopped");

    let ws_count = connections.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    connections.shutdown_all().await;

    heartbeat_cancel.cancel();
    let _ = heartbeat_handle.await;
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT, or on SIGTERM where supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
