//! Buildboard server: an HTML page listing the latest buddybuild builds of one
//! application, with queue, build and total timings for each build.
//!
//! Every request fetches fresh data from the buddybuild API and renders it
//! through `templates/main.html`. Nothing is stored between requests.

mod config;
mod error;
mod metrics;
mod models;
mod routes;
mod services;

use std::net::SocketAddr;

use clap::Parser;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "buildboard", about = "buddybuild build board")]
struct Cli {
    /// Server port
    #[arg(short, long, env = "BOARD_PORT", default_value = "9090")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();

    tracing::info!("Starting buildboard...");

    let board_config = config::BoardConfig::from_env();
    tracing::info!(
        app_id = %board_config.app_id,
        application = %board_config.application,
        template = %board_config.template_path.display(),
        "Loaded board configuration"
    );

    let app = routes::board_router(routes::BoardRouterState::new(board_config))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    metrics::init_metrics();

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    tracing::info!("Buildboard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
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
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
