//! Merger calculator server binary entrypoint.

use std::future::IntoFuture;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use merger_common::config::AppConfig;

use merger_api::routes::create_router;
use merger_api::state::AppState;

const DEFAULT_LOG_FILTER: &str =
    "merger_api=debug,merger_loader=info,merger_engine=info,merger_feed=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also pulls in .env, so RUST_LOG there applies)
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        token_a = %config.token_a.symbol,
        token_b = %config.token_b.symbol,
        supply_source = %config.supply_source,
        "Starting merger calculator..."
    );

    let listen_addr = config.listen_addr;
    let state = AppState::from_config(config)?;

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Calculator listening on {}", listen_addr);

    // Live views hold their connections open, so stop on Ctrl+C rather than
    // waiting for them to drain
    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server exited with error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping...");
        }
    }

    tracing::info!("Merger calculator stopped.");
    Ok(())
}
