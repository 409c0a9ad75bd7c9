//! rebalance-server
//!
//! Axum-based REST API around the stablecoin rebalancing pipeline:
//! target weights, swap plans, full previews and the agent tool registry.

mod config;
mod handlers;
mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::handlers::{
    derive_weights, execute_tool, health_check, list_tools, rebalance_preview, swap_plan,
};
use crate::state::AppState;

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Rebalancing API
        .route("/api/weights", post(derive_weights))
        .route("/api/swap-plan", post(swap_plan))
        .route("/api/rebalance/preview", post(rebalance_preview))
        // Agent tools
        .route("/api/tools", get(list_tools))
        .route("/api/tools/execute", post(execute_tool))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        assets = config.universe.len(),
        base = %config.settings.base,
        weight_min = config.policy.weight_min,
        weight_max = config.policy.weight_max,
        liq_gate = config.policy.liq_gate_threshold,
        "Loaded rebalancing policy"
    );

    let state = AppState::new(&config)?;
    tracing::warn!("⚠ No live price feed configured - peg scans use static $1 prices");

    tracing::info!("Registered {} tools:", state.tools.len());
    for name in state.tools.names() {
        tracing::info!("  • {}", name);
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 rebalance-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  POST /api/weights           - Target weights + regime");
    tracing::info!("  POST /api/swap-plan         - Base-routed swap plan");
    tracing::info!("  POST /api/rebalance/preview - Full rebalance preview");
    tracing::info!("  GET  /api/tools             - Tool schemas");
    tracing::info!("  POST /api/tools/execute     - Execute a tool call");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
