pub mod api;

use crate::dashboard::SharedDashboard;
use crate::services::YahooClient;
use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard: SharedDashboard<YahooClient>,
    pub started_at: DateTime<Utc>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/sectors", get(api::sectors_handler))
        .route("/dashboard", get(api::dashboard_handler))
        .route("/returns", get(api::returns_handler))
        .route("/prices", get(api::prices_handler))
        .route("/comparison", get(api::comparison_handler))
        .route("/fundamentals", get(api::fundamentals_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve(
    dashboard: SharedDashboard<YahooClient>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting sectorlens server");

    let state = AppState {
        dashboard,
        started_at: Utc::now(),
    };

    tracing::info!("Registering routes:");
    tracing::info!("  GET /health");
    tracing::info!("  GET /sectors");
    tracing::info!("  GET /dashboard?sector=通信&return_period=5y&price_period=5y");
    tracing::info!("  GET /returns?sector=通信&ticker=9432.T&ticker=9433.T&period=1y");
    tracing::info!("  GET /prices?sector=通信&period=1y");
    tracing::info!("  GET /comparison?sector=通信");
    tracing::info!("  GET /fundamentals?sector=通信&format=csv");

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
