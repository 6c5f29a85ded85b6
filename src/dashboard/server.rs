use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::routes;
use super::state::DashboardState;
use super::websocket;

/// Start the Axum dashboard server on the given port. Runs until the
/// process exits.
pub async fn start_dashboard(state: Arc<DashboardState>, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        // HTML page
        .route("/", get(routes::index))
        // JSON API endpoints
        .route("/api/overview", get(routes::get_overview))
        .route("/api/countries", get(routes::get_countries))
        .route("/api/stats", get(routes::get_stats))
        // HTMX HTML partials
        .route("/api/overview/html", get(routes::get_overview_html))
        .route("/api/stats/html", get(routes::get_stats_html))
        .route("/api/transcript/html", get(routes::get_transcript_html))
        // Chat turn submission
        .route("/api/chat", post(routes::chat))
        // WebSocket for live run progress
        .route("/api/events", get(websocket::ws_handler))
        .with_state(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
