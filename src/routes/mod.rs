//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        // Generator
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/question", get(http::http_get_question))
        .route("/api/v1/quiz", get(http::http_get_quiz))
        .route("/api/v1/complex", get(http::http_get_complex))
        // Progress
        .route("/api/v1/attempts", post(http::http_post_attempt))
        .route("/api/v1/users/:id/stats", get(http::http_get_stats))
        .route("/api/v1/users/:id/badges", get(http::http_get_badges))
        .route("/api/v1/users/:id/badges/check", post(http::http_post_check_badges))
        .route("/api/v1/users/:id/mastery", get(http::http_get_mastery))
        .route("/api/v1/users/:id/attempts", get(http::http_get_attempts))
        .route("/api/v1/leaderboard", post(http::http_post_leaderboard))
        .route("/api/v1/badges", get(http::http_get_catalog))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
