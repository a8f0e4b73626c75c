//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::path::Path;
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
/// - WebSocket at `/ws`, one workspace per connection
/// - session and theme endpoints under `/api/v1/...`
/// - static SPA from `server.static_dir` with index fallback
pub fn build_router(state: Arc<AppState>) -> Router {
  let static_dir = Path::new(&state.config.server.static_dir);
  let static_service = ServeDir::new(static_dir)
    .append_index_html_on_directories(true)
    .not_found_service(ServeFile::new(static_dir.join("index.html")));

  Router::new()
    .route("/ws", get(ws::ws_upgrade))
    .route("/api/v1/health", get(http::http_health))
    .route("/api/v1/session", get(http::http_get_session))
    .route("/api/v1/session/login", post(http::http_post_login))
    .route("/api/v1/session/register", post(http::http_post_register))
    .route("/api/v1/session/logout", post(http::http_post_logout))
    .route("/api/v1/theme", get(http::http_get_theme).put(http::http_put_theme))
    .route("/api/v1/theme/toggle", post(http::http_post_theme_toggle))
    .with_state(state)
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .layer(
      TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .fallback_service(static_service)
}
