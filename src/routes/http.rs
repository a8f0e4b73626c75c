//! HTTP endpoint handlers. Thin wrappers over the app-level stores.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::gateway::{Credentials, Registration};
use crate::protocol::{HealthOut, ThemeIn, ThemeOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let snapshot = state.auth.check().await;
  info!(target: "practice_workspace", authenticated = snapshot.is_authenticated, "HTTP session check");
  Json(snapshot)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_login(State(state): State<Arc<AppState>>, Json(body): Json<Credentials>) -> impl IntoResponse {
  Json(state.auth.login(body).await)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Registration>,
) -> impl IntoResponse {
  Json(state.auth.register(body).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.auth.logout().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_theme(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ThemeOut { mode: state.theme.mode().await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_theme_toggle(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(ThemeOut { mode: state.theme.toggle().await })
}

#[instrument(level = "info", skip(state, body), fields(mode = %body.mode))]
pub async fn http_put_theme(State(state): State<Arc<AppState>>, Json(body): Json<ThemeIn>) -> impl IntoResponse {
  Json(ThemeOut { mode: state.theme.set(body.mode).await })
}
