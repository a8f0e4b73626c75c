//! Practice Workspace · headless problem-solving workspace
//!
//! - `workspace`: the per-page controller (problem loading, editor buffer,
//!   run/submit, previous/next/shuffle, submissions history, assistant chat)
//! - `gateway`: the cookie-session HTTP client for the practice backend
//! - `auth`, `theme`: application-level stores shared by all workspaces
//! - `routes`: the axum host (HTTP + one workspace per WebSocket)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   API_BASE_URL          : backend base URL (default "http://localhost:2000")
//!   THEME_STATE_FILE      : where the theme preference is kept (optional)
//!   WORKSPACE_CONFIG_PATH : path to TOML config
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod theme;
pub mod util;
pub mod workspace;

#[cfg(test)]
mod testing;
