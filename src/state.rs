//! Shared host state: configuration, the backend client and the app-level stores.
//!
//! One `ApiClient` serves both the workspaces and the auth store, so the session
//! cookie set by login is sent with every later workspace call.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::AuthStore;
use crate::config::HostConfig;
use crate::error::ApiError;
use crate::gateway::{ApiClient, AuthApi, ProblemApi};
use crate::theme::ThemeStore;
use crate::workspace::Workspace;

#[derive(Clone)]
pub struct AppState {
  pub config: HostConfig,
  pub problems: Arc<dyn ProblemApi>,
  pub auth: AuthStore,
  pub theme: ThemeStore,
}

impl AppState {
  #[instrument(level = "info", skip_all)]
  pub fn from_config(config: HostConfig) -> Result<Self, ApiError> {
    let client = Arc::new(ApiClient::new(&config.api)?);
    info!(target: "practice_workspace", base_url = %client.base_url(), timeout_secs = ?config.api.timeout_secs, "Backend client ready");
    Ok(Self::with_backends(config, client.clone(), client))
  }

  pub fn with_backends(config: HostConfig, problems: Arc<dyn ProblemApi>, auth: Arc<dyn AuthApi>) -> Self {
    let theme = ThemeStore::load(config.theme.state_file.as_ref().map(PathBuf::from));
    Self { problems, auth: AuthStore::new(auth), theme, config }
  }

  /// Fresh workspace for one connected UI.
  pub fn new_workspace(&self) -> Workspace {
    Workspace::new(self.problems.clone())
  }
}
