//! Application-level session store.
//!
//! Holds the signed-in user for the whole host, independent of any workspace.
//! Each operation marks the store loading, calls the backend, then records the
//! user or the error.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::User;
use crate::error::ApiError;
use crate::gateway::{AuthApi, Credentials, Registration};

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
  pub user: Option<User>,
  pub is_authenticated: bool,
  pub loading: bool,
  pub error: Option<String>,
  /// Set when a session check was rejected with 401/403.
  pub force_logout: bool,
}

impl Default for AuthState {
  fn default() -> Self {
    // Nothing is known until the first check completes.
    Self { user: None, is_authenticated: false, loading: true, error: None, force_logout: false }
  }
}

impl AuthState {
  fn begin(&mut self) {
    self.loading = true;
    self.error = None;
    self.force_logout = false;
  }

  fn signed_in(&mut self, user: Option<User>) {
    self.loading = false;
    self.is_authenticated = user.is_some();
    self.user = user;
  }

  fn signed_out(&mut self, error: Option<String>) {
    self.loading = false;
    self.is_authenticated = false;
    self.user = None;
    self.error = error;
  }
}

#[derive(Clone)]
pub struct AuthStore {
  api: Arc<dyn AuthApi>,
  state: Arc<RwLock<AuthState>>,
}

impl AuthStore {
  pub fn new(api: Arc<dyn AuthApi>) -> Self {
    Self { api, state: Arc::new(RwLock::new(AuthState::default())) }
  }

  pub async fn snapshot(&self) -> AuthState {
    self.state.read().await.clone()
  }

  /// Ask the backend whether the session cookie is still valid.
  #[instrument(level = "info", target = "practice_workspace", skip(self))]
  pub async fn check(&self) -> AuthState {
    self.state.write().await.begin();
    let result = self.api.check_session().await;

    let mut st = self.state.write().await;
    match result {
      Ok(user) => st.signed_in(user),
      Err(e) => {
        let message = if e.is_unauthorized() { UNAUTHORIZED_MESSAGE } else { SERVER_ERROR_MESSAGE };
        warn!(target: "practice_workspace", error = %e, "Session check failed");
        st.signed_out(Some(message.to_string()));
        st.force_logout = e.is_unauthorized();
      }
    }
    st.clone()
  }

  #[instrument(level = "info", target = "practice_workspace", skip(self, credentials))]
  pub async fn login(&self, credentials: Credentials) -> AuthState {
    self.state.write().await.begin();
    let result = self.api.login(&credentials).await;
    self.settle("login", result).await
  }

  #[instrument(level = "info", target = "practice_workspace", skip(self, registration))]
  pub async fn register(&self, registration: Registration) -> AuthState {
    self.state.write().await.begin();
    let result = self.api.register(&registration).await;
    self.settle("register", result).await
  }

  /// Clears the user whether or not the backend call succeeds.
  #[instrument(level = "info", target = "practice_workspace", skip(self))]
  pub async fn logout(&self) -> AuthState {
    self.state.write().await.begin();
    let result = self.api.logout().await;

    let mut st = self.state.write().await;
    match result {
      Ok(()) => {
        info!(target: "practice_workspace", "Logged out");
        st.signed_out(None);
      }
      Err(e) => {
        warn!(target: "practice_workspace", error = %e, "Logout call failed; clearing session anyway");
        st.signed_out(Some(e.user_message()));
      }
    }
    st.clone()
  }

  async fn settle(&self, op: &str, result: Result<Option<User>, ApiError>) -> AuthState {
    let mut st = self.state.write().await;
    match result {
      Ok(user) => {
        info!(target: "practice_workspace", op, signed_in = user.is_some(), "Auth call succeeded");
        st.signed_in(user);
      }
      Err(e) => {
        warn!(target: "practice_workspace", op, error = %e, "Auth call failed");
        st.signed_out(Some(e.user_message()));
      }
    }
    st.clone()
  }
}
