//! Error types for the gateway and the workspace controller.

use thiserror::Error;

/// Shown when the backend gives no usable message for a failed call.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Failure of a single backend call. Never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
  #[error("backend returned HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
  Status { status: u16, message: Option<String> },

  #[error("request failed: {0}")]
  Transport(String),

  #[error("invalid response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Message fit for display: the backend's own `message` field, or the fallback.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Status { message: Some(m), .. } if !m.trim().is_empty() => m.clone(),
      _ => FALLBACK_ERROR_MESSAGE.to_string(),
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(self, ApiError::Status { status: 401 | 403, .. })
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Transport(err.to_string())
    }
  }
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("unsupported language: {0}")]
  UnsupportedLanguage(String),

  #[error("no problem is loaded")]
  NotLoaded,

  #[error("workspace is closed")]
  Closed,

  #[error(transparent)]
  Api(#[from] ApiError),
}
