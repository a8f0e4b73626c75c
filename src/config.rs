//! Host configuration from TOML plus environment overrides.
//!
//! Every section is optional. Schema:
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:2000"
//! user_agent = "practice-workspace/0.1"
//! timeout_secs = 30          # omitted = no local timeout
//!
//! [server]
//! port = 3000
//! static_dir = "./static"
//!
//! [theme]
//! state_file = "./theme.txt"
//! ```

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:2000";

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct HostConfig {
  pub api: ApiConfig,
  pub server: ServerConfig,
  pub theme: ThemeConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  pub user_agent: String,
  pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.into(),
      user_agent: concat!("practice-workspace/", env!("CARGO_PKG_VERSION")).into(),
      timeout_secs: None,
    }
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub port: u16,
  pub static_dir: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { port: 3000, static_dir: "./static".into() }
  }
}

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
  pub state_file: Option<String>,
}

impl HostConfig {
  /// Load from WORKSPACE_CONFIG_PATH (if set), then apply env overrides.
  /// A missing or broken file is logged and defaults are used.
  pub fn from_env() -> Self {
    let mut cfg = match std::env::var("WORKSPACE_CONFIG_PATH") {
      Ok(path) => Self::load_file(&path).unwrap_or_default(),
      Err(_) => Self::default(),
    };
    cfg.apply_overrides(|key| std::env::var(key).ok());
    cfg
  }

  fn load_file(path: &str) -> Option<Self> {
    match std::fs::read_to_string(path) {
      Ok(s) => match toml::from_str::<HostConfig>(&s) {
        Ok(cfg) => {
          info!(target: "practice_workspace", %path, "Loaded host config (TOML)");
          Some(cfg)
        }
        Err(e) => {
          error!(target: "practice_workspace", %path, error = %e, "Failed to parse TOML config");
          None
        }
      },
      Err(e) => {
        error!(target: "practice_workspace", %path, error = %e, "Failed to read TOML config file");
        None
      }
    }
  }

  /// API_BASE_URL, PORT and THEME_STATE_FILE win over the file.
  pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("API_BASE_URL").filter(|u| !u.trim().is_empty()) {
      self.api.base_url = url;
    }
    if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(file) = lookup("THEME_STATE_FILE").filter(|f| !f.trim().is_empty()) {
      self.theme.state_file = Some(file);
    }
  }
}
