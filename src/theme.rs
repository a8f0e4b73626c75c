//! Light/dark theme preference, optionally persisted to a small state file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
  #[default]
  Light,
  Dark,
}

impl ThemeMode {
  pub fn toggled(self) -> Self {
    match self {
      ThemeMode::Light => ThemeMode::Dark,
      ThemeMode::Dark => ThemeMode::Light,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ThemeMode::Light => "light",
      ThemeMode::Dark => "dark",
    }
  }
}

impl FromStr for ThemeMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "light" => Ok(ThemeMode::Light),
      "dark" => Ok(ThemeMode::Dark),
      other => Err(format!("unknown theme '{other}'")),
    }
  }
}

impl fmt::Display for ThemeMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone)]
pub struct ThemeStore {
  mode: Arc<RwLock<ThemeMode>>,
  state_file: Option<PathBuf>,
}

impl ThemeStore {
  /// Read the stored mode if a state file is given. Missing or unreadable
  /// files fall back to light.
  pub fn load(state_file: Option<PathBuf>) -> Self {
    let mode = match &state_file {
      Some(path) => match std::fs::read_to_string(path) {
        Ok(text) => text.parse::<ThemeMode>().unwrap_or_else(|e| {
          warn!(target: "practice_workspace", path = %path.display(), error = %e, "Ignoring stored theme");
          ThemeMode::default()
        }),
        Err(e) => {
          debug!(target: "practice_workspace", path = %path.display(), error = %e, "No stored theme");
          ThemeMode::default()
        }
      },
      None => ThemeMode::default(),
    };
    Self { mode: Arc::new(RwLock::new(mode)), state_file }
  }

  pub async fn mode(&self) -> ThemeMode {
    *self.mode.read().await
  }

  pub async fn toggle(&self) -> ThemeMode {
    let next = {
      let mut mode = self.mode.write().await;
      *mode = mode.toggled();
      *mode
    };
    self.persist(next).await;
    next
  }

  pub async fn set(&self, next: ThemeMode) -> ThemeMode {
    *self.mode.write().await = next;
    self.persist(next).await;
    next
  }

  async fn persist(&self, mode: ThemeMode) {
    info!(target: "practice_workspace", %mode, "Theme changed");
    let Some(path) = &self.state_file else { return };
    if let Err(e) = tokio::fs::write(path, mode.as_str()).await {
      warn!(target: "practice_workspace", path = %path.display(), error = %e, "Failed to persist theme");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn temp_file() -> PathBuf {
    std::env::temp_dir().join(format!("theme-{}.txt", Uuid::new_v4()))
  }

  #[tokio::test]
  async fn defaults_to_light_and_toggles() {
    let store = ThemeStore::load(None);
    assert_eq!(store.mode().await, ThemeMode::Light);
    assert_eq!(store.toggle().await, ThemeMode::Dark);
    assert_eq!(store.toggle().await, ThemeMode::Light);
  }

  #[tokio::test]
  async fn mode_survives_a_reload() {
    let path = temp_file();
    let store = ThemeStore::load(Some(path.clone()));
    store.set(ThemeMode::Dark).await;

    let reloaded = ThemeStore::load(Some(path.clone()));
    assert_eq!(reloaded.mode().await, ThemeMode::Dark);
    let _ = std::fs::remove_file(path);
  }

  #[tokio::test]
  async fn garbage_state_file_falls_back_to_light() {
    let path = temp_file();
    std::fs::write(&path, "purple").unwrap();
    assert_eq!(ThemeStore::load(Some(path.clone())).mode().await, ThemeMode::Light);
    let _ = std::fs::remove_file(path);
  }

  #[tokio::test]
  async fn unwritable_state_file_is_not_fatal() {
    let path = std::env::temp_dir().join(Uuid::new_v4().to_string()).join("nested").join("theme.txt");
    let store = ThemeStore::load(Some(path));
    assert_eq!(store.set(ThemeMode::Dark).await, ThemeMode::Dark);
    assert_eq!(store.mode().await, ThemeMode::Dark);
  }

  #[test]
  fn serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ThemeMode::Dark).unwrap(), "\"dark\"");
    assert_eq!("light".parse::<ThemeMode>(), Ok(ThemeMode::Light));
  }
}
