//! Previous / next by serial number, and shuffle over the cached list.
//!
//! The authoritative boundary is the backend: previous/next ask for serial ± 1
//! and a failed fetch simply leaves the view where it is. The local
//! `can_go_previous`/`can_go_next` flags come from the cached list and can
//! disagree with it when the list is stale.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument, warn};

use super::Workspace;
use crate::error::WorkspaceError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavOutcome {
  Navigated(String),
  Unchanged,
}

#[derive(Clone, Copy, Debug)]
enum Direction {
  Previous,
  Next,
}

impl Workspace {
  pub async fn previous(&self) -> Result<NavOutcome, WorkspaceError> {
    self.step(Direction::Previous).await
  }

  pub async fn next(&self) -> Result<NavOutcome, WorkspaceError> {
    self.step(Direction::Next).await
  }

  #[instrument(level = "info", target = "workspace", skip(self), fields(workspace = %self.id()))]
  async fn step(&self, direction: Direction) -> Result<NavOutcome, WorkspaceError> {
    let serial = self.view(|st| st.loaded_problem().and_then(|p| p.serial)).await;
    let Some(serial) = serial else {
      info!(target: "workspace", ?direction, "Current problem or its serial number not loaded yet");
      return Ok(NavOutcome::Unchanged);
    };

    let target = match direction {
      Direction::Previous => serial.checked_sub(1),
      Direction::Next => serial.checked_add(1),
    };
    let Some(target) = target else {
      info!(target: "workspace", ?direction, serial, "No serial number beyond this one");
      return Ok(NavOutcome::Unchanged);
    };

    match self.api.problem_by_serial(target).await {
      Ok(p) if !p.id.is_empty() => {
        let id = p.id;
        self.open(&id).await?;
        Ok(NavOutcome::Navigated(id))
      }
      Ok(_) => {
        warn!(target: "workspace", ?direction, target, "Problem at serial number has no id");
        Ok(NavOutcome::Unchanged)
      }
      Err(e) => {
        // Expected at either end of the ordering.
        warn!(target: "workspace", ?direction, target, error = %e, "Could not fetch adjacent problem; staying put");
        Ok(NavOutcome::Unchanged)
      }
    }
  }

  /// Open a uniformly random problem from the cached list. No-op on an empty list.
  pub async fn shuffle(&self) -> Result<NavOutcome, WorkspaceError> {
    let mut rng = StdRng::from_entropy();
    self.shuffle_with(&mut rng).await
  }

  #[instrument(level = "info", target = "workspace", skip(self, rng), fields(workspace = %self.id()))]
  pub async fn shuffle_with<R: Rng + Send>(&self, rng: &mut R) -> Result<NavOutcome, WorkspaceError> {
    let ids: Vec<String> = self.view(|st| st.catalog.iter().map(|p| p.id.clone()).collect()).await;
    if ids.is_empty() {
      info!(target: "workspace", "Shuffle ignored: problem list is empty");
      return Ok(NavOutcome::Unchanged);
    }
    let id = ids[rng.gen_range(0..ids.len())].clone();
    self.open(&id).await?;
    Ok(NavOutcome::Navigated(id))
  }
}
