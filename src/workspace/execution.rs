//! Run/submit lifecycle.
//!
//! `Idle -> Sending -> {Succeeded, Failed}`; the terminal state stays on display
//! until the next action, or until a reset moves it to `Cleared` (which is not
//! the same as `Idle`: a result was shown and dismissed).
//!
//! Only one action is outstanding at a time. A call made while one is in flight
//! is ignored, not queued. Nothing is cancelled: a late response is applied to
//! whatever state exists when it lands, unless the workspace was closed.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::Workspace;
use crate::domain::{ResultTab, RunResult};
use crate::error::WorkspaceError;
use crate::gateway::CodeSubmission;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Run,
  Submit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
  #[default]
  Idle,
  Sending,
  Succeeded,
  Failed,
  Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExecuteOutcome {
  /// Response (or synthetic failure) applied.
  Completed(RunResult),
  /// Another action was in flight; no request was sent.
  Ignored,
  /// Workspace closed before the response landed.
  Discarded,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionState {
  phase: ExecutionPhase,
  last_action: Option<Action>,
  result: Option<RunResult>,
  result_tab: ResultTab,
}

impl ExecutionState {
  pub fn phase(&self) -> ExecutionPhase {
    self.phase
  }

  pub fn in_flight(&self) -> bool {
    self.phase == ExecutionPhase::Sending
  }

  pub fn last_action(&self) -> Option<Action> {
    self.last_action
  }

  pub fn result(&self) -> Option<&RunResult> {
    self.result.as_ref()
  }

  pub fn result_tab(&self) -> ResultTab {
    self.result_tab
  }

  pub fn select_result_tab(&mut self, tab: ResultTab) {
    self.result_tab = tab;
  }

  fn begin(&mut self, action: Action) {
    self.phase = ExecutionPhase::Sending;
    self.last_action = Some(action);
    self.result = None;
  }

  /// Replace the result wholesale and show it.
  fn finish(&mut self, result: RunResult, call_failed: bool) {
    self.phase = if call_failed { ExecutionPhase::Failed } else { ExecutionPhase::Succeeded };
    self.result = Some(result);
    self.result_tab = ResultTab::Result;
  }

  /// Dismiss the shown result. The result sub-tab is not touched.
  pub(super) fn clear(&mut self) {
    self.result = None;
    if !self.in_flight() {
      self.phase = ExecutionPhase::Cleared;
    }
  }
}

impl Workspace {
  /// Send the current buffer to the judge, once.
  #[instrument(level = "info", target = "workspace", skip(self), fields(workspace = %self.id()))]
  pub async fn execute(&self, action: Action) -> Result<ExecuteOutcome, WorkspaceError> {
    let started = self
      .mutate(|st| -> Result<Option<(String, CodeSubmission)>, WorkspaceError> {
        if st.execution.in_flight() {
          return Ok(None);
        }
        let problem_id = st.problem_id.clone().ok_or(WorkspaceError::NotLoaded)?;
        st.execution.begin(action);
        Ok(Some((problem_id, CodeSubmission::new(st.editor.language(), st.editor.buffer()))))
      })
      .await??;

    let Some((problem_id, body)) = started else {
      debug!(target: "workspace", ?action, "Action ignored: another run/submit is in flight");
      return Ok(ExecuteOutcome::Ignored);
    };

    let response = match action {
      Action::Run => self.api.run(&problem_id, &body).await,
      Action::Submit => self.api.submit(&problem_id, &body).await,
    };

    let (result, call_failed) = match response {
      Ok(result) => {
        info!(target: "workspace", ?action, %problem_id, verdict = result.verdict().label(), passed = result.passed_count(), total = result.test_cases.len(), "Judge result received");
        (result, false)
      }
      Err(e) => {
        warn!(target: "workspace", ?action, %problem_id, error = %e, "Judge call failed");
        (RunResult::failure(e.user_message()), true)
      }
    };

    let shown = result.clone();
    match self.complete(|_| true, move |st| st.execution.finish(result, call_failed)).await {
      Some(()) => Ok(ExecuteOutcome::Completed(shown)),
      None => Ok(ExecuteOutcome::Discarded),
    }
  }

  pub async fn run(&self) -> Result<ExecuteOutcome, WorkspaceError> {
    self.execute(Action::Run).await
  }

  pub async fn submit(&self) -> Result<ExecuteOutcome, WorkspaceError> {
    self.execute(Action::Submit).await
  }

  pub async fn select_result_tab(&self, tab: ResultTab) -> Result<(), WorkspaceError> {
    self.mutate(|st| st.execution.select_result_tab(tab)).await
  }
}
