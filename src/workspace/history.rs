//! Submissions history for the open problem.
//!
//! Fetched on the first visit to the submissions tab and cached until the
//! problem id changes. It is not refreshed after a new submission.

use std::cmp::Reverse;

use tracing::{info, instrument, warn};

use super::Workspace;
use crate::domain::Submission;
use crate::error::WorkspaceError;

pub const HISTORY_ERROR_MESSAGE: &str = "Could not load submissions. Please try again later.";

#[derive(Clone, Debug, Default, PartialEq)]
pub enum HistoryState {
  #[default]
  NotLoaded,
  Loading,
  /// Newest first.
  Loaded(Vec<Submission>),
  /// Shown inline in the tab; the next visit to the tab tries again.
  Failed(String),
}

impl HistoryState {
  pub fn submissions(&self) -> &[Submission] {
    match self {
      HistoryState::Loaded(list) => list,
      _ => &[],
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryOutcome {
  Fetched(usize),
  /// Already loaded or loading; no request sent.
  Cached,
  /// No problem loaded yet.
  Skipped,
  Failed,
  /// Closed, or the problem changed while the request was out.
  Discarded,
}

impl Workspace {
  #[instrument(level = "info", target = "workspace", skip(self), fields(workspace = %self.id()))]
  pub(super) async fn load_history(&self) -> Result<HistoryOutcome, WorkspaceError> {
    let target = self
      .mutate(|st| {
        let problem_id = st.loaded_problem()?.id.clone();
        match st.history {
          HistoryState::NotLoaded | HistoryState::Failed(_) => {
            st.history = HistoryState::Loading;
            Some(Ok(problem_id))
          }
          HistoryState::Loading | HistoryState::Loaded(_) => Some(Err(HistoryOutcome::Cached)),
        }
      })
      .await?;

    let problem_id = match target {
      None => return Ok(HistoryOutcome::Skipped),
      Some(Err(outcome)) => return Ok(outcome),
      Some(Ok(id)) => id,
    };

    let response = self.api.submissions(&problem_id).await;

    let same_problem =
      |st: &super::WorkspaceState| st.loaded_problem().is_some_and(|p| p.id == problem_id) && st.history == HistoryState::Loading;
    let applied = self
      .complete(same_problem, |st| match response {
        Ok(mut list) => {
          // Entries without a timestamp sink to the bottom.
          list.sort_by_key(|s| Reverse(s.submitted_at));
          let n = list.len();
          info!(target: "workspace", %problem_id, count = n, "Submissions loaded");
          st.history = HistoryState::Loaded(list);
          HistoryOutcome::Fetched(n)
        }
        Err(e) => {
          warn!(target: "workspace", %problem_id, error = %e, "Failed to fetch submissions");
          st.history = HistoryState::Failed(HISTORY_ERROR_MESSAGE.to_string());
          HistoryOutcome::Failed
        }
      })
      .await;

    Ok(applied.unwrap_or(HistoryOutcome::Discarded))
  }

  /// Open one loaded submission for the detail view, or clear the selection with `None`.
  pub async fn view_submission(&self, submission_id: Option<String>) -> Result<(), WorkspaceError> {
    self
      .mutate(|st| {
        st.selected_submission = submission_id.filter(|id| st.history.submissions().iter().any(|s| &s.id == id));
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::domain::Tab;
  use crate::error::ApiError;
  use crate::testing::{problem, submission, wait_until, FakeApi};

  #[tokio::test]
  async fn first_visit_fetches_and_sorts_newest_first() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("p1", 1)]));
    api.set_submissions(Ok(vec![
      submission("old", "2024-01-01T00:00:00Z"),
      submission("new", "2024-03-01T00:00:00Z"),
      submission("mid", "2024-02-01T00:00:00Z"),
    ]));
    let ws = Workspace::new(api.clone());
    ws.open("p1").await.unwrap();

    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Fetched(3)));
    ws.view(|st| {
      let ids: Vec<_> = st.history.submissions().iter().map(|s| s.id.as_str()).collect();
      assert_eq!(ids, ["new", "mid", "old"]);
    })
    .await;
  }

  #[tokio::test]
  async fn history_is_fetched_at_most_once_per_problem() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("p1", 1), problem("p2", 2)]));
    let ws = Workspace::new(api.clone());
    ws.open("p1").await.unwrap();

    ws.select_tab(Tab::Submissions).await.unwrap();
    ws.select_tab(Tab::Description).await.unwrap();
    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Cached));
    ws.submit().await.unwrap();
    ws.select_tab(Tab::Submissions).await.unwrap();
    assert_eq!(api.submissions_calls(), 1);

    ws.open("p2").await.unwrap();
    assert_eq!(api.submissions_calls(), 2);
    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Cached));
    assert_eq!(api.submissions_calls(), 2);
  }

  #[tokio::test]
  async fn navigating_while_on_the_tab_fetches_the_new_history() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1), problem("b", 2)]));
    api.set_submissions(Ok(vec![submission("s1", "2024-01-01T00:00:00Z")]));
    let ws = Workspace::new(api.clone());
    ws.open("a").await.unwrap();
    ws.select_tab(Tab::Submissions).await.unwrap();

    ws.next().await.unwrap();
    assert_eq!(api.submissions_calls(), 2);
    ws.view(|st| {
      assert_eq!(st.loaded_problem().map(|p| p.id.as_str()), Some("b"));
      assert_eq!(st.history.submissions().len(), 1);
    })
    .await;
  }

  #[tokio::test]
  async fn opening_on_another_tab_does_not_fetch_history() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1), problem("b", 2)]));
    let ws = Workspace::new(api.clone());
    ws.open("a").await.unwrap();
    ws.next().await.unwrap();
    assert_eq!(api.submissions_calls(), 0);
    ws.view(|st| assert_eq!(st.history, HistoryState::NotLoaded)).await;
  }

  #[tokio::test]
  async fn tab_before_problem_loads_is_skipped() {
    let api = Arc::new(FakeApi::with_problems(vec![]));
    let ws = Workspace::new(api.clone());
    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Skipped));
    assert_eq!(api.submissions_calls(), 0);
  }

  #[tokio::test]
  async fn failure_is_inline_and_retried_on_next_visit() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("p1", 1)]));
    api.set_submissions(Err(ApiError::Transport("down".into())));
    let ws = Workspace::new(api.clone());
    ws.open("p1").await.unwrap();

    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Failed));
    ws.view(|st| assert_eq!(st.history, HistoryState::Failed(HISTORY_ERROR_MESSAGE.into()))).await;

    api.set_submissions(Ok(vec![submission("s1", "2024-01-01T00:00:00Z")]));
    assert_eq!(ws.select_tab(Tab::Submissions).await.unwrap(), Some(HistoryOutcome::Fetched(1)));
  }

  #[tokio::test]
  async fn response_for_previous_problem_is_dropped() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("p1", 1), problem("p2", 2)]));
    api.set_submissions(Ok(vec![submission("s1", "2024-01-01T00:00:00Z")]));
    let gate = api.hold_submissions();
    let ws = Workspace::new(api.clone());
    ws.open("p1").await.unwrap();

    let pending = tokio::spawn({
      let ws = ws.clone();
      async move { ws.select_tab(Tab::Submissions).await }
    });
    wait_until(&ws, |st| st.history == HistoryState::Loading).await;

    // Still on the submissions tab, so p2 starts its own fetch once it loads.
    let opening = tokio::spawn({
      let ws = ws.clone();
      async move { ws.open("p2").await }
    });
    wait_until(&ws, |st| {
      st.loaded_problem().is_some_and(|p| p.id == "p2") && st.history == HistoryState::Loading
    })
    .await;
    gate.notify_one();
    gate.notify_one();

    assert_eq!(pending.await.unwrap().unwrap(), Some(HistoryOutcome::Discarded));
    opening.await.unwrap().unwrap();
    ws.view(|st| assert_eq!(st.history.submissions().len(), 1)).await;
    assert_eq!(api.submissions_calls(), 2);
  }

  #[tokio::test]
  async fn selecting_a_submission_requires_it_to_be_loaded() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("p1", 1)]));
    api.set_submissions(Ok(vec![submission("s1", "2024-01-01T00:00:00Z")]));
    let ws = Workspace::new(api);
    ws.open("p1").await.unwrap();

    ws.view_submission(Some("s1".into())).await.unwrap();
    ws.view(|st| assert_eq!(st.selected_submission, None)).await;

    ws.select_tab(Tab::Submissions).await.unwrap();
    ws.view_submission(Some("s1".into())).await.unwrap();
    ws.view(|st| assert_eq!(st.selected_submission.as_deref(), Some("s1"))).await;
    ws.view_submission(None).await.unwrap();
    ws.view(|st| assert_eq!(st.selected_submission, None)).await;
  }
}
