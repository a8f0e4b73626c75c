//! The problem workspace controller.
//!
//! A `Workspace` owns the state of one open problem page: the loaded problem
//! and the cached problem list, the editor buffer, the last run/submit result,
//! the active tabs, the submissions history and the assistant transcript.
//!
//! Handles are cheap to clone and all share one state. The state lock is never
//! held across a backend call: an operation snapshots what it needs, releases
//! the lock, awaits the call, and re-locks to apply the outcome. Completions
//! that land after `close()` are discarded.
//!
//! Every mutation bumps a revision on a watch channel (`subscribe()`), which
//! the host uses to push snapshots.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Problem, ProblemSummary, Tab};
use crate::error::WorkspaceError;
use crate::gateway::ProblemApi;

mod assistant;
mod editor;
mod execution;
mod history;
mod navigation;

pub use assistant::{AskOutcome, AssistantState};
pub use editor::EditorState;
pub use execution::{Action, ExecuteOutcome, ExecutionPhase, ExecutionState};
pub use history::{HistoryOutcome, HistoryState};
pub use navigation::NavOutcome;

/// What the problem pane shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ProblemView {
  #[default]
  Empty,
  Loading,
  Loaded(Problem),
  NotFound { message: String },
}

#[derive(Debug, Default)]
pub struct WorkspaceState {
  /// Route parameter: the id the user asked for, loaded or not.
  pub problem_id: Option<String>,
  pub problem: ProblemView,
  /// Full problem list sorted by serial number; kept across navigation.
  pub catalog: Vec<ProblemSummary>,
  pub editor: EditorState,
  pub execution: ExecutionState,
  pub tab: Tab,
  pub history: HistoryState,
  pub selected_submission: Option<String>,
  pub assistant: AssistantState,
  closed: bool,
}

impl WorkspaceState {
  pub fn loaded_problem(&self) -> Option<&Problem> {
    match &self.problem {
      ProblemView::Loaded(p) => Some(p),
      _ => None,
    }
  }

  /// Index of the current id in the cached list. Derived on every call.
  pub fn catalog_position(&self) -> Option<usize> {
    let id = self.problem_id.as_deref()?;
    self.catalog.iter().position(|p| p.id == id)
  }

  /// Local, possibly stale boundary check for the previous control.
  pub fn can_go_previous(&self) -> bool {
    self.catalog_position().is_some_and(|i| i > 0)
  }

  /// Local, possibly stale boundary check for the next control. An id missing
  /// from the list leaves it enabled; the serial fetch decides.
  pub fn can_go_next(&self) -> bool {
    match self.catalog_position() {
      Some(i) => i + 1 < self.catalog.len(),
      None => !self.catalog.is_empty(),
    }
  }

  pub fn can_shuffle(&self) -> bool {
    !self.catalog.is_empty()
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }
}

#[derive(Clone)]
pub struct Workspace {
  id: Uuid,
  api: Arc<dyn ProblemApi>,
  state: Arc<RwLock<WorkspaceState>>,
  changes: Arc<watch::Sender<u64>>,
}

impl Workspace {
  pub fn new(api: Arc<dyn ProblemApi>) -> Self {
    let (changes, _) = watch::channel(0u64);
    Self { id: Uuid::new_v4(), api, state: Arc::new(RwLock::new(WorkspaceState::default())), changes: Arc::new(changes) }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  /// Receiver whose value changes after every state mutation.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.changes.subscribe()
  }

  /// Read the state under the lock.
  pub async fn view<T>(&self, f: impl FnOnce(&WorkspaceState) -> T) -> T {
    let st = self.state.read().await;
    f(&st)
  }

  fn touch(&self) {
    self.changes.send_modify(|rev| *rev = rev.wrapping_add(1));
  }

  /// Apply `f` unless the workspace is closed, then notify.
  async fn mutate<T>(&self, f: impl FnOnce(&mut WorkspaceState) -> T) -> Result<T, WorkspaceError> {
    let out = {
      let mut st = self.state.write().await;
      if st.closed {
        return Err(WorkspaceError::Closed);
      }
      f(&mut st)
    };
    self.touch();
    Ok(out)
  }

  /// Apply a late completion. `None` when it had to be dropped (closed, or
  /// `still_relevant` says the state moved on).
  async fn complete<T>(
    &self,
    still_relevant: impl FnOnce(&WorkspaceState) -> bool,
    f: impl FnOnce(&mut WorkspaceState) -> T,
  ) -> Option<T> {
    let out = {
      let mut st = self.state.write().await;
      if st.closed {
        debug!(target: "workspace", workspace = %self.id, "Discarding completion for closed workspace");
        return None;
      }
      if !still_relevant(&st) {
        debug!(target: "workspace", workspace = %self.id, "Discarding superseded completion");
        return None;
      }
      f(&mut st)
    };
    self.touch();
    Some(out)
  }

  /// Tear down. Later completions are discarded and mutations fail with `Closed`.
  pub async fn close(&self) {
    self.state.write().await.closed = true;
    info!(target: "workspace", workspace = %self.id, "Workspace closed");
    self.touch();
  }

  /// Load a problem by id together with the full list.
  ///
  /// A failed problem fetch leaves the pane in `NotFound` and returns the error.
  /// A failed list fetch is logged and the previous list kept. The submissions
  /// history is reset because it belongs to the previous id, and fetched again
  /// right away when the submissions tab is showing.
  #[instrument(level = "info", target = "workspace", skip(self), fields(workspace = %self.id))]
  pub async fn open(&self, problem_id: &str) -> Result<(), WorkspaceError> {
    self
      .mutate(|st| {
        st.problem_id = Some(problem_id.to_string());
        st.problem = ProblemView::Loading;
        st.history = HistoryState::NotLoaded;
        st.selected_submission = None;
      })
      .await?;

    let (problem, catalog) = tokio::join!(self.api.problem_by_id(problem_id), self.api.list_problems());

    let current = |st: &WorkspaceState| st.problem_id.as_deref() == Some(problem_id);
    let applied = self
      .complete(current, |st| {
        match catalog {
          Ok(mut list) => {
            list.sort_by_key(|p| p.serial);
            st.catalog = list;
          }
          Err(e) => warn!(target: "workspace", error = %e, "Problem list fetch failed; keeping previous list"),
        }
        match problem {
          Ok(p) => {
            info!(target: "workspace", id = %p.id, serial = ?p.serial, title = %p.title, "Problem loaded");
            st.editor.load(&p);
            st.assistant.greet(&p.title);
            st.problem = ProblemView::Loaded(p);
            Ok(())
          }
          Err(e) => {
            warn!(target: "workspace", error = %e, "Problem fetch failed");
            st.problem = ProblemView::NotFound { message: e.user_message() };
            Err(WorkspaceError::Api(e))
          }
        }
      })
      .await;

    match applied {
      Some(Ok(())) => {
        // Arriving on the submissions tab counts as its first visit for this problem.
        if self.view(|st| st.tab == Tab::Submissions).await {
          self.load_history().await?;
        }
        Ok(())
      }
      Some(Err(e)) => Err(e),
      None if self.view(|st| st.closed).await => Err(WorkspaceError::Closed),
      None => Ok(()),
    }
  }

  /// Switch the left-pane tab. Entering the submissions tab loads the history once.
  #[instrument(level = "debug", target = "workspace", skip(self), fields(workspace = %self.id))]
  pub async fn select_tab(&self, tab: Tab) -> Result<Option<HistoryOutcome>, WorkspaceError> {
    self.mutate(|st| st.tab = tab).await?;
    if tab == Tab::Submissions {
      return self.load_history().await.map(Some);
    }
    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Language;
  use crate::error::ApiError;
  use crate::testing::{problem, FakeApi};

  #[tokio::test]
  async fn open_loads_problem_list_and_buffer() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("b", 2), problem("a", 1), problem("c", 3)]));
    let ws = Workspace::new(api.clone());
    ws.open("b").await.unwrap();

    ws.view(|st| {
      assert_eq!(st.loaded_problem().map(|p| p.id.as_str()), Some("b"));
      let ids: Vec<_> = st.catalog.iter().map(|p| p.id.as_str()).collect();
      assert_eq!(ids, ["a", "b", "c"]);
      assert_eq!(st.catalog_position(), Some(1));
      assert!(st.can_go_previous() && st.can_go_next());
      assert_eq!(st.editor.buffer(), "def solve():\n    pass\n");
      assert_eq!(st.assistant.messages().len(), 1);
    })
    .await;
  }

  #[tokio::test]
  async fn failed_problem_fetch_shows_not_found() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1)]));
    let ws = Workspace::new(api);
    let err = ws.open("missing").await.unwrap_err();
    assert!(matches!(err, WorkspaceError::Api(ApiError::Status { status: 404, .. })));
    ws.view(|st| {
      assert_eq!(st.problem, ProblemView::NotFound { message: "Problem not found".into() });
      assert_eq!(st.problem_id.as_deref(), Some("missing"));
    })
    .await;
  }

  #[tokio::test]
  async fn failed_list_fetch_keeps_previous_list() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1), problem("b", 2)]));
    let ws = Workspace::new(api.clone());
    ws.open("a").await.unwrap();
    api.fail_list(true);
    ws.open("b").await.unwrap();
    ws.view(|st| {
      assert_eq!(st.catalog.len(), 2);
      assert_eq!(st.catalog_position(), Some(1));
    })
    .await;
  }

  #[tokio::test]
  async fn language_survives_navigation_but_buffer_is_reinitialized() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1), problem("b", 2)]));
    let ws = Workspace::new(api);
    ws.open("a").await.unwrap();
    ws.select_language(Language::Cpp).await.unwrap();
    ws.edit("edited").await.unwrap();
    ws.open("b").await.unwrap();
    ws.view(|st| {
      assert_eq!(st.editor.language(), Language::Cpp);
      assert_eq!(st.editor.buffer(), "int main() { return 0; }");
    })
    .await;
  }

  #[tokio::test]
  async fn boundary_flags_at_list_edges() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1), problem("b", 2)]));
    let ws = Workspace::new(api);
    ws.open("a").await.unwrap();
    ws.view(|st| assert!(!st.can_go_previous() && st.can_go_next())).await;
    ws.open("b").await.unwrap();
    ws.view(|st| assert!(st.can_go_previous() && !st.can_go_next())).await;
  }

  #[tokio::test]
  async fn closed_workspace_rejects_mutations_and_notifies() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1)]));
    let ws = Workspace::new(api);
    let mut changes = ws.subscribe();
    ws.close().await;
    assert!(changes.has_changed().unwrap());
    changes.borrow_and_update();
    assert!(matches!(ws.open("a").await, Err(WorkspaceError::Closed)));
    assert!(matches!(ws.edit("x").await, Err(WorkspaceError::Closed)));
    assert!(!changes.has_changed().unwrap());
  }

  #[tokio::test]
  async fn every_mutation_bumps_the_revision() {
    let api = Arc::new(FakeApi::with_problems(vec![problem("a", 1)]));
    let ws = Workspace::new(api);
    let changes = ws.subscribe();
    let before = *changes.borrow();
    ws.open("a").await.unwrap();
    ws.edit("x").await.unwrap();
    assert!(*changes.borrow() >= before + 3);
  }
}
