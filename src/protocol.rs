//! Wire protocol between the host and a UI: WebSocket messages, the workspace
//! snapshot, and HTTP DTOs. Keep this small and stable so host and UI can
//! evolve separately.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
  ChatMessage, Difficulty, Language, Problem, ResultTab, RunResult, Submission, Tab, TestCase, Verdict,
};
use crate::theme::ThemeMode;
use crate::workspace::{Action, ExecutionPhase, HistoryState, ProblemView, WorkspaceState};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  Open {
    #[serde(rename = "problemId")]
    problem_id: String,
  },
  /// Display name or backend id; validated against the fixed table.
  SelectLanguage { language: String },
  Edit { code: String },
  Reset,
  Run,
  Submit,
  Previous,
  Next,
  Shuffle,
  SelectTab { tab: Tab },
  SelectResultTab { tab: ResultTab },
  ViewSubmission {
    #[serde(default, rename = "submissionId")]
    submission_id: Option<String>,
  },
  AskAssistant { text: String },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  Workspace { workspace: WorkspaceOut },
  Navigated {
    #[serde(rename = "problemId")]
    problem_id: String,
  },
  Error { message: String },
}

/// Full snapshot of one workspace, pushed after every change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceOut {
  pub id: Uuid,
  pub problem_id: Option<String>,
  pub problem: ProblemPaneOut,
  pub position: Option<PositionOut>,
  pub can_go_previous: bool,
  pub can_go_next: bool,
  pub can_shuffle: bool,
  pub editor: EditorOut,
  pub execution: ExecutionOut,
  pub tab: Tab,
  pub history: HistoryOut,
  pub selected_submission: Option<Submission>,
  pub assistant: AssistantOut,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProblemPaneOut {
  Empty,
  Loading,
  Loaded { problem: ProblemOut },
  NotFound { message: String },
}

/// Public view of a problem. Hidden test cases never leave the host.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemOut {
  pub id: String,
  pub title: String,
  pub serial: Option<u32>,
  pub description: String,
  pub difficulty: Difficulty,
  pub tags: Vec<String>,
  pub starter_code: BTreeMap<Language, String>,
  pub reference_solutions: BTreeMap<Language, String>,
  pub visible_tests: Vec<TestCase>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PositionOut {
  /// 1-based.
  pub index: usize,
  pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorOut {
  pub language: Language,
  pub languages: Vec<Language>,
  pub buffer: String,
  pub dirty: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOut {
  pub phase: ExecutionPhase,
  pub in_flight: bool,
  pub last_action: Option<Action>,
  pub result_tab: ResultTab,
  pub result: Option<RunResultOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResultOut {
  pub success: bool,
  pub verdict: Verdict,
  pub verdict_label: &'static str,
  pub error_message: Option<String>,
  pub passed: usize,
  pub total: usize,
  pub cases: Vec<CaseOut>,
}

/// One judged case next to the visible test at the same position, if any.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOut {
  pub input: Option<String>,
  pub expected: Option<String>,
  pub stdout: Option<String>,
  pub stderr: Option<String>,
  pub status: String,
  pub passed: bool,
  pub compile_error: bool,
  pub time: Option<f64>,
  pub memory: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOut {
  pub state: &'static str,
  pub submissions: Vec<Submission>,
  pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOut {
  pub messages: Vec<ChatMessage>,
  pub pending: bool,
}

pub fn workspace_out(id: Uuid, st: &WorkspaceState) -> WorkspaceOut {
  let visible = st.loaded_problem().map(|p| p.visible_tests.as_slice()).unwrap_or(&[]);
  let history = match &st.history {
    HistoryState::NotLoaded => HistoryOut { state: "not_loaded", submissions: Vec::new(), error: None },
    HistoryState::Loading => HistoryOut { state: "loading", submissions: Vec::new(), error: None },
    HistoryState::Loaded(list) => HistoryOut { state: "loaded", submissions: list.clone(), error: None },
    HistoryState::Failed(msg) => HistoryOut { state: "failed", submissions: Vec::new(), error: Some(msg.clone()) },
  };
  let selected_submission = st
    .selected_submission
    .as_deref()
    .and_then(|sid| st.history.submissions().iter().find(|s| s.id == sid).cloned());

  WorkspaceOut {
    id,
    problem_id: st.problem_id.clone(),
    problem: match &st.problem {
      ProblemView::Empty => ProblemPaneOut::Empty,
      ProblemView::Loading => ProblemPaneOut::Loading,
      ProblemView::Loaded(p) => ProblemPaneOut::Loaded { problem: problem_out(p) },
      ProblemView::NotFound { message } => ProblemPaneOut::NotFound { message: message.clone() },
    },
    position: st.catalog_position().map(|i| PositionOut { index: i + 1, total: st.catalog.len() }),
    can_go_previous: st.can_go_previous(),
    can_go_next: st.can_go_next(),
    can_shuffle: st.can_shuffle(),
    editor: EditorOut {
      language: st.editor.language(),
      languages: Language::ALL.to_vec(),
      buffer: st.editor.buffer().to_string(),
      dirty: st.editor.is_dirty(),
    },
    execution: ExecutionOut {
      phase: st.execution.phase(),
      in_flight: st.execution.in_flight(),
      last_action: st.execution.last_action(),
      result_tab: st.execution.result_tab(),
      result: st.execution.result().map(|r| run_result_out(r, visible)),
    },
    tab: st.tab,
    history,
    selected_submission,
    assistant: AssistantOut { messages: st.assistant.messages().to_vec(), pending: st.assistant.pending() },
  }
}

fn problem_out(p: &Problem) -> ProblemOut {
  ProblemOut {
    id: p.id.clone(),
    title: p.title.clone(),
    serial: p.serial,
    description: p.description.clone(),
    difficulty: p.difficulty,
    tags: p.tags.clone(),
    starter_code: p.starter_code.clone(),
    reference_solutions: p.reference_solutions.clone(),
    visible_tests: p.visible_tests.clone(),
  }
}

fn run_result_out(r: &RunResult, visible: &[TestCase]) -> RunResultOut {
  let cases = r
    .test_cases
    .iter()
    .enumerate()
    .map(|(i, tc)| CaseOut {
      input: visible.get(i).map(|t| t.input.clone()),
      expected: visible.get(i).map(|t| t.output.clone()),
      stdout: tc.stdout.clone(),
      stderr: tc.stderr.clone(),
      status: tc.status_label().to_string(),
      passed: tc.passed(),
      compile_error: tc.is_compile_error(),
      time: tc.time,
      memory: tc.memory,
    })
    .collect();
  RunResultOut {
    success: r.success,
    verdict: r.verdict(),
    verdict_label: r.verdict().label(),
    error_message: r.error_message.clone(),
    passed: r.passed_count(),
    total: r.test_cases.len(),
    cases,
  }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ThemeOut {
  pub mode: ThemeMode,
}

#[derive(Deserialize)]
pub struct ThemeIn {
  pub mode: ThemeMode,
}
