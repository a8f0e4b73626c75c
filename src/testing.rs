//! In-memory backend fakes and fixtures shared by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::domain::{
  Difficulty, JudgeStatus, Language, Problem, ProblemSummary, RunResult, Submission, TestCase, TestCaseOutcome, User,
};
use crate::error::ApiError;
use crate::gateway::{AssistantRequest, AuthApi, CodeSubmission, Credentials, ProblemApi, Registration};
use crate::workspace::{Workspace, WorkspaceState};

pub(crate) fn problem(id: &str, serial: u32) -> Problem {
  let mut starter_code = BTreeMap::new();
  starter_code.insert(Language::Python, "def solve():\n    pass\n".to_string());
  starter_code.insert(Language::Cpp, "int main() { return 0; }".to_string());
  Problem {
    id: id.to_string(),
    title: format!("Problem {id}"),
    serial: Some(serial),
    description: "Add two numbers.".into(),
    difficulty: Difficulty::Easy,
    tags: vec!["math".into()],
    starter_code,
    reference_solutions: BTreeMap::new(),
    visible_tests: vec![
      TestCase { input: "1 2".into(), output: "3".into(), explanation: Some("1 + 2".into()) },
      TestCase { input: "2 2".into(), output: "4".into(), explanation: None },
    ],
    hidden_tests: Vec::new(),
  }
}

pub(crate) fn accepted_result() -> RunResult {
  let case = TestCaseOutcome {
    status: Some(JudgeStatus { id: JudgeStatus::ACCEPTED, description: "Accepted".into() }),
    stdout: Some("3".into()),
    stderr: None,
    time: Some(0.01),
    memory: Some(512.0),
  };
  RunResult { success: true, error_message: None, test_cases: vec![case.clone(), case] }
}

pub(crate) fn submission(id: &str, at: &str) -> Submission {
  Submission {
    id: id.to_string(),
    status: "accepted".into(),
    language: "python".into(),
    runtime: Some(0.1),
    memory: Some(256.0),
    code: "print(3)".into(),
    submitted_at: OffsetDateTime::parse(at, &Rfc3339).ok(),
    test_cases_passed: Some(2),
    test_cases_total: Some(2),
  }
}

pub(crate) fn user(name: &str) -> User {
  User { id: format!("u-{name}"), first_name: name.to_string(), email_id: format!("{name}@example.com"), role: None }
}

/// Yield until `pred` holds on the workspace state.
pub(crate) async fn wait_until(ws: &Workspace, pred: impl Fn(&WorkspaceState) -> bool) {
  for _ in 0..10_000 {
    if ws.view(&pred).await {
      return;
    }
    tokio::task::yield_now().await;
  }
  panic!("workspace never reached the expected state");
}

fn not_found() -> ApiError {
  ApiError::Status { status: 404, message: Some("Problem not found".into()) }
}

#[derive(Default)]
pub(crate) struct FakeApi {
  problems: Mutex<Vec<Problem>>,
  forgotten_serials: Mutex<HashSet<u32>>,
  serial_requests: Mutex<Vec<u32>>,
  list_fails: Mutex<bool>,
  judge_error: Mutex<Option<ApiError>>,
  judge_gate: Mutex<Option<Arc<Notify>>>,
  last_judged: Mutex<Option<(String, CodeSubmission)>>,
  run_calls: AtomicUsize,
  submit_calls: AtomicUsize,
  submissions: Mutex<Option<Result<Vec<Submission>, ApiError>>>,
  submissions_gate: Mutex<Option<Arc<Notify>>>,
  submissions_calls: AtomicUsize,
  assistant_fails: Mutex<bool>,
  assistant_gate: Mutex<Option<Arc<Notify>>>,
  last_assistant: Mutex<Option<AssistantRequest>>,
  pub(crate) session_user: Mutex<Option<User>>,
  pub(crate) auth_error: Mutex<Option<ApiError>>,
  pub(crate) logout_calls: AtomicUsize,
}

impl FakeApi {
  pub(crate) fn with_problems(problems: Vec<Problem>) -> Self {
    Self { problems: Mutex::new(problems), ..Default::default() }
  }

  pub(crate) fn fail_list(&self, fail: bool) {
    *self.list_fails.lock().unwrap() = fail;
  }

  pub(crate) fn forget_serial(&self, serial: u32) {
    self.forgotten_serials.lock().unwrap().insert(serial);
  }

  pub(crate) fn serial_requests(&self) -> Vec<u32> {
    self.serial_requests.lock().unwrap().clone()
  }

  pub(crate) fn fail_judge(&self, err: ApiError) {
    *self.judge_error.lock().unwrap() = Some(err);
  }

  /// Judge calls wait on the returned notify until released.
  pub(crate) fn hold_judge(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.judge_gate.lock().unwrap() = Some(gate.clone());
    gate
  }

  pub(crate) fn hold_submissions(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.submissions_gate.lock().unwrap() = Some(gate.clone());
    gate
  }

  pub(crate) fn hold_assistant(&self) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *self.assistant_gate.lock().unwrap() = Some(gate.clone());
    gate
  }

  pub(crate) fn last_judged(&self) -> Option<(String, CodeSubmission)> {
    self.last_judged.lock().unwrap().clone()
  }

  pub(crate) fn run_calls(&self) -> usize {
    self.run_calls.load(Ordering::SeqCst)
  }

  pub(crate) fn submit_calls(&self) -> usize {
    self.submit_calls.load(Ordering::SeqCst)
  }

  pub(crate) fn set_submissions(&self, result: Result<Vec<Submission>, ApiError>) {
    *self.submissions.lock().unwrap() = Some(result);
  }

  pub(crate) fn submissions_calls(&self) -> usize {
    self.submissions_calls.load(Ordering::SeqCst)
  }

  pub(crate) fn fail_assistant(&self, fail: bool) {
    *self.assistant_fails.lock().unwrap() = fail;
  }

  pub(crate) fn last_assistant_request(&self) -> Option<AssistantRequest> {
    self.last_assistant.lock().unwrap().clone()
  }

  async fn judge(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    *self.last_judged.lock().unwrap() = Some((problem_id.to_string(), body.clone()));
    let gate = self.judge_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    match self.judge_error.lock().unwrap().clone() {
      Some(e) => Err(e),
      None => Ok(accepted_result()),
    }
  }

  fn auth_result(&self) -> Result<Option<User>, ApiError> {
    match self.auth_error.lock().unwrap().clone() {
      Some(e) => Err(e),
      None => Ok(self.session_user.lock().unwrap().clone()),
    }
  }
}

#[async_trait]
impl ProblemApi for FakeApi {
  async fn problem_by_id(&self, id: &str) -> Result<Problem, ApiError> {
    self.problems.lock().unwrap().iter().find(|p| p.id == id).cloned().ok_or_else(not_found)
  }

  async fn problem_by_serial(&self, serial: u32) -> Result<Problem, ApiError> {
    self.serial_requests.lock().unwrap().push(serial);
    if self.forgotten_serials.lock().unwrap().contains(&serial) {
      return Err(not_found());
    }
    self.problems.lock().unwrap().iter().find(|p| p.serial == Some(serial)).cloned().ok_or_else(not_found)
  }

  async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ApiError> {
    if *self.list_fails.lock().unwrap() {
      return Err(ApiError::Transport("list unavailable".into()));
    }
    Ok(
      self
        .problems
        .lock()
        .unwrap()
        .iter()
        .map(|p| ProblemSummary {
          id: p.id.clone(),
          title: p.title.clone(),
          serial: p.serial,
          difficulty: Some(p.difficulty),
          tags: p.tags.clone(),
        })
        .collect(),
    )
  }

  async fn run(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    self.run_calls.fetch_add(1, Ordering::SeqCst);
    self.judge(problem_id, body).await
  }

  async fn submit(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    self.submit_calls.fetch_add(1, Ordering::SeqCst);
    self.judge(problem_id, body).await
  }

  async fn submissions(&self, _problem_id: &str) -> Result<Vec<Submission>, ApiError> {
    self.submissions_calls.fetch_add(1, Ordering::SeqCst);
    let gate = self.submissions_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    self.submissions.lock().unwrap().clone().unwrap_or_else(|| Ok(Vec::new()))
  }

  async fn assistant_reply(&self, body: &AssistantRequest) -> Result<String, ApiError> {
    *self.last_assistant.lock().unwrap() = Some(body.clone());
    let gate = self.assistant_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    if *self.assistant_fails.lock().unwrap() {
      return Err(ApiError::Status { status: 503, message: None });
    }
    Ok("Try a hash map.".into())
  }
}

#[async_trait]
impl AuthApi for FakeApi {
  async fn check_session(&self) -> Result<Option<User>, ApiError> {
    self.auth_result()
  }

  async fn login(&self, _credentials: &Credentials) -> Result<Option<User>, ApiError> {
    self.auth_result()
  }

  async fn register(&self, _registration: &Registration) -> Result<Option<User>, ApiError> {
    self.auth_result()
  }

  async fn logout(&self) -> Result<(), ApiError> {
    self.logout_calls.fetch_add(1, Ordering::SeqCst);
    match self.auth_error.lock().unwrap().clone() {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }
}
