//! HTTP gateway to the practice backend.
//!
//! All calls share one `reqwest::Client` with a cookie store, so the session
//! cookie set by login travels with every later request. Responses are decoded
//! into wire records and validated into domain types here; nothing past this
//! module sees raw JSON.
//!
//! NOTE: submitted source code and credentials are never logged; only sizes and
//! truncated error bodies.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::config::ApiConfig;
use crate::domain::{
  ChatMessage, ChatRole, HiddenTestCase, JudgeStatus, Language, Problem, ProblemSummary, RunResult, Submission,
  TestCase, TestCaseOutcome, User,
};
use crate::error::ApiError;
use crate::util::trunc_for_log;

/// Problem, judge, history and assistant endpoints used by the workspace.
#[async_trait]
pub trait ProblemApi: Send + Sync {
  async fn problem_by_id(&self, id: &str) -> Result<Problem, ApiError>;
  async fn problem_by_serial(&self, serial: u32) -> Result<Problem, ApiError>;
  async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ApiError>;
  async fn run(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError>;
  async fn submit(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError>;
  async fn submissions(&self, problem_id: &str) -> Result<Vec<Submission>, ApiError>;
  async fn assistant_reply(&self, body: &AssistantRequest) -> Result<String, ApiError>;
}

/// Cookie-session endpoints backing the auth store.
#[async_trait]
pub trait AuthApi: Send + Sync {
  async fn check_session(&self) -> Result<Option<User>, ApiError>;
  async fn login(&self, credentials: &Credentials) -> Result<Option<User>, ApiError>;
  async fn register(&self, registration: &Registration) -> Result<Option<User>, ApiError>;
  async fn logout(&self) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = reqwest::Client::builder()
      .cookie_store(true)
      .user_agent(cfg.user_agent.clone())
      .default_headers(headers);
    if let Some(secs) = cfg.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|e| ApiError::Transport(e.to_string()))?;

    Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Send and turn non-2xx into `ApiError::Status` with the body's `message`.
  async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
    let res = req.send().await?;
    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let message = extract_backend_message(&body);
      warn!(target: "gateway", status = status.as_u16(), body = %trunc_for_log(&body, 200), "Backend returned error status");
      return Err(ApiError::Status { status: status.as_u16(), message });
    }
    Ok(res)
  }

  async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
    let body = res.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| {
      warn!(target: "gateway", error = %e, body = %trunc_for_log(&body, 200), "Response did not match schema");
      ApiError::Decode(e.to_string())
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
    let res = self.send(req).await?;
    Self::decode(res).await
  }

  async fn particular_problem(&self, by: &str, value: &str) -> Result<Problem, ApiError> {
    let req = self
      .client
      .get(self.url("/problem/getParticularProblem"))
      .query(&[("by", by), ("value", value)]);
    let record: ProblemRecord = self.get_json(req).await?;
    Problem::try_from(record)
  }

  async fn judge(&self, path: String, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    let req = self.client.post(self.url(&path)).json(body);
    let record: RunResultRecord = self.get_json(req).await?;
    Ok(record.into())
  }
}

#[async_trait]
impl ProblemApi for ApiClient {
  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn problem_by_id(&self, id: &str) -> Result<Problem, ApiError> {
    self.particular_problem("id", id).await
  }

  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn problem_by_serial(&self, serial: u32) -> Result<Problem, ApiError> {
    self.particular_problem("serial", &serial.to_string()).await
  }

  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ApiError> {
    let req = self.client.get(self.url("/problem/getAllProblem"));
    let records: Vec<ProblemSummaryRecord> = self.get_json(req).await?;
    let list: Vec<ProblemSummary> = records.into_iter().map(ProblemSummary::from).collect();
    debug!(target: "gateway", count = list.len(), "Problem list fetched");
    Ok(list)
  }

  #[instrument(level = "info", target = "gateway", skip(self, body), fields(language = %body.language, code_len = body.code.len()))]
  async fn run(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    self.judge(format!("/submission/run/{problem_id}"), body).await
  }

  #[instrument(level = "info", target = "gateway", skip(self, body), fields(language = %body.language, code_len = body.code.len()))]
  async fn submit(&self, problem_id: &str, body: &CodeSubmission) -> Result<RunResult, ApiError> {
    self.judge(format!("/submission/submit/{problem_id}"), body).await
  }

  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn submissions(&self, problem_id: &str) -> Result<Vec<Submission>, ApiError> {
    let req = self.client.get(self.url(&format!("/problem/submittedProblem/{problem_id}")));
    let payload: SubmissionsPayload = self.get_json(req).await?;
    Ok(payload.into_submissions())
  }

  #[instrument(level = "info", target = "gateway", skip(self, body), fields(turns = body.messages.len()))]
  async fn assistant_reply(&self, body: &AssistantRequest) -> Result<String, ApiError> {
    let req = self.client.post(self.url("/ai/chat")).json(body);
    let reply: AssistantReply = self.get_json(req).await?;
    Ok(reply.message)
  }
}

#[async_trait]
impl AuthApi for ApiClient {
  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn check_session(&self) -> Result<Option<User>, ApiError> {
    let env: UserEnvelope = self.get_json(self.client.get(self.url("/user/check"))).await?;
    Ok(env.user.map(User::from))
  }

  #[instrument(level = "info", target = "gateway", skip(self, credentials))]
  async fn login(&self, credentials: &Credentials) -> Result<Option<User>, ApiError> {
    let req = self.client.post(self.url("/user/login")).json(credentials);
    let env: UserEnvelope = self.get_json(req).await?;
    Ok(env.user.map(User::from))
  }

  #[instrument(level = "info", target = "gateway", skip(self, registration))]
  async fn register(&self, registration: &Registration) -> Result<Option<User>, ApiError> {
    let req = self.client.post(self.url("/user/register")).json(registration);
    let env: UserEnvelope = self.get_json(req).await?;
    Ok(env.user.map(User::from))
  }

  #[instrument(level = "info", target = "gateway", skip(self))]
  async fn logout(&self) -> Result<(), ApiError> {
    self.send(self.client.post(self.url("/user/logout"))).await?;
    Ok(())
  }
}

// --- Request DTOs ---

/// Body of run/submit. `language` is the backend identifier, never the display name.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CodeSubmission {
  pub language: String,
  pub code: String,
}

impl CodeSubmission {
  pub fn new(language: Language, code: impl Into<String>) -> Self {
    Self { language: language.backend_id().to_string(), code: code.into() }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
  #[serde(rename = "emailID")]
  pub email_id: String,
  pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registration {
  #[serde(rename = "firstName")]
  pub first_name: String,
  #[serde(rename = "emailID")]
  pub email_id: String,
  pub password: String,
  pub otp: String,
}

/// Transcript plus problem context sent to the assistant endpoint.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
  pub messages: Vec<ChatTurn>,
  pub title: String,
  pub description: String,
  pub test_cases: Vec<TestCase>,
  pub start_code: Vec<StarterCodeRecord>,
}

impl AssistantRequest {
  pub fn new(problem: &Problem, transcript: &[ChatMessage]) -> Self {
    Self {
      messages: transcript.iter().map(ChatTurn::from).collect(),
      title: problem.title.clone(),
      description: problem.description.clone(),
      test_cases: problem.visible_tests.clone(),
      start_code: problem
        .starter_code
        .iter()
        .map(|(lang, code)| StarterCodeRecord { language: lang.display_name().to_string(), initial_code: code.clone() })
        .collect(),
    }
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatTurn {
  pub role: ChatRole,
  pub parts: Vec<ChatPart>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatPart {
  pub text: String,
}

impl From<&ChatMessage> for ChatTurn {
  fn from(m: &ChatMessage) -> Self {
    Self { role: m.role, parts: vec![ChatPart { text: m.text.clone() }] }
  }
}

// --- Wire records ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StarterCodeRecord {
  pub language: String,
  #[serde(default)]
  pub initial_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceSolutionRecord {
  language: String,
  #[serde(default)]
  complete_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemRecord {
  #[serde(rename = "_id")]
  id: String,
  #[serde(default)]
  title: String,
  #[serde(default, rename = "serial_number", alias = "serialNumber", deserialize_with = "lenient_u32")]
  serial: Option<u32>,
  #[serde(default)]
  description: String,
  #[serde(default)]
  difficulty: String,
  #[serde(default)]
  tags: Vec<String>,
  #[serde(default)]
  start_code: Vec<StarterCodeRecord>,
  #[serde(default)]
  reference_solution: Vec<ReferenceSolutionRecord>,
  #[serde(default)]
  visible_test_cases: Vec<TestCase>,
  #[serde(default)]
  hidden_test_cases: Vec<HiddenTestCase>,
}

impl TryFrom<ProblemRecord> for Problem {
  type Error = ApiError;

  fn try_from(r: ProblemRecord) -> Result<Self, Self::Error> {
    let difficulty = r.difficulty.parse().map_err(|e| ApiError::Decode(format!("problem {}: {e}", r.id)))?;
    let starter_code = by_language(&r.id, r.start_code.into_iter().map(|s| (s.language, s.initial_code)));
    let reference_solutions =
      by_language(&r.id, r.reference_solution.into_iter().map(|s| (s.language, s.complete_code)));
    Ok(Problem {
      id: r.id,
      title: r.title,
      serial: r.serial,
      description: r.description,
      difficulty,
      tags: r.tags,
      starter_code,
      reference_solutions,
      visible_tests: r.visible_test_cases,
      hidden_tests: r.hidden_test_cases,
    })
  }
}

/// Keep entries for languages in the fixed table; drop the rest.
fn by_language(problem_id: &str, entries: impl Iterator<Item = (String, String)>) -> BTreeMap<Language, String> {
  let mut out = BTreeMap::new();
  for (label, code) in entries {
    match Language::from_label(&label) {
      Some(lang) => {
        out.insert(lang, code);
      }
      None => debug!(target: "gateway", %problem_id, %label, "Dropping code for unsupported language"),
    }
  }
  out
}

#[derive(Deserialize)]
struct ProblemSummaryRecord {
  #[serde(rename = "_id")]
  id: String,
  #[serde(default)]
  title: String,
  #[serde(default, rename = "serial_number", alias = "serialNumber", deserialize_with = "lenient_u32")]
  serial: Option<u32>,
  #[serde(default)]
  difficulty: String,
  #[serde(default)]
  tags: Vec<String>,
}

impl From<ProblemSummaryRecord> for ProblemSummary {
  fn from(r: ProblemSummaryRecord) -> Self {
    Self { difficulty: r.difficulty.parse().ok(), id: r.id, title: r.title, serial: r.serial, tags: r.tags }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunResultRecord {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  error_message: Option<String>,
  #[serde(default)]
  test_cases: Vec<TestCaseOutcomeRecord>,
}

#[derive(Deserialize)]
struct TestCaseOutcomeRecord {
  #[serde(default)]
  status: Option<JudgeStatus>,
  #[serde(default)]
  stdout: Option<String>,
  #[serde(default)]
  stderr: Option<String>,
  #[serde(default, deserialize_with = "lenient_f64")]
  time: Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  memory: Option<f64>,
}

impl From<RunResultRecord> for RunResult {
  fn from(r: RunResultRecord) -> Self {
    RunResult {
      success: r.success,
      error_message: r.error_message.filter(|m| !m.is_empty()),
      test_cases: r
        .test_cases
        .into_iter()
        .map(|tc| TestCaseOutcome { status: tc.status, stdout: tc.stdout, stderr: tc.stderr, time: tc.time, memory: tc.memory })
        .collect(),
    }
  }
}

/// The history endpoint answers with a bare string when there is nothing to show.
#[derive(Deserialize)]
#[serde(untagged)]
enum SubmissionsPayload {
  Listing { submissions: Vec<SubmissionRecord> },
  Notice(String),
}

impl SubmissionsPayload {
  fn into_submissions(self) -> Vec<Submission> {
    match self {
      SubmissionsPayload::Listing { submissions } => submissions.into_iter().map(Submission::from).collect(),
      SubmissionsPayload::Notice(text) => {
        debug!(target: "gateway", notice = %trunc_for_log(&text, 80), "No submissions listed");
        Vec::new()
      }
    }
  }
}

#[derive(Deserialize)]
struct SubmissionRecord {
  #[serde(default)]
  submission_id: Option<String>,
  #[serde(default, rename = "_id")]
  document_id: Option<String>,
  #[serde(default)]
  status: String,
  #[serde(default)]
  language: String,
  #[serde(default, deserialize_with = "lenient_f64")]
  runtime: Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  memory: Option<f64>,
  #[serde(default)]
  code: String,
  #[serde(default)]
  submitted_at: Option<String>,
  #[serde(default, rename = "createdAt")]
  created_at: Option<String>,
  #[serde(default, rename = "testCasesPassed", deserialize_with = "lenient_u32")]
  test_cases_passed: Option<u32>,
  #[serde(default, rename = "testCasesTotal", deserialize_with = "lenient_u32")]
  test_cases_total: Option<u32>,
}

impl From<SubmissionRecord> for Submission {
  fn from(r: SubmissionRecord) -> Self {
    // Listings may carry both key spellings; the explicit ones win.
    let id = r.submission_id.or(r.document_id).unwrap_or_default();
    let stamp = r.submitted_at.or(r.created_at);
    let submitted_at = stamp.as_deref().and_then(|s| match OffsetDateTime::parse(s, &Rfc3339) {
      Ok(t) => Some(t),
      Err(e) => {
        debug!(target: "gateway", %id, value = %s, error = %e, "Unparseable submission timestamp");
        None
      }
    });
    Submission {
      id,
      status: r.status,
      language: r.language,
      runtime: r.runtime,
      memory: r.memory,
      code: r.code,
      submitted_at,
      test_cases_passed: r.test_cases_passed,
      test_cases_total: r.test_cases_total,
    }
  }
}

#[derive(Deserialize)]
struct UserEnvelope {
  #[serde(default)]
  user: Option<UserRecord>,
}

#[derive(Deserialize)]
struct UserRecord {
  #[serde(default, rename = "_id")]
  id: String,
  #[serde(default, rename = "firstName")]
  first_name: String,
  #[serde(default, rename = "emailID")]
  email_id: String,
  #[serde(default)]
  role: Option<String>,
}

impl From<UserRecord> for User {
  fn from(r: UserRecord) -> Self {
    User { id: r.id, first_name: r.first_name, email_id: r.email_id, role: r.role }
  }
}

#[derive(Deserialize)]
struct AssistantReply {
  message: String,
}

/// Numbers arrive either as JSON numbers or numeric strings ("0.004").
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
  let value = Option::<serde_json::Value>::deserialize(d)?;
  Ok(match value {
    Some(serde_json::Value::Number(n)) => n.as_f64(),
    Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
    _ => None,
  })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
  let value = Option::<serde_json::Value>::deserialize(d)?;
  Ok(match value {
    Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
    Some(serde_json::Value::String(s)) => s.trim().parse::<u32>().ok(),
    _ => None,
  })
}

/// Pull `message` out of an error body, if it is JSON and has one.
fn extract_backend_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct ErrorBody {
    message: Option<String>,
  }
  serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.message).filter(|m| !m.trim().is_empty())
}
