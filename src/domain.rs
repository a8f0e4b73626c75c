//! Domain models used by the workspace: problems, languages, judge results, submissions, users.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::WorkspaceError;

/// Fixed difficulty scale of the problem set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(format!("unknown difficulty '{other}'")),
    }
  }
}

/// Languages offered by the editor.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
  #[default]
  Python,
  #[serde(rename = "C++")]
  Cpp,
  Java,
  JavaScript,
}

impl Language {
  pub const ALL: [Language; 4] = [Language::Python, Language::Cpp, Language::Java, Language::JavaScript];

  pub fn display_name(self) -> &'static str {
    match self {
      Language::Python => "Python",
      Language::Cpp => "C++",
      Language::Java => "Java",
      Language::JavaScript => "JavaScript",
    }
  }

  /// Identifier the judge backend expects in run/submit bodies.
  pub fn backend_id(self) -> &'static str {
    match self {
      Language::Python => "python",
      Language::Cpp => "c++",
      Language::Java => "java",
      Language::JavaScript => "javascript",
    }
  }

  /// Match a label as found in problem records ("C++", "Javascript", "python", ...).
  pub fn from_label(label: &str) -> Option<Language> {
    let label = label.trim();
    Self::ALL
      .into_iter()
      .find(|l| l.display_name().eq_ignore_ascii_case(label) || l.backend_id().eq_ignore_ascii_case(label))
  }

  /// Editor content used when a problem has no starter code for this language.
  pub fn starter_placeholder(self) -> String {
    format!("// No starter code available for {}", self.display_name())
  }
}

impl FromStr for Language {
  type Err = WorkspaceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Language::from_label(s).ok_or_else(|| WorkspaceError::UnsupportedLanguage(s.to_string()))
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.display_name())
  }
}

/// Example shown to the user, with the expected output.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
  #[serde(default)]
  pub input: String,
  #[serde(default)]
  pub output: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

/// Grading-only case. Kept on the record, never surfaced to the UI.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HiddenTestCase {
  #[serde(default)]
  pub input: String,
  #[serde(default)]
  pub output: String,
}

/// A problem as read by the workspace. Read-only from this side.
#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
  pub id: String,
  pub title: String,
  /// Dense ordering key used by previous/next. `None` when the record has none.
  pub serial: Option<u32>,
  pub description: String,
  pub difficulty: Difficulty,
  pub tags: Vec<String>,
  pub starter_code: BTreeMap<Language, String>,
  pub reference_solutions: BTreeMap<Language, String>,
  pub visible_tests: Vec<TestCase>,
  pub hidden_tests: Vec<HiddenTestCase>,
}

/// Entry of the full problem list, used for position and shuffle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProblemSummary {
  pub id: String,
  pub title: String,
  pub serial: Option<u32>,
  pub difficulty: Option<Difficulty>,
  pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct JudgeStatus {
  #[serde(default)]
  pub id: u32,
  #[serde(default)]
  pub description: String,
}

impl JudgeStatus {
  pub const ACCEPTED: u32 = 3;
  pub const COMPILATION_ERROR: u32 = 6;
}

/// Outcome of one test case, aligned by position with the problem's visible tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestCaseOutcome {
  pub status: Option<JudgeStatus>,
  pub stdout: Option<String>,
  pub stderr: Option<String>,
  /// Seconds.
  pub time: Option<f64>,
  /// Kilobytes.
  pub memory: Option<f64>,
}

impl TestCaseOutcome {
  pub fn passed(&self) -> bool {
    self.status.as_ref().is_some_and(|s| s.id == JudgeStatus::ACCEPTED)
  }

  pub fn is_compile_error(&self) -> bool {
    self.status.as_ref().is_some_and(|s| s.id == JudgeStatus::COMPILATION_ERROR)
  }

  pub fn status_label(&self) -> &str {
    self.status.as_ref().map(|s| s.description.as_str()).filter(|d| !d.is_empty()).unwrap_or("Unknown")
  }
}

/// Result of one run or submit call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunResult {
  pub success: bool,
  pub error_message: Option<String>,
  pub test_cases: Vec<TestCaseOutcome>,
}

impl RunResult {
  /// Displayable stand-in for a call that never produced a payload.
  pub fn failure(message: impl Into<String>) -> Self {
    Self { success: false, error_message: Some(message.into()), test_cases: Vec::new() }
  }

  pub fn verdict(&self) -> Verdict {
    if self.success {
      Verdict::Accepted
    } else if self.error_message.as_deref().is_some_and(|m| !m.is_empty()) {
      Verdict::Error
    } else {
      Verdict::WrongAnswer
    }
  }

  pub fn passed_count(&self) -> usize {
    self.test_cases.iter().filter(|tc| tc.passed()).count()
  }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Accepted,
  Error,
  WrongAnswer,
}

impl Verdict {
  pub fn label(self) -> &'static str {
    match self {
      Verdict::Accepted => "Accepted",
      Verdict::Error => "Error",
      Verdict::WrongAnswer => "Wrong Answer",
    }
  }
}

/// One past submission of the current user.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub id: String,
  pub status: String,
  pub language: String,
  pub runtime: Option<f64>,
  pub memory: Option<f64>,
  pub code: String,
  #[serde(with = "time::serde::rfc3339::option")]
  pub submitted_at: Option<OffsetDateTime>,
  pub test_cases_passed: Option<u32>,
  pub test_cases_total: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: String,
  pub first_name: String,
  pub email_id: String,
  pub role: Option<String>,
}

/// Left-pane tabs of the workspace.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
  #[default]
  Description,
  Editorial,
  Solutions,
  Submissions,
  Assistant,
}

/// Bottom-pane tabs under the editor.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultTab {
  #[default]
  Testcase,
  Result,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
  User,
  Model,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
  pub role: ChatRole,
  pub text: String,
  #[serde(with = "time::serde::rfc3339")]
  pub timestamp: OffsetDateTime,
  pub is_error: bool,
}

impl ChatMessage {
  pub fn user(text: impl Into<String>) -> Self {
    Self { role: ChatRole::User, text: text.into(), timestamp: OffsetDateTime::now_utc(), is_error: false }
  }

  pub fn model(text: impl Into<String>) -> Self {
    Self { role: ChatRole::Model, text: text.into(), timestamp: OffsetDateTime::now_utc(), is_error: false }
  }

  pub fn model_error(text: impl Into<String>) -> Self {
    Self { is_error: true, ..Self::model(text) }
  }
}
