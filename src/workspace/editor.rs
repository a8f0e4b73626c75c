//! Language and editor buffer state.
//!
//! The buffer is not kept per language: switching language re-initializes it
//! from that language's starter code and the previous edits are gone.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::Workspace;
use crate::domain::{Language, Problem};
use crate::error::WorkspaceError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditorState {
  language: Language,
  buffer: String,
  pristine: String,
  /// Starter code of the loaded problem; `None` until a problem loads.
  starter: Option<BTreeMap<Language, String>>,
}

impl EditorState {
  pub fn language(&self) -> Language {
    self.language
  }

  pub fn buffer(&self) -> &str {
    &self.buffer
  }

  pub fn is_dirty(&self) -> bool {
    self.buffer != self.pristine
  }

  pub fn starter_for(&self, language: Language) -> Option<String> {
    let starter = self.starter.as_ref()?;
    Some(starter.get(&language).cloned().unwrap_or_else(|| language.starter_placeholder()))
  }

  /// New problem: take its starter code and re-initialize for the current language.
  pub fn load(&mut self, problem: &Problem) {
    self.starter = Some(problem.starter_code.clone());
    self.reinitialize();
  }

  pub fn select_language(&mut self, language: Language) {
    self.language = language;
    self.reinitialize();
  }

  pub fn edit(&mut self, code: impl Into<String>) {
    self.buffer = code.into();
  }

  pub fn reset(&mut self) {
    self.buffer = self.pristine.clone();
  }

  fn reinitialize(&mut self) {
    if let Some(code) = self.starter_for(self.language) {
      self.pristine = code.clone();
      self.buffer = code;
    }
  }
}

impl Workspace {
  /// Switch language. Discards the current buffer.
  #[instrument(level = "debug", target = "workspace", skip(self), fields(workspace = %self.id()))]
  pub async fn select_language(&self, language: Language) -> Result<(), WorkspaceError> {
    self.mutate(|st| {
      st.editor.select_language(language);
      debug!(target: "workspace", %language, dirty = st.editor.is_dirty(), "Language selected");
    })
    .await
  }

  pub async fn edit(&self, code: impl Into<String>) -> Result<(), WorkspaceError> {
    let code = code.into();
    self.mutate(move |st| st.editor.edit(code)).await
  }

  /// Restore the starter code of the current language and clear the shown result.
  /// The result sub-tab is left where it is.
  #[instrument(level = "debug", target = "workspace", skip(self), fields(workspace = %self.id()))]
  pub async fn reset(&self) -> Result<(), WorkspaceError> {
    self.mutate(|st| {
      st.editor.reset();
      st.execution.clear();
    })
    .await
  }
}
