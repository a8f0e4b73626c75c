//! Assistant tab: a per-problem chat transcript relayed to the backend.

use tracing::{info, instrument, warn};

use super::Workspace;
use crate::domain::ChatMessage;
use crate::error::WorkspaceError;
use crate::gateway::AssistantRequest;
use crate::util::fill_template;

const GREETING_TEMPLATE: &str = "Hello! I'm here to help with the \"{title}\" problem. How can I assist you?";
pub const ASSISTANT_ERROR_MESSAGE: &str = "Sorry, an unexpected error occurred. Please try again later.";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantState {
  messages: Vec<ChatMessage>,
  pending: bool,
}

impl AssistantState {
  pub fn messages(&self) -> &[ChatMessage] {
    &self.messages
  }

  pub fn pending(&self) -> bool {
    self.pending
  }

  /// Start a fresh transcript for a newly loaded problem.
  pub(super) fn greet(&mut self, title: &str) {
    self.messages = vec![ChatMessage::model(fill_template(GREETING_TEMPLATE, &[("title", title)]))];
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AskOutcome {
  Replied,
  Failed,
  /// Blank text or a reply still pending.
  Ignored,
  Discarded,
}

impl Workspace {
  #[instrument(level = "info", target = "workspace", skip(self, text), fields(workspace = %self.id(), text_len = text.len()))]
  pub async fn ask_assistant(&self, text: &str) -> Result<AskOutcome, WorkspaceError> {
    if text.trim().is_empty() {
      return Ok(AskOutcome::Ignored);
    }

    let request = self
      .mutate(|st| -> Result<Option<AssistantRequest>, WorkspaceError> {
        if st.assistant.pending {
          return Ok(None);
        }
        let problem = st.loaded_problem().ok_or(WorkspaceError::NotLoaded)?;
        let mut transcript = st.assistant.messages.clone();
        transcript.push(ChatMessage::user(text));
        let request = AssistantRequest::new(problem, &transcript);
        st.assistant.messages = transcript;
        st.assistant.pending = true;
        Ok(Some(request))
      })
      .await??;

    let Some(request) = request else {
      return Ok(AskOutcome::Ignored);
    };

    let reply = self.api.assistant_reply(&request).await;

    let applied = self
      .complete(|_| true, |st| {
        st.assistant.pending = false;
        match reply {
          Ok(text) => {
            info!(target: "workspace", reply_len = text.len(), "Assistant replied");
            st.assistant.messages.push(ChatMessage::model(text));
            AskOutcome::Replied
          }
          Err(e) => {
            warn!(target: "workspace", error = %e, "Assistant call failed");
            st.assistant.messages.push(ChatMessage::model_error(ASSISTANT_ERROR_MESSAGE));
            AskOutcome::Failed
          }
        }
      })
      .await;

    Ok(applied.unwrap_or(AskOutcome::Discarded))
  }
}
