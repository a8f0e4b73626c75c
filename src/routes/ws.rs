//! WebSocket upgrade + session loop. Each connection owns one `Workspace`.
//!
//! The loop multiplexes three sources: client frames, workspace change
//! notifications (each one pushes a fresh snapshot), and events from spawned
//! command tasks. Commands that reach the backend run as their own tasks so the
//! loop keeps reading; a second run/submit sent while one is out is therefore
//! seen and ignored by the workspace, not queued behind it.

use std::future::Future;
use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{Language, Tab};
use crate::error::WorkspaceError;
use crate::protocol::{workspace_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::workspace::{ExecuteOutcome, NavOutcome, Workspace};

type Events = mpsc::UnboundedSender<ServerWsMessage>;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "practice_workspace", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let workspace = state.new_workspace();
  let mut changes = workspace.subscribe();
  let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerWsMessage>();
  info!(target: "practice_workspace", workspace = %workspace.id(), "WebSocket connected");

  let initial = snapshot(&workspace).await;
  if send(&mut socket, &initial).await.is_ok() {
    loop {
      let outgoing = tokio::select! {
        incoming = socket.recv() => match incoming {
          Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(msg) => {
              debug!(target: "practice_workspace", ?msg, "WS received");
              dispatch(msg, &workspace, &events_tx).await
            }
            Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid message: {e}") }),
          },
          Some(Ok(Message::Ping(payload))) => {
            let _ = socket.send(Message::Pong(payload)).await;
            None
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => None,
          Some(Err(e)) => {
            warn!(target: "practice_workspace", error = %e, "WS receive error");
            break;
          }
        },
        changed = changes.changed() => {
          if changed.is_err() {
            break;
          }
          changes.borrow_and_update();
          Some(snapshot(&workspace).await)
        }
        Some(event) = events_rx.recv() => Some(event),
      };

      if let Some(msg) = outgoing {
        if send(&mut socket, &msg).await.is_err() {
          break;
        }
      }
    }
  }

  workspace.close().await;
  info!(target: "practice_workspace", workspace = %workspace.id(), "WebSocket disconnected");
}

async fn snapshot(workspace: &Workspace) -> ServerWsMessage {
  let id = workspace.id();
  let out = workspace.view(|st| workspace_out(id, st)).await;
  ServerWsMessage::Workspace { workspace: out }
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {e}") }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "practice_workspace", error = %e, "WS send error");
    e
  })
}

fn error_message(err: &WorkspaceError) -> String {
  match err {
    WorkspaceError::Api(e) => e.user_message(),
    other => other.to_string(),
  }
}

/// Run a command on its own task and report its reply or error as an event.
fn spawn_reporting<F>(events: &Events, task: F)
where
  F: Future<Output = Result<Option<ServerWsMessage>, WorkspaceError>> + Send + 'static,
{
  let events = events.clone();
  tokio::spawn(async move {
    let msg = match task.await {
      Ok(reply) => reply,
      Err(WorkspaceError::Closed) => None,
      Err(e) => {
        warn!(target: "practice_workspace", error = %e, "Workspace command failed");
        Some(ServerWsMessage::Error { message: error_message(&e) })
      }
    };
    if let Some(msg) = msg {
      // The connection may already be gone.
      let _ = events.send(msg);
    }
  });
}

fn navigated(outcome: NavOutcome) -> Option<ServerWsMessage> {
  match outcome {
    NavOutcome::Navigated(problem_id) => Some(ServerWsMessage::Navigated { problem_id }),
    NavOutcome::Unchanged => None,
  }
}

fn executed(outcome: ExecuteOutcome) -> Option<ServerWsMessage> {
  if outcome == ExecuteOutcome::Ignored {
    debug!(target: "practice_workspace", "Run/submit ignored: another action is in flight");
  }
  None
}

/// Apply one client message. Local edits are applied inline and answered
/// directly; backend-bound commands are spawned and answer through `events`.
#[instrument(level = "debug", skip(workspace, events), fields(workspace = %workspace.id()))]
async fn dispatch(msg: ClientWsMessage, workspace: &Workspace, events: &Events) -> Option<ServerWsMessage> {
  let ws = workspace.clone();
  let inline = match msg {
    ClientWsMessage::Ping => return Some(ServerWsMessage::Pong),
    ClientWsMessage::Open { problem_id } => {
      spawn_reporting(events, async move { ws.open(&problem_id).await.map(|()| None) });
      return None;
    }
    ClientWsMessage::Run => {
      spawn_reporting(events, async move { ws.run().await.map(executed) });
      return None;
    }
    ClientWsMessage::Submit => {
      spawn_reporting(events, async move { ws.submit().await.map(executed) });
      return None;
    }
    ClientWsMessage::Previous => {
      spawn_reporting(events, async move { ws.previous().await.map(navigated) });
      return None;
    }
    ClientWsMessage::Next => {
      spawn_reporting(events, async move { ws.next().await.map(navigated) });
      return None;
    }
    ClientWsMessage::Shuffle => {
      spawn_reporting(events, async move { ws.shuffle().await.map(navigated) });
      return None;
    }
    ClientWsMessage::SelectTab { tab: Tab::Submissions } => {
      spawn_reporting(events, async move { ws.select_tab(Tab::Submissions).await.map(|_| None) });
      return None;
    }
    ClientWsMessage::AskAssistant { text } => {
      spawn_reporting(events, async move { ws.ask_assistant(&text).await.map(|_| None) });
      return None;
    }
    ClientWsMessage::SelectTab { tab } => ws.select_tab(tab).await.map(|_| ()),
    ClientWsMessage::SelectLanguage { language } => match language.parse::<Language>() {
      Ok(lang) => ws.select_language(lang).await,
      Err(e) => Err(e),
    },
    ClientWsMessage::Edit { code } => ws.edit(code).await,
    ClientWsMessage::Reset => ws.reset().await,
    ClientWsMessage::SelectResultTab { tab } => ws.select_result_tab(tab).await,
    ClientWsMessage::ViewSubmission { submission_id } => ws.view_submission(submission_id).await,
  };

  match inline {
    Ok(()) | Err(WorkspaceError::Closed) => None,
    Err(e) => {
      warn!(target: "practice_workspace", error = %e, "Workspace command rejected");
      Some(ServerWsMessage::Error { message: error_message(&e) })
    }
  }
}
