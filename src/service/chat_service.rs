use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::agent::{AgentRunner, RunEvent};
use crate::models::{ChatRequest, Message};
use crate::service::sse::Frame;
use crate::store::session_store::SessionStore;

/// How a chat turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    Completed,
    RunnerFailed,
    /// Writing a frame failed; the client is gone.
    ClientGone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub answer: String,
    pub end: TurnEnd,
}

/// Drives one chat turn: session history in, SSE frames out, history back.
#[derive(Clone)]
pub struct ChatService {
    sessions: SessionStore,
    runner: Arc<dyn AgentRunner>,
    newline_placeholder: Arc<str>,
}

impl ChatService {
    pub fn new(
        sessions: SessionStore,
        runner: Arc<dyn AgentRunner>,
        newline_placeholder: &str,
    ) -> Self {
        Self { sessions, runner, newline_placeholder: Arc::from(newline_placeholder) }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Streams the answer to `request` into `frames`, one frame per fragment,
    /// then commits the turn to the session.
    ///
    /// The session (if any) stays locked for the whole turn. A `[DONE]` frame
    /// closes the stream unless the client has already gone away.
    pub async fn run_turn(&self, request: ChatRequest, frames: mpsc::Sender<Frame>) -> TurnSummary {
        let session_id = request.session_id.as_str();
        let stateful = !session_id.is_empty();

        // ── Load history ──────────────────────────────────────────────────────
        let _guard = if stateful { Some(self.sessions.lock(session_id).await) } else { None };
        let mut messages = if stateful {
            self.sessions.load(session_id).await.unwrap_or_default()
        } else {
            Vec::new()
        };
        messages.push(Message::user(request.message));

        // ── Run the agent and relay its output ────────────────────────────────
        let mut events = self.runner.run(messages.clone()).await;
        let mut answer = String::new();
        let mut end = TurnEnd::Completed;

        'events: while let Some(event) = events.next().await {
            let mut chunks = match event {
                RunEvent::Output(chunks) => chunks,
                RunEvent::Error(e) => {
                    error!(session = %session_id, "Read LLM failed: {e}");
                    end = TurnEnd::RunnerFailed;
                    break;
                }
            };

            while let Some(chunk) = chunks.next().await {
                let fragment = match chunk {
                    Ok(fragment) => fragment,
                    Err(e) => {
                        error!(session = %session_id, "Stream receive failed: {e}");
                        break;
                    }
                };
                if fragment.is_empty() {
                    continue;
                }
                answer.push_str(&fragment);
                if frames.send(Frame::chunk(&fragment, &self.newline_placeholder)).await.is_err() {
                    warn!(session = %session_id, "client disconnected mid-stream");
                    end = TurnEnd::ClientGone;
                    break 'events;
                }
            }
        }
        // Dropping the run's streams tells the runner to stop.
        drop(events);

        if end != TurnEnd::ClientGone && frames.send(Frame::Done).await.is_err() {
            end = TurnEnd::ClientGone;
        }

        // ── Commit the turn ───────────────────────────────────────────────────
        messages.push(Message::assistant(answer.clone()));
        let history_len = messages.len();
        if stateful {
            self.sessions.store(session_id, messages).await;
        }

        info!(session = %session_id, ?end, answer_len = answer.len(), history_len, "chat turn finished");
        TurnSummary { answer, end }
    }
}
