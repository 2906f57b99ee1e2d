use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use rig::agent::{Agent, MultiTurnStreamItem};
use rig::client::Nothing;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use rig::streaming::{StreamedAssistantContent, StreamedUserContent, StreamingChat};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use super::{AgentRunner, EventStream, RunEvent};
use crate::config::AppConfig;
use crate::errors::{AgentError, AppError};
use crate::models::{Message, MessageRole, ToolCall};
use crate::tools::ToolSet;

const PREAMBLE: &str = "You are a helpful AI assistant. Be concise, accurate, and friendly. \
                        Use the available tools to look up the current time, the user's \
                        location or the weather instead of guessing. \
                        If you don't know something, say so.";

const EVENT_BUFFER: usize = 8;
const CHUNK_BUFFER: usize = 64;

/// Replays stored [`Message`] records as rig history. Tool turns, and the
/// assistant turns that only requested tools, are internal to a run and never
/// replayed.
fn to_rig_history(messages: &[Message]) -> Vec<RigMessage> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(RigMessage::user(&m.content)),
            MessageRole::Assistant if m.content.is_empty() && !m.tool_calls.is_empty() => None,
            MessageRole::Assistant => Some(RigMessage::assistant(&m.content)),
            MessageRole::Tool => None,
        })
        .collect()
}

fn tool_call_record(call: &rig::message::ToolCall) -> ToolCall {
    ToolCall { name: call.function.name.clone(), arguments: call.function.arguments.to_string() }
}

/// Runs the tool-calling agent against a local Ollama model.
///
/// The agent, with its client and tools, is built once at startup and shared
/// read-only by every request.
#[derive(Clone)]
pub struct OllamaRunner {
    agent: Arc<Agent<ollama::CompletionModel>>,
    base_url: String,
    max_turns: usize,
}

impl OllamaRunner {
    pub fn new(config: &AppConfig, tools: ToolSet) -> Result<Self, AppError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(&config.ollama_base_url)
            .build()
            .map_err(|e| AppError::ClientBuild { client: "Ollama".to_string(), message: e.to_string() })?;

        let agent = client
            .agent(&config.model)
            .preamble(PREAMBLE)
            .tool(tools.time)
            .tool(tools.location)
            .tool(tools.weather)
            .build();

        info!(model = %config.model, base_url = %config.ollama_base_url, "agent ready");
        Ok(Self {
            agent: Arc::new(agent),
            base_url: config.ollama_base_url.clone(),
            max_turns: config.max_turns,
        })
    }
}

#[async_trait]
impl AgentRunner for OllamaRunner {
    async fn run(&self, messages: Vec<Message>) -> EventStream {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let runner = self.clone();
        tokio::spawn(async move { runner.pump(messages, Segmenter::new(events_tx)).await });
        ReceiverStream::new(events_rx).boxed()
    }
}

impl OllamaRunner {
    async fn pump(self, mut messages: Vec<Message>, mut out: Segmenter) {
        let Some(prompt) = messages.pop() else {
            out.fail(AgentError::Inference { message: "empty transcript".to_string() }).await;
            return;
        };
        let history = to_rig_history(&messages);

        let mut stream = self
            .agent
            .stream_chat(RigMessage::user(&prompt.content), history)
            .multi_turn(self.max_turns)
            .await;

        while let Some(item) = stream.next().await {
            let delivered = match item {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(text))) => {
                    out.push(text.text).await
                }
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::ToolCall {
                    tool_call,
                    ..
                })) => {
                    let call = tool_call_record(&tool_call);
                    debug!(tool = %call.name, arguments = %call.arguments, "model requested a tool call");
                    out.close_output();
                    true
                }
                Ok(MultiTurnStreamItem::StreamUserItem(StreamedUserContent::ToolResult { .. })) => {
                    debug!("tool result folded into context");
                    true
                }
                Ok(MultiTurnStreamItem::FinalResponse(_)) => {
                    debug!("agent run complete");
                    true
                }
                Ok(_) => true,
                Err(e) => {
                    error!("Ollama streaming failed: {e}");
                    out.fail(self.classify(e)).await;
                    return;
                }
            };
            if !delivered {
                debug!("client stopped listening; abandoning run");
                return;
            }
        }
    }

    fn classify(&self, e: impl Display) -> AgentError {
        let msg = e.to_string();
        if msg.contains("Connection refused") || msg.contains("connect") {
            AgentError::Unavailable { host: self.base_url.clone() }
        } else {
            AgentError::Inference { message: msg }
        }
    }
}

/// Splits the model's flat stream into output segments. A tool call closes
/// the open segment; the next text opens a new one.
struct Segmenter {
    events: mpsc::Sender<RunEvent>,
    current: Option<mpsc::Sender<Result<String, AgentError>>>,
}

impl Segmenter {
    fn new(events: mpsc::Sender<RunEvent>) -> Self {
        Self { events, current: None }
    }

    /// Returns `false` once the consumer has gone away.
    async fn push(&mut self, text: String) -> bool {
        let chunks = match &self.current {
            Some(tx) => tx.clone(),
            None => {
                let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
                let output = RunEvent::Output(ReceiverStream::new(rx).boxed());
                if self.events.send(output).await.is_err() {
                    return false;
                }
                self.current = Some(tx.clone());
                tx
            }
        };
        chunks.send(Ok(text)).await.is_ok()
    }

    fn close_output(&mut self) {
        self.current = None;
    }

    /// Errors inside an open segment end that segment; otherwise they end the run.
    async fn fail(mut self, err: AgentError) {
        match self.current.take() {
            Some(tx) => {
                let _ = tx.send(Err(err)).await;
            }
            None => {
                let _ = self.events.send(RunEvent::Error(err)).await;
            }
        }
    }
}
