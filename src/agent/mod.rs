pub mod ollama;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::errors::AgentError;
use crate::models::Message;

pub use ollama::OllamaRunner;

/// Answer fragments of one output segment, in emission order.
pub type ContentStream = BoxStream<'static, Result<String, AgentError>>;

/// Events of a single run. The run is over when the stream ends.
pub type EventStream = BoxStream<'static, RunEvent>;

pub enum RunEvent {
    /// The run failed; no further events follow.
    Error(AgentError),
    Output(ContentStream),
}

impl std::fmt::Debug for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::Error(e) => f.debug_tuple("Error").field(e).finish(),
            RunEvent::Output(_) => f.write_str("Output(..)"),
        }
    }
}

/// Given a transcript, streams back the model's answer while it calls tools
/// behind the scenes.
///
/// Dropping the returned stream, or any [`ContentStream`] taken from it,
/// tells the runner nobody is listening anymore.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, messages: Vec<Message>) -> EventStream;
}
