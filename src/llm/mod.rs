//! Remote chat completion: request model and the streaming client seam.

pub mod error;
pub mod groq;

pub use error::CompletionError;
pub use groq::GroqClient;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::chat::types::{Message, Role};

/// Incremental reply fragments, ending with at most one error.
pub type FragmentStream = BoxStream<'static, Result<String, CompletionError>>;

/// Role of a message sent to the completion API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestRole {
    /// Preamble.
    System,
    /// User input.
    User,
    /// Earlier assistant reply.
    Assistant,
}

impl From<Role> for RequestRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Assistant,
        }
    }
}

/// One message of a completion request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RequestMessage {
    /// Author.
    pub role: RequestRole,
    /// Text content.
    pub content: String,
}

impl From<&Message> for RequestMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            content: message.content.clone(),
        }
    }
}

/// Body of a streaming chat completion call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// System preamble followed by the conversation.
    pub messages: Vec<RequestMessage>,
    /// Always `true`: replies are consumed fragment by fragment.
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a streaming request with `system_prompt` prepended to `conversation`.
    #[must_use]
    pub fn new<'a, I>(model: impl Into<String>, system_prompt: &str, conversation: I) -> Self
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut messages = vec![RequestMessage {
            role: RequestRole::System,
            content: system_prompt.to_string(),
        }];
        messages.extend(conversation.into_iter().map(RequestMessage::from));

        Self {
            model: model.into(),
            messages,
            stream: true,
        }
    }
}

/// Remote completion collaborator.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Start a streaming completion.
    ///
    /// # Errors
    /// Returns an error if the call cannot be started; failures after the
    /// first fragment arrive as the final item of the stream.
    async fn stream_chat(&self, request: CompletionRequest)
    -> Result<FragmentStream, CompletionError>;
}
