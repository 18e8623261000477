//! Transcript and turn snapshot types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder shown while the assistant reply has not started.
pub const TYPING_PLACEHOLDER: &str = "Typing...";

/// Author of a transcript entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

impl Role {
    /// Stable string form used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// A single transcript entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the entry.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Build a user entry.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant entry.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only conversation history.
pub type Transcript = Vec<Message>;

/// Phase of a turn at the time a snapshot was published.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Input failed validation; nothing was sent or logged.
    Rejected,
    /// Placeholder published, no reply text yet.
    Typing,
    /// Reply text is arriving.
    Streaming,
    /// Reply is complete (or replaced by an error) and frozen.
    Finalized,
}

/// One snapshot published to the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnUpdate {
    /// Transcript as it should be rendered.
    pub transcript: Transcript,
    /// Sentiment and coping tip panel text.
    pub advisory: String,
    /// New content for the input field.
    pub input: String,
    /// Turn phase.
    pub state: TurnState,
}

impl TurnUpdate {
    /// Content of the trailing assistant entry, if any.
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        self.transcript
            .last()
            .filter(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }
}
