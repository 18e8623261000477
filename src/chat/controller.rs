//! Turn orchestration: validation, scoring, streaming and logging.
//!
//! A turn is a stream of [`TurnUpdate`] snapshots. The controller suspends
//! after every snapshot until the consumer polls again, so dropping the
//! stream cancels the turn at the next suspension point (awaiting the next
//! fragment or the pacing delay). The assistant entry is committed together
//! with the user message and tracks every published line, so a cancelled
//! turn keeps the reply text published so far (empty if none was).

use std::sync::Arc;

use chrono::Local;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, future};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use super::reassembler::reassemble_lines;
use super::sink::{ConversationRecord, ErrorRecord, LogSink};
use super::types::{Message, Role, TYPING_PLACEHOLDER, Transcript, TurnState, TurnUpdate};
use crate::config::ChatConfig;
use crate::llm::{CompletionClient, CompletionError, CompletionRequest};
use crate::sentiment::{SentimentAdvisor, SentimentResult};

/// Snapshots of one turn, in publication order.
pub type TurnStream<'a> = BoxStream<'a, TurnUpdate>;

/// Why an input was refused before anything was sent.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TurnRejection {
    /// Input is empty or whitespace only.
    #[error("Please enter a message.")]
    Empty,
    /// Input exceeds the configured length.
    #[error("Message too long. Please shorten your input.")]
    TooLong {
        /// Length of the input, in characters.
        chars: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// A single conversation and the collaborators it talks to.
pub struct Conversation {
    config: Arc<ChatConfig>,
    client: Arc<dyn CompletionClient>,
    advisor: SentimentAdvisor,
    chat_log: Arc<dyn LogSink>,
    error_log: Arc<dyn LogSink>,
    transcript: Transcript,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(
        config: Arc<ChatConfig>,
        client: Arc<dyn CompletionClient>,
        advisor: SentimentAdvisor,
        chat_log: Arc<dyn LogSink>,
        error_log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            client,
            advisor,
            chat_log,
            error_log,
            transcript: Transcript::new(),
        }
    }

    /// Committed history, oldest first.
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Check an input against the turn preconditions.
    ///
    /// # Errors
    /// Returns the rejection reason if the input is blank or too long.
    pub fn validate(&self, input: &str) -> Result<(), TurnRejection> {
        if input.trim().is_empty() {
            return Err(TurnRejection::Empty);
        }

        let chars = input.chars().count();
        if chars > self.config.max_input_chars {
            return Err(TurnRejection::TooLong {
                chars,
                max: self.config.max_input_chars,
            });
        }

        Ok(())
    }

    /// Run one turn for `input`.
    ///
    /// Rejected input yields a single [`TurnState::Rejected`] snapshot and
    /// leaves the transcript untouched. Otherwise the stream yields a
    /// `Typing` placeholder, one `Streaming` snapshot per reassembled line,
    /// and a closing `Finalized` snapshot.
    pub fn submit(&mut self, input: impl Into<String>) -> TurnStream<'_> {
        let input = input.into();

        if let Err(rejection) = self.validate(&input) {
            tracing::warn!(reason = ?rejection, "turn rejected");
            let update = self.rejected(&rejection, input);
            return stream::once(future::ready(update)).boxed();
        }

        self.run_turn(input).boxed()
    }

    fn run_turn(&mut self, input: String) -> impl futures::Stream<Item = TurnUpdate> + Send + '_ {
        async_stream::stream! {
            let span = tracing::info_span!("turn", turn_id = %Uuid::new_v4());
            let sentiment = span.in_scope(|| self.advisor.assess(&input));
            let panel = sentiment.panel_text();
            span.in_scope(|| {
                tracing::info!(
                    chars = input.chars().count(),
                    category = sentiment.category.name(),
                    polarity = sentiment.polarity,
                    "turn started"
                );
            });

            let request = self.build_request(&input);
            self.transcript.push(Message::user(input.clone()));
            self.transcript.push(Message::assistant(String::new()));
            yield self.typing_snapshot();

            let mut reply = String::new();
            let mut failure: Option<CompletionError> = None;

            match self.client.stream_chat(request).instrument(span.clone()).await {
                Err(err) => failure = Some(err),
                Ok(fragments) => {
                    let lines = reassemble_lines(fragments);
                    futures::pin_mut!(lines);

                    while let Some(line) = lines.next().instrument(span.clone()).await {
                        match line {
                            Ok(text) => {
                                span.in_scope(|| tracing::debug!(line = %text.trim_end(), "line received"));
                                reply.push_str(&text);
                                if !self.config.pacing.is_zero() {
                                    tokio::time::sleep(self.config.pacing).await;
                                }
                                self.set_reply(reply.clone());
                                yield self.snapshot(None, panel.clone(), TurnState::Streaming);
                            }
                            Err(err) => {
                                failure = Some(err);
                                break;
                            }
                        }
                    }
                }
            }

            let bot_text = match failure {
                None => {
                    span.in_scope(|| {
                        tracing::info!(reply_chars = reply.chars().count(), "turn finalized");
                    });
                    reply
                }
                Some(err) => {
                    let message = err.to_string();
                    span.in_scope(|| tracing::error!(error = %message, "completion failed"));
                    self.log_error(message.clone()).instrument(span.clone()).await;
                    format!("Error: {message}")
                }
            };
            self.set_reply(bot_text.clone());
            self.log_conversation(&input, &sentiment, bot_text)
                .instrument(span.clone())
                .await;

            yield self.snapshot(None, panel, TurnState::Finalized);
        }
    }

    fn build_request(&self, input: &str) -> CompletionRequest {
        let current = Message::user(input);
        let history = self
            .transcript
            .iter()
            .filter(|_| self.config.include_history);

        CompletionRequest::new(
            self.config.model.clone(),
            &self.config.system_prompt,
            history.chain(std::iter::once(&current)),
        )
    }

    /// Replace the text of the in-progress assistant entry.
    fn set_reply(&mut self, text: String) {
        if let Some(entry) = self
            .transcript
            .last_mut()
            .filter(|entry| entry.role == Role::Assistant)
        {
            entry.content = text;
        }
    }

    /// Snapshot of the committed transcript plus an optional overlay assistant entry.
    fn snapshot(&self, overlay: Option<&str>, advisory: String, state: TurnState) -> TurnUpdate {
        let mut transcript = self.transcript.clone();
        if let Some(reply) = overlay {
            transcript.push(Message::assistant(reply));
        }
        TurnUpdate {
            transcript,
            advisory,
            input: String::new(),
            state,
        }
    }

    /// Opening snapshot: the reply slot shows the typing placeholder.
    fn typing_snapshot(&self) -> TurnUpdate {
        let mut update = self.snapshot(None, String::new(), TurnState::Typing);
        if let Some(entry) = update.transcript.last_mut() {
            entry.content = TYPING_PLACEHOLDER.to_string();
        }
        update
    }

    fn rejected(&self, rejection: &TurnRejection, input: String) -> TurnUpdate {
        let mut update = self.snapshot(
            Some(&rejection.to_string()),
            String::new(),
            TurnState::Rejected,
        );
        // Overlong input goes back to the input field for editing.
        if matches!(rejection, TurnRejection::TooLong { .. }) {
            update.input = input;
        }
        update
    }

    async fn log_conversation(&self, input: &str, sentiment: &SentimentResult, reply: String) {
        let record = ConversationRecord {
            timestamp: Local::now(),
            user_text: input.to_string(),
            category: sentiment.category,
            polarity: sentiment.polarity,
            bot_text: reply,
        };

        if let Err(err) = self.chat_log.append(&record.to_string()).await {
            tracing::error!(error = %err, "failed to append conversation log");
        }
    }

    async fn log_error(&self, message: String) {
        let record = ErrorRecord::now(message);
        if let Err(err) = self.error_log.append(&record.to_string()).await {
            tracing::error!(error = %err, "failed to append error log");
        }
    }
}
