//! Application state shared across all request handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::chat::{Conversation, FileSink};
use crate::config::ChatConfig;
use crate::llm::GroqClient;
use crate::sentiment::{LexiconScorer, SentimentAdvisor};

/// Shared application state.
pub struct AppState {
    /// The single conversation served by this process; held for the whole turn.
    pub conversation: Arc<Mutex<Conversation>>,
    /// Model name reported by the health endpoint.
    pub model_name: String,
}

impl AppState {
    /// Wire the production collaborators from `config`.
    ///
    /// # Errors
    /// Returns an error if the completion client or the scorer cannot be created.
    pub fn from_config(
        config: Arc<ChatConfig>,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let client = GroqClient::new(&config)
            .map_err(|e| format!("Failed to create completion client: {e}"))?;
        let scorer = LexiconScorer::new()
            .map_err(|e| format!("Failed to create sentiment scorer: {e}"))?;

        let conversation = Conversation::new(
            Arc::clone(&config),
            Arc::new(client),
            SentimentAdvisor::new(Arc::new(scorer)),
            Arc::new(FileSink::new(&config.chat_log_path)),
            Arc::new(FileSink::new(&config.error_log_path)),
        );

        Ok(Self::with_conversation(conversation, config.model.clone()))
    }

    /// Wrap an already assembled conversation.
    #[must_use]
    pub fn with_conversation(conversation: Conversation, model_name: String) -> Arc<Self> {
        Arc::new(Self {
            conversation: Arc::new(Mutex::new(conversation)),
            model_name,
        })
    }
}
