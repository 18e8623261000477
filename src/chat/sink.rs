//! Append-only log sinks and the records written to them.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::sentiment::SentimentCategory;

/// Timestamp layout used by both log files.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Error raised when a record cannot be appended.
#[derive(Debug, Error)]
pub enum SinkError {
    /// I/O error while opening or writing the sink.
    #[error("log sink io error on {path}: {source}")]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Destination for write-once text records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one fully formatted record.
    ///
    /// # Errors
    /// Returns an error if the record could not be persisted.
    async fn append(&self, record: &str) -> Result<(), SinkError>;
}

/// UTF-8 file opened in append mode, created if absent.
#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn append(&self, record: &str) -> Result<(), SinkError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(record.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))
    }
}

/// Sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn append(&self, record: &str) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.to_string());
        Ok(())
    }
}

/// Summary of one finalized turn.
#[derive(Clone, Debug)]
pub struct ConversationRecord {
    /// When the turn finalized.
    pub timestamp: DateTime<Local>,
    /// Raw user input.
    pub user_text: String,
    /// Sentiment band of the input.
    pub category: SentimentCategory,
    /// Polarity score of the input.
    pub polarity: f64,
    /// Complete assistant reply.
    pub bot_text: String,
}

impl fmt::Display for ConversationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]\nUser: {}\nSentiment: {}, Polarity: {:.2}\nBot: {}\n---\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.user_text,
            self.category,
            self.polarity,
            self.bot_text
        )
    }
}

/// A failed remote call.
#[derive(Clone, Debug)]
pub struct ErrorRecord {
    /// When the failure was observed.
    pub timestamp: DateTime<Local>,
    /// Error description.
    pub message: String,
}

impl ErrorRecord {
    /// Build a record stamped with the current local time.
    #[must_use]
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .single()
            .unwrap_or_else(Local::now)
    }

    #[test]
    fn test_conversation_record_format() {
        let record = ConversationRecord {
            timestamp: fixed_time(),
            user_text: "I love this!".to_string(),
            category: SentimentCategory::VeryPositive,
            polarity: 0.8,
            bot_text: "Glad to hear it.\nAnything else?".to_string(),
        };
        let rendered = record.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with(
            "]\nUser: I love this!\nSentiment: Very Positive 😊, Polarity: 0.80\nBot: Glad to hear it.\nAnything else?\n---\n"
        ));
    }

    #[test]
    fn test_error_record_format() {
        let record = ErrorRecord {
            timestamp: fixed_time(),
            message: "connection reset".to_string(),
        };
        let rendered = record.to_string();
        assert!(rendered.starts_with("[2024-05-01 09:30:00.000000] "));
        assert!(rendered.ends_with("] connection reset\n"));
    }

    #[tokio::test]
    async fn test_file_sink_appends_and_creates() -> Result<(), SinkError> {
        let dir = tempfile::tempdir().map_err(|source| SinkError::Io {
            path: PathBuf::from("tempdir"),
            source,
        })?;
        let path = dir.path().join("chat_log.txt");
        let sink = FileSink::new(&path);

        sink.append("first\n").await?;
        sink.append("second\n").await?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SinkError::Io { path: path.clone(), source })?;
        assert_eq!(content, "first\nsecond\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_file_sink_reports_io_errors() {
        let sink = FileSink::new("/nonexistent-dir/calmline/log.txt");
        let result = sink.append("x").await;
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() -> Result<(), SinkError> {
        let sink = MemorySink::new();
        sink.append("a").await?;
        sink.append("b").await?;
        assert_eq!(sink.records(), vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }
}
