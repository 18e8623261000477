//! Sentiment scoring and coping advice.
//!
//! - [`PolarityScorer`]: text to polarity in `[-1, 1]`
//! - [`LexiconScorer`]: default in-process scorer
//! - [`SentimentAdvisor`]: polarity bands and coping tips

pub mod advisor;
pub mod lexicon;

pub use advisor::{SentimentAdvisor, SentimentCategory, SentimentResult};
pub use lexicon::LexiconScorer;

use thiserror::Error;

/// Errors produced while scoring text.
#[derive(Debug, Error)]
pub enum SentimentError {
    /// The scorer could not be initialized.
    #[error("scorer initialization failed: {0}")]
    Init(#[from] regex::Error),
    /// The scorer returned a value outside `[-1, 1]`.
    #[error("polarity out of range: {0}")]
    OutOfRange(f64),
    /// The scorer failed for another reason.
    #[error("scoring failed: {0}")]
    Scoring(String),
}

/// Black-box polarity function.
pub trait PolarityScorer: Send + Sync {
    /// Score `text` in `[-1, 1]`, negative meaning negative sentiment.
    ///
    /// # Errors
    /// Returns an error if the text cannot be scored.
    fn polarity(&self, text: &str) -> Result<f64, SentimentError>;
}
