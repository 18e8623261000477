//! Polarity banding and coping advice.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{PolarityScorer, SentimentError};

/// Sentiment band of a piece of text, ordered from most to least positive.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentCategory {
    /// `p > 0.5`
    VeryPositive,
    /// `0.1 < p <= 0.5`
    Positive,
    /// `-0.1 <= p <= 0.1`
    Neutral,
    /// `-0.5 < p < -0.1`
    Negative,
    /// `p <= -0.5`
    VeryNegative,
}

impl SentimentCategory {
    /// All bands, most positive first.
    pub const ALL: [Self; 5] = [
        Self::VeryPositive,
        Self::Positive,
        Self::Neutral,
        Self::Negative,
        Self::VeryNegative,
    ];

    /// Band for a polarity score.
    ///
    /// NaN is not a polarity; it falls into `Neutral`.
    #[must_use]
    pub fn from_polarity(p: f64) -> Self {
        if p.is_nan() {
            Self::Neutral
        } else if p > 0.5 {
            Self::VeryPositive
        } else if p > 0.1 {
            Self::Positive
        } else if p >= -0.1 {
            Self::Neutral
        } else if p > -0.5 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }

    /// Plain band name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VeryPositive => "Very Positive",
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
            Self::VeryNegative => "Very Negative",
        }
    }

    /// Display label, band name followed by its emoji.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryPositive => "Very Positive 😊",
            Self::Positive => "Positive 🙂",
            Self::Neutral => "Neutral 😐",
            Self::Negative => "Negative 😟",
            Self::VeryNegative => "Very Negative 😢",
        }
    }

    /// Coping suggestion for the band.
    #[must_use]
    pub const fn advisory(self) -> &'static str {
        match self {
            Self::VeryPositive => {
                "Keep up the positive vibes! Consider sharing your good mood with others."
            }
            Self::Positive => {
                "It's great to see you're feeling positive. Keep doing what you're doing!"
            }
            Self::Neutral => "Feeling neutral is okay. Consider engaging in activities you enjoy.",
            Self::Negative => {
                "It seems you're feeling down. Try to take a break and do something relaxing."
            }
            Self::VeryNegative => {
                "I'm sorry to hear that you're feeling very negative. Consider talking to a friend or seeking professional help."
            }
        }
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SentimentCategory {
    type Err = String;

    /// Accepts either the plain name or the emoji label.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| value == category.label() || value == category.name())
            .ok_or_else(|| value.to_string())
    }
}

/// Outcome of scoring one user message.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SentimentResult {
    /// Band of the score.
    pub category: SentimentCategory,
    /// Score in `[-1, 1]`.
    pub polarity: f64,
    /// Coping tip; absent when scoring failed.
    pub advisory: Option<&'static str>,
}

impl SentimentResult {
    /// Result for a successfully scored polarity.
    #[must_use]
    pub fn from_polarity(polarity: f64) -> Self {
        let category = SentimentCategory::from_polarity(polarity);
        Self {
            category,
            polarity,
            advisory: Some(category.advisory()),
        }
    }

    /// Neutral result used when scoring fails.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            category: SentimentCategory::Neutral,
            polarity: 0.0,
            advisory: None,
        }
    }

    /// Text for the sentiment panel.
    #[must_use]
    pub fn panel_text(&self) -> String {
        let header = format!(
            "Sentiment: {} (Polarity: {:.2})",
            self.category, self.polarity
        );
        match self.advisory {
            Some(tip) => format!("{header}\nCoping Tip: {tip}"),
            None => header,
        }
    }
}

/// Maps text to a sentiment band and a coping tip.
#[derive(Clone)]
pub struct SentimentAdvisor {
    scorer: Arc<dyn PolarityScorer>,
}

impl SentimentAdvisor {
    /// Create an advisor backed by `scorer`.
    #[must_use]
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    /// Score `text`, propagating scorer failures.
    ///
    /// Blank text scores 0 without consulting the scorer.
    ///
    /// # Errors
    /// Returns an error if the scorer fails or returns a value outside `[-1, 1]`.
    pub fn try_assess(&self, text: &str) -> Result<SentimentResult, SentimentError> {
        if text.trim().is_empty() {
            return Ok(SentimentResult::from_polarity(0.0));
        }

        let polarity = self.scorer.polarity(text)?;
        if !(-1.0..=1.0).contains(&polarity) {
            return Err(SentimentError::OutOfRange(polarity));
        }
        Ok(SentimentResult::from_polarity(polarity))
    }

    /// Score `text`, falling back to a neutral result without advice on failure.
    #[must_use]
    pub fn assess(&self, text: &str) -> SentimentResult {
        self.try_assess(text).unwrap_or_else(|err| {
            tracing::error!(error = %err, "sentiment scoring failed, using neutral fallback");
            SentimentResult::unavailable()
        })
    }
}
