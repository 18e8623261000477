//! Lexicon-based polarity scorer.
//!
//! Scores are the mean of the polarities of known words. An intensifier
//! directly before a word scales it; a negator within the three preceding
//! tokens flips it and halves its strength.

use std::collections::HashMap;

use regex::Regex;

use super::{PolarityScorer, SentimentError};

/// How many tokens back a negator still applies.
const NEGATION_WINDOW: usize = 3;
/// Multiplier applied to a negated word.
const NEGATION_FACTOR: f64 = -0.5;

const WORDS: &[(&str, f64)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("calm", 0.3),
    ("cheerful", 0.7),
    ("confident", 0.5),
    ("content", 0.4),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("excited", 0.4),
    ("fantastic", 0.4),
    ("fine", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("grateful", 0.6),
    ("great", 0.8),
    ("happy", 0.8),
    ("hopeful", 0.5),
    ("joy", 0.8),
    ("kind", 0.6),
    ("like", 0.2),
    ("love", 0.5),
    ("lovely", 0.5),
    ("nice", 0.6),
    ("okay", 0.5),
    ("peaceful", 0.5),
    ("perfect", 1.0),
    ("proud", 0.8),
    ("relaxed", 0.4),
    ("thankful", 0.6),
    ("wonderful", 1.0),
    // negative
    ("afraid", -0.6),
    ("alone", -0.3),
    ("angry", -0.5),
    ("annoyed", -0.4),
    ("anxious", -0.4),
    ("awful", -1.0),
    ("bad", -0.7),
    ("broken", -0.4),
    ("depressed", -0.7),
    ("disappointed", -0.75),
    ("exhausted", -0.4),
    ("frustrated", -0.6),
    ("hate", -0.8),
    ("hopeless", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.4),
    ("lonely", -0.5),
    ("lost", -0.3),
    ("miserable", -1.0),
    ("nervous", -0.3),
    ("overwhelmed", -0.5),
    ("painful", -0.7),
    ("sad", -0.5),
    ("scared", -0.5),
    ("sick", -0.7),
    ("stressed", -0.5),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("unhappy", -0.6),
    ("upset", -0.4),
    ("useless", -0.5),
    ("worried", -0.4),
    ("worse", -0.4),
    ("worst", -1.0),
    ("worthless", -0.8),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("quite", 1.1),
    ("really", 1.3),
    ("slightly", 0.5),
    ("so", 1.3),
    ("somewhat", 0.7),
    ("too", 1.2),
    ("totally", 1.4),
    ("very", 1.3),
];

const NEGATORS: &[&str] = &["hardly", "never", "no", "nobody", "not", "nothing"];

/// Word-list polarity scorer.
pub struct LexiconScorer {
    token: Regex,
    words: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
}

impl LexiconScorer {
    /// Build the scorer with the bundled word lists.
    ///
    /// # Errors
    /// Returns an error if the tokenizer pattern fails to compile.
    pub fn new() -> Result<Self, SentimentError> {
        Ok(Self {
            token: Regex::new(r"[a-z]+(?:'[a-z]+)?")?,
            words: WORDS.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        })
    }

    fn is_negator(token: &str) -> bool {
        NEGATORS.contains(&token) || token.ends_with("n't")
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> Result<f64, SentimentError> {
        let lowered = text.to_lowercase().replace('\u{2019}', "'");
        let tokens: Vec<&str> = self
            .token
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut total = 0.0;
        let mut scored = 0_u32;

        for (idx, token) in tokens.iter().enumerate() {
            let Some(&base) = self.words.get(*token) else {
                continue;
            };

            let mut value = base;
            if let Some(factor) = idx
                .checked_sub(1)
                .and_then(|prev| self.intensifiers.get(tokens[prev]))
            {
                value *= factor;
            }

            let window_start = idx.saturating_sub(NEGATION_WINDOW);
            if tokens[window_start..idx]
                .iter()
                .any(|prev| Self::is_negator(prev))
            {
                value *= NEGATION_FACTOR;
            }

            total += value.clamp(-1.0, 1.0);
            scored += 1;
        }

        if scored == 0 {
            return Ok(0.0);
        }

        Ok((total / f64::from(scored)).clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(text: &str) -> f64 {
        LexiconScorer::new()
            .and_then(|scorer| scorer.polarity(text))
            .unwrap_or(f64::NAN)
    }

    #[test]
    fn test_empty_and_unknown_are_neutral() {
        assert!(score("").abs() < f64::EPSILON);
        assert!(score("the table is brown").abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_words() {
        assert!((score("I love this!") - 0.5).abs() < 1e-9);
        assert!((score("This is terrible") + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_over_scored_words() {
        // good 0.7, sad -0.5
        assert!((score("good but sad") - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_intensifier_scales() {
        assert!((score("very sad") + 0.65).abs() < 1e-9);
        assert!((score("extremely happy") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        assert!((score("I am not happy") + 0.4).abs() < 1e-9);
        assert!((score("I don't feel good") + 0.35).abs() < 1e-9);
        assert!((score("I don\u{2019}t feel good") + 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_range() {
        for text in [
            "awful awful awful terrible",
            "best best excellent wonderful",
            "not not not bad",
            "really really very extremely perfect",
        ] {
            let p = score(text);
            assert!((-1.0..=1.0).contains(&p), "{text}: {p}");
        }
    }
}
