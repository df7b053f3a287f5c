use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::tag::{Rejection, TagAlphabet, TagOutcome};

/// Answer the model is instructed to give when no tag is visible.
pub const NO_TAG_MARKER: &str = "NOTAG";

/// Structural shape of a tag: `#` followed by 3-10 uppercase letters or digits.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[A-Z0-9]{3,10}").expect("tag pattern is a valid regex"));

/// Turns free-form model output into a trustworthy player tag, or nothing.
///
/// Validation order:
/// - `NOTAG` anywhere in the answer (any case) wins over everything else
/// - only the first `#XXX` token is considered
/// - digit-only tokens are rejected
/// - tokens using a glyph outside the alphabet are rejected
///
/// The validator holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct TagValidator {
    alphabet: TagAlphabet,
}

impl TagValidator {
    pub fn new(alphabet: TagAlphabet) -> Self {
        Self { alphabet }
    }

    pub fn alphabet(&self) -> &TagAlphabet {
        &self.alphabet
    }

    pub fn validate(&self, answer: &str) -> TagOutcome {
        if answer.to_uppercase().contains(NO_TAG_MARKER) {
            return TagOutcome::NotFound(Rejection::Marker);
        }

        let Some(candidate) = TAG_PATTERN.find(answer).map(|m| m.as_str()) else {
            return TagOutcome::NotFound(Rejection::NoMatch);
        };

        let body = &candidate[1..];

        // The model sometimes echoes a date or counter it mistook for a tag.
        if body.chars().all(|ch| ch.is_ascii_digit()) {
            return TagOutcome::NotFound(Rejection::Numeric(candidate.to_string()));
        }

        if let Some(glyph) = self.alphabet.first_disallowed(body) {
            return TagOutcome::NotFound(Rejection::DisallowedGlyph {
                candidate: candidate.to_string(),
                glyph,
            });
        }

        TagOutcome::Found(candidate.to_string())
    }
}
