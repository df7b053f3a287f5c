use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Glyphs the upstream tag format is known to use.
///
/// Narrower than the `[A-Z0-9]` shape the matcher accepts: it drops
/// characters the vision model tends to hallucinate for blurry glyphs.
pub const DEFAULT_TAG_ALPHABET: &str = "0289PYLQGRJCUVO";

/// Allow-list of characters a player tag may contain after the `#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAlphabet {
    chars: BTreeSet<char>,
}

impl TagAlphabet {
    pub fn contains(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }

    /// First character of `s` outside the alphabet, if any.
    pub fn first_disallowed(&self, s: &str) -> Option<char> {
        s.chars().find(|ch| !self.contains(*ch))
    }
}

impl Default for TagAlphabet {
    fn default() -> Self {
        Self {
            chars: DEFAULT_TAG_ALPHABET.chars().collect(),
        }
    }
}

impl FromStr for TagAlphabet {
    type Err = InvalidAlphabet;

    /// Parse an alphabet such as `"0289PYLQGRJCUVO"`. Whitespace and commas
    /// between characters are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = BTreeSet::new();
        for ch in s.chars().filter(|c| !c.is_whitespace() && *c != ',') {
            if !(ch.is_ascii_uppercase() || ch.is_ascii_digit()) {
                return Err(InvalidAlphabet::Character(ch));
            }
            chars.insert(ch);
        }
        if chars.is_empty() {
            return Err(InvalidAlphabet::Empty);
        }
        Ok(Self { chars })
    }
}

impl fmt::Display for TagAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|ch| write!(f, "{ch}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAlphabet {
    #[error("tag alphabet is empty")]
    Empty,

    #[error("tag alphabet may only contain A-Z and 0-9, found {0:?}")]
    Character(char),
}

/// Why a model answer did not yield a usable tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The model answered with the explicit "no tag visible" marker.
    Marker,
    /// Nothing tag-shaped appears in the answer.
    NoMatch,
    /// The candidate is digits only.
    Numeric(String),
    /// The candidate uses a glyph outside the alphabet.
    DisallowedGlyph { candidate: String, glyph: char },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Marker => write!(f, "model reported no visible tag"),
            Rejection::NoMatch => write!(f, "no tag-shaped token in answer"),
            Rejection::Numeric(candidate) => write!(f, "candidate {candidate} is numeric only"),
            Rejection::DisallowedGlyph { candidate, glyph } => {
                write!(f, "candidate {candidate} contains disallowed glyph {glyph:?}")
            }
        }
    }
}

/// Result of validating one model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// Validated tag, including the leading `#`.
    Found(String),
    NotFound(Rejection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alphabet() {
        let alphabet = TagAlphabet::default();
        for ch in DEFAULT_TAG_ALPHABET.chars() {
            assert!(alphabet.contains(ch));
        }
        assert!(!alphabet.contains('A'));
        assert!(!alphabet.contains('1'));
        assert!(!alphabet.contains('#'));
    }

    #[test]
    fn test_parse_ignores_separators() {
        let alphabet: TagAlphabet = "P, Y, 2 8".parse().unwrap();
        assert_eq!(alphabet.to_string(), "28PY");
    }

    #[test]
    fn test_parse_rejects_lowercase_and_empty() {
        assert_eq!("PYq".parse::<TagAlphabet>(), Err(InvalidAlphabet::Character('q')));
        assert_eq!(" , ".parse::<TagAlphabet>(), Err(InvalidAlphabet::Empty));
    }

    #[test]
    fn test_first_disallowed() {
        let alphabet = TagAlphabet::default();
        assert_eq!(alphabet.first_disallowed("2YLJ"), None);
        assert_eq!(alphabet.first_disallowed("2YAB"), Some('A'));
    }
}
