use std::fmt;

use thiserror::Error;

/// Maximum length of an idea identifier
pub const MAX_IDEA_ID_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("idea id is empty")]
    Empty,
    #[error("invalid length: at most {max} chars, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("invalid character {ch:?} in idea id")]
    InvalidChar { ch: char },
}

/// Identifier of an idea, and therefore of its repository directory.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted so the id is always a
/// single, non-special path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdeaId(String);

impl IdeaId {
    /// Parse and validate an idea id
    pub fn parse(raw: &str) -> Result<Self, IdParseError> {
        if raw.is_empty() {
            return Err(IdParseError::Empty);
        }
        if raw.len() > MAX_IDEA_ID_LEN {
            return Err(IdParseError::TooLong {
                max: MAX_IDEA_ID_LEN,
                actual: raw.len(),
            });
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdParseError::InvalidChar { ch });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdeaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generate a random version identifier (32 lowercase hex chars)
pub fn generate_version_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Check whether a string has the shape of a generated version id
pub fn is_version_id(candidate: &str) -> bool {
    candidate.len() == 32
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
