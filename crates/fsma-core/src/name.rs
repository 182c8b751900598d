//! # Transition Names
//!
//! Newtype wrapper for transition identifiers. A name is unique within one
//! entity type's transition table and doubles as the routable path segment
//! once underscores are rendered as hyphens.

use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// Maximum length of a transition name.
pub const MAX_NAME_LEN: usize = 64;

/// Validated transition name: `[a-z][a-z0-9_]*`, at most 64 characters.
///
/// Serializes as a plain string. Deserialization re-validates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransitionName(String);

impl TransitionName {
    /// Create a validated transition name.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong {
                max: MAX_NAME_LEN,
                len: name.len(),
            });
        }
        for (position, ch) in name.char_indices() {
            let ok = if position == 0 {
                ch.is_ascii_lowercase()
            } else {
                ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'
            };
            if !ok {
                return Err(NameError::InvalidCharacter {
                    name: name.clone(),
                    ch,
                    position,
                });
            }
        }
        Ok(Self(name))
    }

    /// The name as declared, e.g. `submit_for_review`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The externally routable path segment, e.g. `submit-for-review`.
    pub fn url_segment(&self) -> String {
        self.0.replace('_', "-")
    }
}

impl std::fmt::Display for TransitionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransitionName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TransitionName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransitionName> for String {
    fn from(name: TransitionName) -> Self {
        name.0
    }
}

impl PartialEq<&str> for TransitionName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
