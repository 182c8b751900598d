//! # Error Types
//!
//! Errors raised while declaring transitions. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! Runtime failures (guard rejection, permission denial, mutation errors)
//! are not modelled here; they belong to the layer that executes
//! transitions on behalf of a caller.

use thiserror::Error;

/// A transition name failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty or whitespace.
    #[error("transition name must not be empty")]
    Empty,

    /// The name exceeds the maximum length.
    #[error("transition name exceeds {max} characters: {len}")]
    TooLong {
        /// Maximum permitted length.
        max: usize,
        /// Actual length.
        len: usize,
    },

    /// The name contains a character outside `[a-z0-9_]`, or does not
    /// start with a lowercase letter.
    #[error("invalid character {ch:?} at position {position} in transition name {name:?}")]
    InvalidCharacter {
        /// The rejected name.
        name: String,
        /// The offending character.
        ch: char,
        /// Byte offset of the offending character.
        position: usize,
    },
}

/// A transition table could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Two transitions on the same field share a name.
    #[error("duplicate transition {name:?} on field {field:?}")]
    DuplicateTransition {
        /// The state field the table belongs to.
        field: String,
        /// The repeated transition name.
        name: String,
    },

    /// The entity type declares no transitions on the requested field.
    #[error("no transitions declared on field {0:?}")]
    UnknownField(String),

    /// A transition name in the declaration is invalid.
    #[error(transparent)]
    InvalidName(#[from] NameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_transition_message_names_field_and_transition() {
        let err = TableError::DuplicateTransition {
            field: "state".to_string(),
            name: "approve".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("approve"));
        assert!(msg.contains("state"));
    }

    #[test]
    fn name_error_converts_into_table_error() {
        let err: TableError = NameError::Empty.into();
        assert_eq!(err, TableError::InvalidName(NameError::Empty));
        assert_eq!(err.to_string(), "transition name must not be empty");
    }
}
