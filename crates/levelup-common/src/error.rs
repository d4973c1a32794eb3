//! Error types for LevelUp.

use crate::ids::EntityKind;
use thiserror::Error;

/// Top-level error type for LevelUp operations.
#[derive(Debug, Error)]
pub enum LevelUpError {
    /// An entity with the same id is already present in the target collection
    #[error("Duplicate {kind} id: {id}")]
    DuplicateKey {
        /// Kind of entity being inserted
        kind: EntityKind,
        /// Conflicting id
        id: String,
    },

    /// A looked up id is absent
    #[error("{kind} not found: {id}")]
    MissingKey {
        /// Kind of entity looked up
        kind: EntityKind,
        /// Missing id
        id: String,
    },

    /// An operation needing at least one element ran on an empty collection
    #[error("World {owner} has no {kind} entries")]
    EmptyCollection {
        /// Kind of element the collection holds
        kind: EntityKind,
        /// Id of the owning entity
        owner: String,
    },

    /// A stored type tag does not name any known variant
    #[error("Unknown {kind} type: {tag}")]
    UnknownType {
        /// Kind of entity being decoded
        kind: EntityKind,
        /// The unrecognized tag
        tag: String,
    },

    /// Malformed serialized representation
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl LevelUpError {
    /// Shorthand for a [`LevelUpError::DuplicateKey`].
    #[must_use]
    pub fn duplicate(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::DuplicateKey {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`LevelUpError::MissingKey`].
    #[must_use]
    pub fn missing(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::MissingKey {
            kind,
            id: id.into(),
        }
    }
}

impl From<serde_json::Error> for LevelUpError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            Self::Deserialization(err.to_string())
        } else {
            Self::Serialization(err.to_string())
        }
    }
}

/// Result type alias for LevelUp operations.
pub type LevelUpResult<T> = Result<T, LevelUpError>;
