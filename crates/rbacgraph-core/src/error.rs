//! Errors raised by the graph model.

use thiserror::Error;

use crate::model::RelationshipKind;

/// Contract violations detected while constructing graph entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Malformed {kind} relationship: missing required property '{missing}'")]
    MalformedRelationship {
        kind: RelationshipKind,
        missing: &'static str,
    },

    #[error("Invalid relationship property key: '{0}'")]
    InvalidPropertyKey(String),

    #[error("Unknown relationship kind: {0}")]
    UnknownRelationshipKind(String),
}

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;
