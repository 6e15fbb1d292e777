//! Error types for graph construction and loading.

use thiserror::Error;

/// Errors raised while building or loading a dependency graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A dependency identifier string could not be parsed
    #[error("invalid dependency id '{value}': {reason}")]
    InvalidDepId { value: String, reason: String },

    /// An edge or lookup referenced a node that is not in the graph
    #[error("node not found: {id}")]
    UnknownNode { id: String },

    /// Unknown dependency type name
    #[error("invalid dependency type '{0}'")]
    InvalidDependencyType(String),

    /// Unknown build state name
    #[error("invalid build state '{0}'")]
    InvalidBuildState(String),

    /// Malformed JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Create an InvalidDepId error.
    pub fn invalid_dep_id(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDepId {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownNode error.
    pub fn unknown_node(id: impl Into<String>) -> Self {
        Self::UnknownNode { id: id.into() }
    }
}
