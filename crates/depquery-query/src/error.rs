//! Error types for parsing and evaluating selectors.

use thiserror::Error;

/// Errors that can occur while parsing or evaluating a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Malformed selector syntax
    #[error("failed to parse selector '{query}' at position {position}: {message}")]
    Parse {
        query: String,
        position: usize,
        message: String,
    },

    /// Selector node that is only valid as a pseudo-selector argument
    #[error("unsupported selector: {kind} '{value}'")]
    UnsupportedSelector { kind: String, value: String },

    /// Unknown `:pseudo` verb
    #[error("unsupported pseudo-class: :{0}")]
    UnknownPseudo(String),

    /// Unknown `.class`
    #[error("unsupported class: .{0}")]
    UnknownClass(String),

    /// Unknown attribute comparison operator
    #[error("unsupported attribute operator: {0}")]
    UnsupportedOperator(String),

    /// Unknown or unsupported combinator
    #[error("unsupported combinator: '{0}'")]
    UnsupportedCombinator(String),

    /// Malformed pseudo-selector argument
    #[error("invalid argument for :{pseudo}: {message}")]
    InvalidArgument { pseudo: String, message: String },

    /// Selector needs a security archive but none was provided
    #[error(":{0} requires a security archive")]
    MissingSecurityArchive(String),

    /// Selector needs importer metadata the graph does not have
    #[error(":{0} requires a local graph with importer metadata")]
    NotLocalGraph(String),

    /// `:host` used without host contexts
    #[error(":host requires host contexts to be configured")]
    MissingHostContexts,

    /// `:host` named a context that is not configured
    #[error("unknown host context: {0}")]
    UnknownHostContext(String),

    /// Host context loader failed
    #[error("failed to load host context '{name}': {message}")]
    HostContext { name: String, message: String },

    /// The query was aborted through its cancellation token
    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    /// Create a Parse error.
    pub fn parse(query: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            query: query.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an UnsupportedSelector error.
    pub fn unsupported_selector(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnsupportedSelector {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(pseudo: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            pseudo: pseudo.into(),
            message: message.into(),
        }
    }

    /// Create a HostContext error.
    pub fn host_context(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostContext {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Query-authoring mistakes that loose evaluation suppresses.
    ///
    /// Missing collaborators, host failures and cancellation are never
    /// suppressed.
    pub fn is_grammar(&self) -> bool {
        matches!(
            self,
            QueryError::UnsupportedSelector { .. }
                | QueryError::UnknownPseudo(_)
                | QueryError::UnknownClass(_)
                | QueryError::UnsupportedOperator(_)
                | QueryError::UnsupportedCombinator(_)
                | QueryError::InvalidArgument { .. }
        )
    }
}
