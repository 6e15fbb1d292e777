//! DepQuery Query - Dependency Selector Syntax engine
//!
//! Selects packages and dependency edges from a [`DependencyGraph`] with
//! CSS-like selectors:
//!
//! - **Parser**: selector string to [`Ast`], with scoped-name and literal-dot escaping
//! - **Walker**: recursive evaluator over a [`GraphSelectionState`]
//! - **Combinators**: child (`>`), descendant (` `) and sibling (`~`)
//! - **Attributes**: manifest lookups (`[license=MIT]`, `:attr(engines, [node])`)
//! - **Pseudo-selectors**: structural, relationship, identity, semver,
//!   registry-backed and security-archive filters
//! - **Query facade**: cached, cancellable [`Query::search`]
//!
//! # Example
//!
//! ```ignore
//! use depquery_query::{Query, QueryOptions};
//!
//! let query = Query::new(QueryOptions::new(graph));
//! let response = query.search(":root > .prod:not([license=MIT])", None).await?;
//! for node in &response.nodes {
//!     println!("{}", node.id);
//! }
//! ```
//!
//! [`DependencyGraph`]: depquery_core::DependencyGraph

pub mod ast;
pub mod attribute;
pub mod error;
pub mod host;
pub mod parser;
pub mod query;
pub mod registry;
pub mod state;

mod class;
mod combinator;
mod id;
mod pseudo;
mod walker;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use ast::{Ast, AttributeSelector};
pub use attribute::Operator;
pub use error::QueryError;
pub use host::{HostContext, HostContextSource, HostContexts};
pub use parser::{escape_dots, parse, unescape_dots};
pub use pseudo::remote::OutdatedKind;
pub use pseudo::versioning::SemverFn;
pub use pseudo::Verb;
pub use query::{Query, QueryOptions, QueryResponse};
pub use registry::{Packument, RegistryClient, RegistryError, RemoteLookup};
pub use state::GraphSelectionState;
