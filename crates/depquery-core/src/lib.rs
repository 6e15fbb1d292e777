//! DepQuery Core - Dependency graph model
//!
//! This crate provides the read-only data model the selector engine queries:
//!
//! - [`DependencyGraph`]: packages and their (possibly unresolved) dependencies
//! - [`NodeRef`] / [`EdgeRef`]: shared, ordered handles into a graph
//! - [`DepId`]: provenance-aware package identity
//! - [`SpecOptions`]: registry aliases and git host templates
//! - [`SecurityArchive`]: per-package alerts and scores
//! - [`GraphDocument`]: JSON serialization of a resolved graph
//! - [`range`]: npm version range matching

pub mod dep_id;
pub mod document;
pub mod error;
pub mod graph;
pub mod range;
pub mod security;
pub mod spec_options;

pub use dep_id::{DepId, DepIdKind};
pub use document::{EdgeDocument, GraphDocument, NodeDocument};
pub use error::GraphError;
pub use graph::{
    BuildState, Dependency, DependencyGraph, DependencyType, EdgeKey, EdgeRef, EdgeSpec,
    GraphId, Node, NodeRef,
};
pub use security::{
    Alert, InMemorySecurityArchive, PackageReport, Score, ScoreKind, SecurityArchive,
};
pub use spec_options::{SpecOptions, DEFAULT_REGISTRY};
