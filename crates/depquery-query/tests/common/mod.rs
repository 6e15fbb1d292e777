//! Shared fixtures for depquery-query integration tests.
//!
//! `fixtures/project.json` describes:
//!
//! ```text
//! my-project -> a (prod), b (dev), e (prod), @x/y (dev, file)
//! b          -> c (prod), d (prod)
//! d          -> e (prod), f (optional)
//! util       -> tool (prod, git), a (peer), ghost (missing)
//! ```

#![allow(dead_code)]

use depquery_core::{DependencyGraph, GraphDocument, InMemorySecurityArchive, SecurityArchive};
use depquery_query::{Query, QueryOptions, QueryResponse};
use std::sync::Arc;

const PROJECT: &str = include_str!("../fixtures/project.json");
const ARCHIVE: &str = include_str!("../fixtures/archive.json");

pub fn project_graph() -> Arc<DependencyGraph> {
    let document = GraphDocument::from_json(PROJECT).expect("valid graph fixture");
    Arc::new(document.into_graph().expect("consistent graph fixture"))
}

pub fn project_archive() -> Arc<dyn SecurityArchive> {
    let archive: InMemorySecurityArchive =
        serde_json::from_str(ARCHIVE).expect("valid archive fixture");
    Arc::new(archive)
}

/// Query over the project graph with its security archive.
pub fn project_query() -> Query {
    Query::new(QueryOptions::new(project_graph()).with_security_archive(project_archive()))
}

/// Sorted node names of a response.
pub fn names(response: &QueryResponse) -> Vec<String> {
    let mut names: Vec<String> = response.nodes.iter().map(|n| n.name.clone()).collect();
    names.sort();
    names
}

/// Sorted edge names of a response.
pub fn edge_names(response: &QueryResponse) -> Vec<String> {
    let mut names: Vec<String> = response.edges.iter().map(|e| e.name().to_string()).collect();
    names.sort();
    names
}

pub async fn select(query: &Query, selector: &str) -> Vec<String> {
    let response = query
        .search(selector, None)
        .await
        .unwrap_or_else(|e| panic!("'{}' failed: {}", selector, e));
    names(&response)
}
