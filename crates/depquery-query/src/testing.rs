//! Shared fixtures for unit tests.

use crate::ast::Ast;
use crate::parser::parse;
use crate::registry::RegistryClient;
use crate::state::{GraphSelectionState, ParserState, QueryEnv};
use crate::walker::walk;
use depquery_core::{
    DepId, DependencyGraph, DependencyType, InMemorySecurityArchive, Node, NodeRef,
    SecurityArchive, SpecOptions,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn package(name: &str, version: &str) -> Node {
    Node::new(DepId::registry(name, version))
        .with_manifest(json!({ "name": name, "version": version }))
        .with_location(format!("node_modules/{}", name))
}

/// ```text
/// root -> a (prod)
/// root -> b (dev) -> c (prod)
///                 -> d (prod) -> e (prod)
///                             -> f (optional)
/// root -> e (prod)
/// root -> @x/y (dev, file)
/// ```
pub(crate) fn fixture_graph() -> Arc<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    let root = graph.add_node(
        Node::new(DepId::file("."))
            .with_name("my-project")
            .with_version("1.0.0")
            .with_manifest(json!({ "name": "my-project", "version": "1.0.0", "private": true }))
            .with_location(".")
            .as_main_importer(),
    );

    let a = package("a", "1.0.0").with_manifest(json!({
        "name": "a",
        "version": "1.0.0",
        "license": "MIT",
        "keywords": ["cli", "tool"],
        "scripts": { "install": "node-gyp rebuild" },
        "contributors": [{ "name": "alice" }, { "name": "bob" }],
    }));
    graph.place_package(root, DependencyType::Prod, "^1.0.0", a);
    let b = graph.place_package(root, DependencyType::Dev, "^2.0.0", package("b", "2.3.0"));
    graph.place_package(b, DependencyType::Prod, "~1.2.0", package("c", "1.2.3"));
    let d = graph.place_package(b, DependencyType::Prod, "^3.0.0-beta.1", package("d", "3.0.0-beta.1"));
    graph.place_package(d, DependencyType::Prod, "^1.0.0", package("e", "1.0.0"));
    graph.place_package(d, DependencyType::Optional, "0.1.0", package("f", "0.1.0"));
    graph.place_package(root, DependencyType::Prod, "^1.0.0", package("e", "1.0.0"));
    graph.place_package(
        root,
        DependencyType::Dev,
        "file:./y",
        Node::new(DepId::file("./y"))
            .with_name("@x/y")
            .with_version("1.0.0")
            .with_manifest(json!({ "name": "@x/y", "version": "1.0.0" }))
            .with_location("./y"),
    );
    Arc::new(graph)
}

/// Archive flagging `a` (install scripts, critical CVE), `c` (no author) and `e` (shell, mild CVE).
pub(crate) fn fixture_archive() -> Arc<dyn SecurityArchive> {
    let archive: InMemorySecurityArchive = serde_json::from_value(json!({
        "··a@1.0.0": {
            "alerts": [
                { "type": "installScripts" },
                { "type": "criticalCVE", "props": { "cveId": "CVE-2023-1234", "cwes": [{ "id": "CWE-79" }] } },
                { "type": "copyleftLicense" }
            ],
            "score": { "overall": 0.9, "supplyChain": 0.4 }
        },
        "··e@1.0.0": {
            "alerts": [
                { "type": "shellAccess" },
                { "type": "mildCVE", "props": { "cveId": "CVE-2024-0001" } },
                { "type": "didYouMean" }
            ],
            "score": { "overall": 0.3, "supplyChain": 0.8 }
        },
        "··c@1.2.3": { "alerts": [{ "type": "missingAuthor" }], "score": { "overall": 0.5 } }
    }))
    .expect("valid archive fixture");
    Arc::new(archive)
}

/// Top-level frame over every node and edge of `graph`.
pub(crate) fn frame(
    graph: &Arc<DependencyGraph>,
    archive: Option<Arc<dyn SecurityArchive>>,
) -> ParserState<'static> {
    frame_with_env(graph, archive, test_env(SpecOptions::default()))
}

pub(crate) fn test_env(spec_options: SpecOptions) -> Arc<QueryEnv> {
    Arc::new(QueryEnv {
        spec_options: Arc::new(spec_options),
        host_contexts: None,
        registry: Arc::new(RegistryClient::default()),
        signal: CancellationToken::new(),
    })
}

pub(crate) fn frame_with_env(
    graph: &Arc<DependencyGraph>,
    archive: Option<Arc<dyn SecurityArchive>>,
    env: Arc<QueryEnv>,
) -> ParserState<'static> {
    let ast: &'static Ast = Box::leak(Box::new(Ast::Root { nodes: Vec::new() }));
    let all = GraphSelectionState::new(
        graph.nodes().into_iter().collect(),
        graph.edges().into_iter().collect(),
    );
    ParserState {
        current: ast,
        prev: None,
        next: None,
        initial: all.clone(),
        partial: all,
        collect: GraphSelectionState::default(),
        loose: false,
        importers: graph.importers().into_iter().collect(),
        security_archive: archive,
        env,
    }
}

/// Parse and walk `query` from `state`, returning the collected selection.
pub(crate) async fn run(
    query: &str,
    mut state: ParserState<'static>,
) -> Result<GraphSelectionState, crate::QueryError> {
    let ast: &'static Ast = Box::leak(Box::new(parse(query)?));
    state.current = ast;
    Ok(walk(state).await?.collect)
}

/// Sorted node names.
pub(crate) fn names(nodes: &BTreeSet<NodeRef>) -> Vec<String> {
    let mut names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
    names.sort();
    names
}
