//! `:root`, `:scope`, `:project`, `:empty`, `:missing`, `:has`, `:is`, `:not`.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::{GraphSelectionState, ParserState};
use crate::walker::walk;
use depquery_core::NodeRef;
use std::collections::{BTreeSet, VecDeque};

pub(crate) fn root(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let main = state
        .importers
        .iter()
        .find(|node| node.main_importer)
        .cloned()
        .ok_or_else(|| QueryError::NotLocalGraph("root".to_string()))?;
    state.partial.nodes = BTreeSet::from([main]);
    state.partial.edges.clear();
    Ok(())
}

pub(crate) fn scope(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.partial = state.initial.clone();
    Ok(())
}

pub(crate) fn project(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    if state.importers.is_empty() {
        return Err(QueryError::NotLocalGraph("project".to_string()));
    }
    state.partial.nodes = state.importers.clone();
    state.partial.edges.clear();
    Ok(())
}

pub(crate) fn empty(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_nodes(|node| node.edges_out().is_empty());
    state.remove_dangling_edges();
    Ok(())
}

pub(crate) fn missing(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    state.retain_edges(|edge| edge.to().is_none());
    state.partial.nodes.clear();
    Ok(())
}

/// Where a nested selector starts walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Start {
    /// The candidates being filtered
    Candidates,
    /// The whole clause scope
    Scope,
}

/// Union of the matches of each nested selector.
async fn nested_matches<'a>(
    state: &ParserState<'a>,
    args: &'a [Ast],
    start: Start,
    loose: bool,
) -> Result<GraphSelectionState, QueryError> {
    let mut matches = GraphSelectionState::default();
    for arg in args {
        let frame = match start {
            Start::Candidates => state.nested(arg, loose),
            Start::Scope => state.nested_in_scope(arg, loose),
        };
        let frame = walk(frame).await?;
        matches.extend(&frame.collect);
    }
    Ok(matches)
}

/// Nodes with a dependency among the nested matches.
///
/// The nested selectors search the whole clause scope, so `:root:has(#a)`
/// and `*:has(#a)` keep the same root.
pub(crate) async fn has<'a>(
    state: &mut ParserState<'a>,
    args: &'a [Ast],
) -> Result<(), QueryError> {
    let matches = nested_matches(state, args, Start::Scope, state.loose).await?;
    let ancestors = ancestors(&matches.nodes);

    state.retain_nodes(|node| {
        let edges = node.edges_out();
        !edges.is_empty()
            && ancestors.contains(node)
            && edges.iter().any(|edge| matches.edges.contains(edge))
    });
    state.remove_dangling_edges();
    Ok(())
}

/// Every node that reaches one of `nodes` through incoming edges.
fn ancestors(nodes: &BTreeSet<NodeRef>) -> BTreeSet<NodeRef> {
    let mut seen: BTreeSet<NodeRef> = BTreeSet::new();
    let mut queue: VecDeque<NodeRef> = nodes.iter().cloned().collect();
    while let Some(node) = queue.pop_front() {
        for edge in node.edges_in() {
            let parent = edge.from();
            if seen.insert(parent.clone()) {
                queue.push_back(parent);
            }
        }
    }
    seen
}

/// Keep what any nested selector matches; invalid nested selectors match nothing.
pub(crate) async fn is<'a>(state: &mut ParserState<'a>, args: &'a [Ast]) -> Result<(), QueryError> {
    let matches = nested_matches(state, args, Start::Candidates, true).await?;
    state.retain_nodes(|node| matches.nodes.contains(node));
    state.retain_edges(|edge| matches.edges.contains(edge));
    Ok(())
}

/// Drop what any nested selector matches.
pub(crate) async fn not<'a>(
    state: &mut ParserState<'a>,
    args: &'a [Ast],
) -> Result<(), QueryError> {
    if let Some(arg) = args.iter().find(|arg| !matches!(arg, Ast::Selector { .. })) {
        return Err(QueryError::parse(
            arg.to_string(),
            0,
            "expected a selector inside :not()",
        ));
    }
    let matches = nested_matches(state, args, Start::Candidates, false).await?;
    for node in &matches.nodes {
        state.remove_node(node);
    }
    for edge in &matches.edges {
        state.remove_edge(edge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_graph, frame, names, run};
    use depquery_core::{DepId, DependencyGraph, DependencyType, Node};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_root_and_project() {
        let graph = fixture_graph();
        let result = run(":root", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["my-project"]);
        assert!(result.edges.is_empty());

        let result = run(":project", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["my-project"]);
    }

    #[tokio::test]
    async fn test_root_requires_local_graph() {
        let mut graph = DependencyGraph::new();
        graph.add_node(Node::new(DepId::registry("a", "1.0.0")));
        let graph = Arc::new(graph);

        let err = run(":root", frame(&graph, None)).await.unwrap_err();
        assert_eq!(err, QueryError::NotLocalGraph("root".into()));

        // Never suppressed by loose mode
        let mut state = frame(&graph, None);
        state.loose = true;
        let err = run(":project", state).await.unwrap_err();
        assert_eq!(err, QueryError::NotLocalGraph("project".into()));
    }

    #[tokio::test]
    async fn test_scope_resets_clause() {
        let graph = fixture_graph();
        let result = run("#a:scope", frame(&graph, None)).await.unwrap();
        assert_eq!(result.nodes.len(), graph.node_count());
    }

    #[tokio::test]
    async fn test_empty() {
        let graph = fixture_graph();
        let result = run(":empty", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["@x/y", "a", "c", "e", "f"]);
    }

    #[tokio::test]
    async fn test_missing() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).with_name("root").as_main_importer());
        graph.place_package(root, DependencyType::Prod, "1", Node::new(DepId::registry("a", "1.0.0")));
        graph.add_missing(root, "ghost", DependencyType::Prod, "^2");
        let graph = Arc::new(graph);

        let result = run(":missing", frame(&graph, None)).await.unwrap();
        assert!(result.nodes.is_empty());
        let edges: Vec<&str> = result.edges.iter().map(|e| e.name()).collect();
        assert_eq!(edges, vec!["ghost"]);
    }

    #[tokio::test]
    async fn test_has() {
        let graph = fixture_graph();
        let result = run("*:has(> #c)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["b"]);

        let result = run("*:has(#e)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["d", "my-project"]);

        let result = run("*:has(#nope)", frame(&graph, None)).await.unwrap();
        assert!(result.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_has_searches_clause_scope() {
        let graph = fixture_graph();
        let result = run(":root:has(#a)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["my-project"]);

        let result = run("#d:has(#e)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["d"]);

        // Order of the compound does not matter
        let before = run(":root:has(#e)", frame(&graph, None)).await.unwrap();
        let after = run(":has(#e):root", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&before.nodes), names(&after.nodes));
    }

    #[tokio::test]
    async fn test_is_unions_and_ignores_invalid() {
        let graph = fixture_graph();
        let result = run(":is(#a, #c)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a", "c"]);

        let result = run(":is(:bogus, #a)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a"]);
    }

    #[tokio::test]
    async fn test_not() {
        let graph = fixture_graph();
        let result = run(":not(.dev)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["a", "my-project"]);

        let err = run(":not(:bogus)", frame(&graph, None)).await.unwrap_err();
        assert_eq!(err, QueryError::UnknownPseudo("bogus".into()));
    }

    #[tokio::test]
    async fn test_not_and_is_never_overlap() {
        let graph = fixture_graph();
        for selector in [".dev", ".prod", "#e", "[license=MIT]", ":empty", "* > *"] {
            let not = run(&format!(":not({selector})"), frame(&graph, None)).await.unwrap();
            let is = run(&format!(":is({selector})"), frame(&graph, None)).await.unwrap();
            assert!(
                not.nodes.is_disjoint(&is.nodes),
                "{selector} overlaps"
            );
        }
    }

    #[tokio::test]
    async fn test_has_tolerates_cycles() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).with_name("root").as_main_importer());
        let a = graph.place_package(root, DependencyType::Prod, "1", Node::new(DepId::registry("a", "1.0.0")));
        let b = graph.place_package(a, DependencyType::Prod, "1", Node::new(DepId::registry("b", "1.0.0")));
        graph.place_package(b, DependencyType::Prod, "1", Node::new(DepId::registry("a", "1.0.0")));
        let graph = Arc::new(graph);

        let result = run("*:has(#a)", frame(&graph, None)).await.unwrap();
        assert_eq!(names(&result.nodes), vec!["b", "root"]);
    }
}
