//! Combinators: child (`>`), descendant (space) and sibling (`~`).
//!
//! Each combinator replaces `partial` with the nodes reached from the
//! current selection and the edges used to reach them. Edges without a
//! resolved target are kept but never contribute a node.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::state::{GraphSelectionState, ParserState};
use depquery_core::NodeRef;
use std::collections::BTreeSet;
use tracing::trace;

pub(crate) async fn combinator(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let Ast::Combinator { value } = state.current else {
        return Ok(());
    };
    match value.as_str() {
        ">" => child(state).await,
        " " => descendant(state).await,
        "~" => sibling(state).await,
        other => Err(QueryError::UnsupportedCombinator(other.to_string())),
    }
}

/// Replace the selection with direct dependencies of the selected nodes.
async fn child(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let traverse = std::mem::take(&mut state.partial.nodes);
    state.partial.edges.clear();
    for node in &traverse {
        state.cancellable().await?;
        add_children(&mut state.partial, node);
    }
    Ok(())
}

/// Replace the selection with every transitive dependency of the selected nodes.
async fn descendant(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    // `* { * }` nests without narrowing
    let simple = |ast: Option<&Ast>| ast.is_some_and(Ast::is_universal_or_tag);
    if simple(state.prev) && simple(state.next) {
        return Ok(());
    }

    let mut frontier: Vec<NodeRef> = std::mem::take(&mut state.partial.nodes)
        .into_iter()
        .collect();
    state.partial.edges.clear();
    let mut expanded: BTreeSet<NodeRef> = BTreeSet::new();

    while let Some(node) = frontier.pop() {
        if !expanded.insert(node.clone()) {
            continue;
        }
        state.cancellable().await?;
        for target in add_children(&mut state.partial, &node) {
            if !expanded.contains(&target) {
                frontier.push(target);
            }
        }
    }
    trace!("descendant combinator reached {} nodes", state.partial.nodes.len());
    Ok(())
}

/// Replace the selection with every co-dependency of the selected nodes.
///
/// Dependencies have no order, so every other child of every parent counts.
async fn sibling(state: &mut ParserState<'_>) -> Result<(), QueryError> {
    let traverse = std::mem::take(&mut state.partial.nodes);
    state.partial.edges.clear();
    for node in &traverse {
        state.cancellable().await?;
        for incoming in node.edges_in() {
            for edge in incoming.from().edges_out() {
                let Some(target) = edge.to() else {
                    continue;
                };
                if target == *node {
                    continue;
                }
                state.partial.nodes.insert(target);
                state.partial.edges.insert(edge);
            }
        }
    }
    Ok(())
}

/// Add every outgoing edge of `node` and its resolved targets; returns the targets.
fn add_children(selection: &mut GraphSelectionState, node: &NodeRef) -> Vec<NodeRef> {
    let mut targets = Vec::new();
    for edge in node.edges_out() {
        if let Some(target) = edge.to() {
            selection.nodes.insert(target.clone());
            targets.push(target);
        }
        selection.edges.insert(edge);
    }
    targets
}
