//! Evaluation state threaded through the walker.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::host::HostContexts;
use crate::registry::RegistryClient;
use depquery_core::{EdgeRef, NodeRef, SecurityArchive, SpecOptions};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A point-in-time selection of nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSelectionState {
    pub nodes: BTreeSet<NodeRef>,
    pub edges: BTreeSet<EdgeRef>,
}

impl GraphSelectionState {
    pub fn new(nodes: BTreeSet<NodeRef>, edges: BTreeSet<EdgeRef>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Union `other` into this selection.
    pub fn extend(&mut self, other: &GraphSelectionState) {
        self.nodes.extend(other.nodes.iter().cloned());
        self.edges.extend(other.edges.iter().cloned());
    }
}

/// Shared, read-only collaborators of one `search` call.
#[derive(Debug)]
pub struct QueryEnv {
    pub spec_options: Arc<SpecOptions>,
    pub host_contexts: Option<Arc<HostContexts>>,
    pub registry: Arc<RegistryClient>,
    pub signal: CancellationToken,
}

/// Per-frame evaluator context.
///
/// The top-level walk gets one frame. `:is` and `:not` evaluate their
/// arguments in frames built by [`ParserState::nested`], `:has` in frames
/// built by [`ParserState::nested_in_scope`]. Nested evaluation never writes
/// to the parent's `partial`.
#[derive(Debug, Clone)]
pub struct ParserState<'a> {
    pub current: &'a Ast,
    pub prev: Option<&'a Ast>,
    pub next: Option<&'a Ast>,
    /// Selection fixed at the start of the current clause (`:scope`)
    pub initial: GraphSelectionState,
    /// Live working selection
    pub partial: GraphSelectionState,
    /// Confirmed matches
    pub collect: GraphSelectionState,
    /// Skip grammar errors instead of failing
    pub loose: bool,
    pub importers: BTreeSet<NodeRef>,
    pub security_archive: Option<Arc<dyn SecurityArchive>>,
    pub env: Arc<QueryEnv>,
}

impl<'a> ParserState<'a> {
    /// Derived frame evaluating `ast` against a snapshot of the current selection.
    pub fn nested(&self, ast: &'a Ast, loose: bool) -> ParserState<'a> {
        self.nested_from(ast, self.partial.clone(), loose)
    }

    /// Derived frame evaluating `ast` against the clause scope (`initial`).
    pub fn nested_in_scope(&self, ast: &'a Ast, loose: bool) -> ParserState<'a> {
        self.nested_from(ast, self.initial.clone(), loose)
    }

    fn nested_from(
        &self,
        ast: &'a Ast,
        start: GraphSelectionState,
        loose: bool,
    ) -> ParserState<'a> {
        ParserState {
            current: ast,
            prev: None,
            next: None,
            initial: start.clone(),
            partial: start,
            collect: GraphSelectionState::default(),
            loose,
            importers: self.importers.clone(),
            security_archive: self.security_archive.clone(),
            env: Arc::clone(&self.env),
        }
    }

    /// Cancellation checkpoint; also yields so an abort can land.
    pub async fn cancellable(&self) -> Result<(), QueryError> {
        if self.env.signal.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        tokio::task::yield_now().await;
        if self.env.signal.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        Ok(())
    }

    pub fn security_archive(&self, selector: &str) -> Result<Arc<dyn SecurityArchive>, QueryError> {
        self.security_archive
            .clone()
            .ok_or_else(|| QueryError::MissingSecurityArchive(selector.to_string()))
    }

    // ========================================================================
    // Selection helpers
    // ========================================================================

    /// Remove a node and every edge pointing at it.
    pub fn remove_node(&mut self, node: &NodeRef) {
        self.partial.nodes.remove(node);
        for edge in node.edges_in() {
            self.partial.edges.remove(&edge);
        }
    }

    pub fn remove_edge(&mut self, edge: &EdgeRef) {
        self.partial.edges.remove(edge);
    }

    /// Keep only nodes matching `keep`, dropping incoming edges of the rest.
    pub fn retain_nodes(&mut self, mut keep: impl FnMut(&NodeRef) -> bool) {
        let removed: Vec<NodeRef> = self
            .partial
            .nodes
            .iter()
            .filter(|n| !keep(*n))
            .cloned()
            .collect();
        for node in &removed {
            self.remove_node(node);
        }
    }

    pub fn retain_edges(&mut self, keep: impl FnMut(&EdgeRef) -> bool) {
        self.partial.edges.retain(keep);
    }

    /// Drop edges whose target is missing or no longer selected.
    pub fn remove_dangling_edges(&mut self) {
        let nodes = &self.partial.nodes;
        self.partial
            .edges
            .retain(|edge| edge.to().is_some_and(|to| nodes.contains(&to)));
    }

    /// Drop nodes that no selected edge points at.
    pub fn remove_unlinked_nodes(&mut self) {
        let linked: BTreeSet<NodeRef> = self
            .partial
            .edges
            .iter()
            .filter_map(EdgeRef::to)
            .collect();
        self.retain_nodes(|node| linked.contains(node));
    }
}
