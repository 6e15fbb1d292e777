//! Query facade: selection setup, evaluation and result cache.

use crate::error::QueryError;
use crate::host::HostContexts;
use crate::parser::parse;
use crate::registry::RegistryClient;
use crate::state::{GraphSelectionState, ParserState, QueryEnv};
use crate::walker::walk;
use depquery_core::{DependencyGraph, EdgeRef, NodeRef, SecurityArchive, SpecOptions};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything a [`Query`] evaluates against.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub graph: Arc<DependencyGraph>,
    pub security_archive: Option<Arc<dyn SecurityArchive>>,
    pub spec_options: SpecOptions,
    /// Named graphs reachable through `:host(<name>)`
    pub host_contexts: Option<HostContexts>,
    /// Client used by `:outdated` and `:published`
    pub registry: Arc<RegistryClient>,
    /// Treat grammar errors as empty matches at the top level
    pub loose: bool,
}

impl QueryOptions {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self {
            graph,
            security_archive: None,
            spec_options: SpecOptions::default(),
            host_contexts: None,
            registry: Arc::new(RegistryClient::default()),
            loose: false,
        }
    }

    pub fn with_security_archive(mut self, archive: Arc<dyn SecurityArchive>) -> Self {
        self.security_archive = Some(archive);
        self
    }

    pub fn with_spec_options(mut self, spec_options: SpecOptions) -> Self {
        self.spec_options = spec_options;
        self
    }

    pub fn with_host_contexts(mut self, host_contexts: HostContexts) -> Self {
        self.host_contexts = Some(host_contexts);
        self
    }

    pub fn with_registry(mut self, registry: RegistryClient) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_loose(mut self, loose: bool) -> Self {
        self.loose = loose;
        self
    }
}

/// Matched nodes and edges, in graph order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub nodes: Vec<NodeRef>,
    pub edges: Vec<EdgeRef>,
}

impl QueryResponse {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

impl From<GraphSelectionState> for QueryResponse {
    fn from(selection: GraphSelectionState) -> Self {
        Self {
            nodes: selection.nodes.into_iter().collect(),
            edges: selection.edges.into_iter().collect(),
        }
    }
}

/// Selector engine bound to one graph snapshot.
///
/// Results are cached per literal query string for the lifetime of the
/// `Query`; build a new one when the graph changes.
pub struct Query {
    graph: Arc<DependencyGraph>,
    security_archive: Option<Arc<dyn SecurityArchive>>,
    spec_options: Arc<SpecOptions>,
    host_contexts: Option<Arc<HostContexts>>,
    registry: Arc<RegistryClient>,
    loose: bool,
    cache: Mutex<HashMap<String, Arc<QueryResponse>>>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("security_archive", &self.security_archive.is_some())
            .field("host_contexts", &self.host_contexts)
            .field("loose", &self.loose)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl Query {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            graph: options.graph,
            security_archive: options.security_archive,
            spec_options: Arc::new(options.spec_options),
            host_contexts: options.host_contexts.map(Arc::new),
            registry: options.registry,
            loose: options.loose,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    /// Evaluate `query` against the graph.
    ///
    /// # Arguments
    /// * `query` - selector string; empty input matches nothing
    /// * `signal` - optional cancellation token for this call
    ///
    /// # Returns
    /// The matches, shared with the cache. A repeated query string returns
    /// the same `Arc` without evaluating again.
    pub async fn search(
        &self,
        query: &str,
        signal: Option<CancellationToken>,
    ) -> Result<Arc<QueryResponse>, QueryError> {
        if query.trim().is_empty() {
            return Ok(Arc::new(QueryResponse::default()));
        }
        if let Some(cached) = self.cached(query) {
            debug!("Query cache hit for '{}'", query);
            return Ok(cached);
        }

        let signal = signal.unwrap_or_default();
        if signal.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let ast = parse(query)?;
        let initial = self.initial_selection();
        debug!(
            "Evaluating '{}' over {} nodes and {} edges",
            query,
            initial.nodes.len(),
            initial.edges.len()
        );

        let env = Arc::new(QueryEnv {
            spec_options: Arc::clone(&self.spec_options),
            host_contexts: self.host_contexts.clone(),
            registry: Arc::clone(&self.registry),
            signal: signal.clone(),
        });
        let state = ParserState {
            current: &ast,
            prev: None,
            next: None,
            initial: initial.clone(),
            partial: initial,
            collect: GraphSelectionState::default(),
            loose: self.loose,
            importers: self.graph.importers().into_iter().collect(),
            security_archive: self.security_archive.clone(),
            env,
        };

        let state = walk(state).await?;
        // Aborted late: the result may be incomplete, never cache it
        if signal.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let response = Arc::new(QueryResponse::from(state.collect));
        debug!(
            "'{}' matched {} nodes and {} edges",
            query,
            response.nodes.len(),
            response.edges.len()
        );
        self.cache
            .lock()
            .insert(query.to_string(), Arc::clone(&response));
        Ok(response)
    }

    /// Cached result for a literal query string.
    pub fn cached(&self, query: &str) -> Option<Arc<QueryResponse>> {
        self.cache.lock().get(query).cloned()
    }

    /// Every node and edge reachable from the graph's nodes, breadth-first.
    fn initial_selection(&self) -> GraphSelectionState {
        let mut nodes: BTreeSet<NodeRef> = BTreeSet::new();
        let mut edges: BTreeSet<EdgeRef> = BTreeSet::new();
        let mut queue: VecDeque<NodeRef> = self.graph.nodes().into();

        while let Some(node) = queue.pop_front() {
            if !nodes.insert(node.clone()) {
                continue;
            }
            for edge in node.edges_out() {
                if let Some(to) = edge.to() {
                    if !nodes.contains(&to) {
                        queue.push_back(to);
                    }
                }
                edges.insert(edge);
            }
        }
        GraphSelectionState::new(nodes, edges)
    }
}
