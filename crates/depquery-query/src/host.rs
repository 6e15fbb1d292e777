//! Host contexts: named external graphs reachable through `:host(<name>)`.
//!
//! A host context replaces the whole evaluation context of the current
//! clause (`initial`, `partial`, importers and security archive), so the
//! rest of the clause runs against another graph.

use crate::ast::Ast;
use crate::error::QueryError;
use crate::pseudo::required_arg;
use crate::state::{GraphSelectionState, ParserState};
use async_trait::async_trait;
use depquery_core::{DependencyGraph, NodeRef, SecurityArchive};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Evaluation context produced by a host.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub initial: GraphSelectionState,
    pub partial: GraphSelectionState,
    pub importers: BTreeSet<NodeRef>,
    pub security_archive: Option<Arc<dyn SecurityArchive>>,
}

impl HostContext {
    /// Context selecting every node and edge of `graph`.
    pub fn from_graph(
        graph: &Arc<DependencyGraph>,
        security_archive: Option<Arc<dyn SecurityArchive>>,
    ) -> Self {
        let all = GraphSelectionState::new(
            graph.nodes().into_iter().collect(),
            graph.edges().into_iter().collect(),
        );
        Self {
            initial: all.clone(),
            partial: all,
            importers: graph.importers().into_iter().collect(),
            security_archive,
        }
    }
}

/// Asynchronous producer of a [`HostContext`].
///
/// Implemented for any `Fn() -> impl Future<Output = Result<HostContext, QueryError>>`.
#[async_trait]
pub trait HostContextSource: Send + Sync {
    async fn load(&self) -> Result<HostContext, QueryError>;
}

#[async_trait]
impl<F, Fut> HostContextSource for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HostContext, QueryError>> + Send + 'static,
{
    async fn load(&self) -> Result<HostContext, QueryError> {
        (self)().await
    }
}

/// Named host context sources.
#[derive(Clone, Default)]
pub struct HostContexts {
    sources: HashMap<String, Arc<dyn HostContextSource>>,
}

impl HostContexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl HostContextSource + 'static) {
        self.sources.insert(name.into(), Arc::new(source));
    }

    pub fn with_source(
        mut self,
        name: impl Into<String>,
        source: impl HostContextSource + 'static,
    ) -> Self {
        self.insert(name, source);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn HostContextSource>> {
        self.sources.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for HostContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContexts")
            .field("names", &self.names())
            .finish()
    }
}

/// `:host(<name>)`
pub(crate) async fn host(state: &mut ParserState<'_>, args: &[Ast]) -> Result<(), QueryError> {
    let contexts = state
        .env
        .host_contexts
        .clone()
        .ok_or(QueryError::MissingHostContexts)?;
    let name = required_arg("host", args)?;
    let source = contexts
        .get(&name)
        .ok_or_else(|| QueryError::UnknownHostContext(name.clone()))?;

    debug!("Loading host context '{}'", name);
    let context = source.load().await.map_err(|e| match e {
        QueryError::Cancelled => QueryError::Cancelled,
        QueryError::HostContext { .. } => e,
        other => QueryError::host_context(&name, other.to_string()),
    })?;
    state.cancellable().await?;

    state.initial = context.initial;
    state.partial = context.partial;
    state.importers = context.importers;
    state.security_archive = context.security_archive;
    Ok(())
}
