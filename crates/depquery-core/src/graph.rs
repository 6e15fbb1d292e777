//! Dependency graph model.
//!
//! `DependencyGraph` stores resolved packages as nodes of a petgraph
//! `StableDiGraph` and dependency relationships as edges. A dependency that
//! could not be resolved has no target node; such "missing" edges are kept
//! beside the petgraph storage so they can still be selected by name and type.
//!
//! The query engine works with [`NodeRef`] and [`EdgeRef`] handles, which pair
//! an `Arc<DependencyGraph>` with an index. Handles are ordered and hashed by
//! (graph id, index), so selections taken from several graphs can share a set.

use crate::dep_id::{DepId, DepIdKind};
use crate::error::GraphError;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef as _;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique graph identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

// ============================================================================
// Edge Types
// ============================================================================

/// Dependency relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyType {
    #[default]
    Prod,
    Dev,
    Peer,
    PeerOptional,
    Optional,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Prod => "prod",
            DependencyType::Dev => "dev",
            DependencyType::Peer => "peer",
            DependencyType::PeerOptional => "peerOptional",
            DependencyType::Optional => "optional",
        }
    }

    pub fn is_peer(&self) -> bool {
        matches!(self, DependencyType::Peer | DependencyType::PeerOptional)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, DependencyType::Optional | DependencyType::PeerOptional)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prod" => Ok(DependencyType::Prod),
            "dev" => Ok(DependencyType::Dev),
            "peer" => Ok(DependencyType::Peer),
            "peerOptional" => Ok(DependencyType::PeerOptional),
            "optional" => Ok(DependencyType::Optional),
            other => Err(GraphError::InvalidDependencyType(other.to_string())),
        }
    }
}

/// Requested specifier of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSpec {
    /// Specifier as written by the dependent (`^1.0.0`, `file:../a`, ...)
    pub bare_spec: String,
    /// Whether an override replaced the original specifier
    #[serde(default)]
    pub overridden: bool,
}

impl EdgeSpec {
    pub fn new(bare_spec: impl Into<String>) -> Self {
        Self {
            bare_spec: bare_spec.into(),
            overridden: false,
        }
    }

    pub fn overridden(mut self) -> Self {
        self.overridden = true;
        self
    }
}

/// Edge payload: one named dependency of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
    pub spec: EdgeSpec,
}

impl Dependency {
    pub fn new(name: impl Into<String>, dep_type: DependencyType, spec: EdgeSpec) -> Self {
        Self {
            name: name.into(),
            dep_type,
            spec,
        }
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// Lifecycle-script build state of an installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    #[default]
    None,
    Needed,
    Built,
    Failed,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::None => "none",
            BuildState::Needed => "needed",
            BuildState::Built => "built",
            BuildState::Failed => "failed",
        }
    }
}

impl FromStr for BuildState {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BuildState::None),
            "needed" => Ok(BuildState::Needed),
            "built" => Ok(BuildState::Built),
            "failed" => Ok(BuildState::Failed),
            other => Err(GraphError::InvalidBuildState(other.to_string())),
        }
    }
}

/// A resolved package instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: DepId,
    pub name: String,
    pub version: Option<String>,
    /// Package manifest (package.json contents)
    pub manifest: Option<Value>,
    /// Install location relative to the project root
    pub location: String,
    pub dev: bool,
    pub optional: bool,
    /// Node declares its own dependencies (project root or workspace)
    pub importer: bool,
    /// Node is the project root
    pub main_importer: bool,
    /// Manifest name/version disagree with the resolved identity
    pub confused: bool,
    pub build_state: BuildState,
}

impl Node {
    /// Create a node; name and version default to those encoded in a registry id.
    pub fn new(id: DepId) -> Self {
        let name = id.package_name().unwrap_or_default().to_string();
        let version = id.package_version().map(str::to_string);
        Self {
            id,
            name,
            version,
            manifest: None,
            location: String::new(),
            dev: false,
            optional: false,
            importer: false,
            main_importer: false,
            confused: false,
            build_state: BuildState::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_manifest(mut self, manifest: Value) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_build_state(mut self, state: BuildState) -> Self {
        self.build_state = state;
        self
    }

    /// Mark the node as the project root.
    pub fn as_main_importer(mut self) -> Self {
        self.importer = true;
        self.main_importer = true;
        self
    }

    /// Mark the node as a workspace importer.
    pub fn as_importer(mut self) -> Self {
        self.importer = true;
        self
    }

    pub fn kind(&self) -> DepIdKind {
        self.id.kind()
    }

    /// `private: true` in the manifest.
    pub fn is_private(&self) -> bool {
        self.manifest
            .as_ref()
            .and_then(|m| m.get("private"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ============================================================================
// Graph
// ============================================================================

/// Address of an edge: linked edges live in petgraph, missing ones beside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKey {
    Linked(EdgeIndex),
    Missing(usize),
}

#[derive(Debug, Clone)]
struct MissingEdge {
    from: NodeIndex,
    dependency: Dependency,
}

/// In-memory dependency graph.
#[derive(Debug)]
pub struct DependencyGraph {
    id: GraphId,
    graph: StableDiGraph<Node, Dependency>,
    node_index_map: HashMap<DepId, NodeIndex>,
    /// Tombstoned (`None`) when replaced so keys stay stable
    missing: Vec<Option<MissingEdge>>,
    missing_by_node: HashMap<NodeIndex, Vec<usize>>,
    main_importer: Option<NodeIndex>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            id: GraphId::next(),
            graph: StableDiGraph::new(),
            node_index_map: HashMap::new(),
            missing: Vec::new(),
            missing_by_node: HashMap::new(),
            main_importer: None,
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges, resolved and missing.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count() + self.missing.iter().flatten().count()
    }

    /// A graph is local when it knows its project root.
    pub fn is_local(&self) -> bool {
        self.main_importer.is_some()
    }

    /// Add a node, or return the index of the node already registered under its id.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.node_index_map.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let main = node.main_importer;
        let idx = self.graph.add_node(node);
        self.node_index_map.insert(id, idx);
        if main {
            self.main_importer = Some(idx);
        }
        idx
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.graph.node_weight_mut(idx)
    }

    pub fn index_of(&self, id: &DepId) -> Option<NodeIndex> {
        self.node_index_map.get(id).copied()
    }

    /// Link `from` to `to` (or record a missing dependency when `to` is `None`).
    ///
    /// Nodes hold one outgoing edge per dependency name; an existing edge with
    /// the same name is replaced.
    pub fn add_edge(
        &mut self,
        from: NodeIndex,
        to: Option<NodeIndex>,
        dependency: Dependency,
    ) -> EdgeKey {
        self.remove_named_edge(from, &dependency.name);
        match to {
            Some(to) => EdgeKey::Linked(self.graph.add_edge(from, to, dependency)),
            None => {
                let key = self.missing.len();
                self.missing.push(Some(MissingEdge { from, dependency }));
                self.missing_by_node.entry(from).or_default().push(key);
                EdgeKey::Missing(key)
            }
        }
    }

    fn remove_named_edge(&mut self, from: NodeIndex, name: &str) {
        let linked = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .find(|e| e.weight().name == name)
            .map(|e| e.id());
        if let Some(edge) = linked {
            self.graph.remove_edge(edge);
        }

        if let Some(keys) = self.missing_by_node.get_mut(&from) {
            let missing = &mut self.missing;
            keys.retain(|&key| {
                let matches = missing[key]
                    .as_ref()
                    .is_some_and(|m| m.dependency.name == name);
                if matches {
                    missing[key] = None;
                }
                !matches
            });
        }
    }

    /// Add `node` as a dependency of `from`, inheriting dev/optional flags.
    ///
    /// A child is dev when reached through a dev edge or from a dev parent,
    /// and optional when reached through an optional edge or from an optional
    /// parent. Flags accumulate when a node is placed more than once.
    pub fn place_package(
        &mut self,
        from: NodeIndex,
        dep_type: DependencyType,
        spec: impl Into<String>,
        node: Node,
    ) -> NodeIndex {
        let (parent_dev, parent_optional) = self
            .node(from)
            .map(|n| (n.dev, n.optional))
            .unwrap_or((false, false));
        let name = node.name.clone();
        let to = self.add_node(node);
        if let Some(child) = self.node_mut(to) {
            child.dev |= parent_dev || dep_type == DependencyType::Dev;
            child.optional |= parent_optional || dep_type.is_optional();
        }
        self.add_edge(
            from,
            Some(to),
            Dependency::new(name, dep_type, EdgeSpec::new(spec)),
        );
        to
    }

    /// Record a dependency of `from` that did not resolve to any node.
    pub fn add_missing(
        &mut self,
        from: NodeIndex,
        name: impl Into<String>,
        dep_type: DependencyType,
        spec: impl Into<String>,
    ) -> EdgeKey {
        self.add_edge(
            from,
            None,
            Dependency::new(name, dep_type, EdgeSpec::new(spec)),
        )
    }

    fn dependency(&self, key: EdgeKey) -> Option<&Dependency> {
        match key {
            EdgeKey::Linked(e) => self.graph.edge_weight(e),
            EdgeKey::Missing(i) => self.missing.get(i)?.as_ref().map(|m| &m.dependency),
        }
    }

    fn endpoints(&self, key: EdgeKey) -> Option<(NodeIndex, Option<NodeIndex>)> {
        match key {
            EdgeKey::Linked(e) => self.graph.edge_endpoints(e).map(|(a, b)| (a, Some(b))),
            EdgeKey::Missing(i) => self.missing.get(i)?.as_ref().map(|m| (m.from, None)),
        }
    }

    fn outgoing_keys(&self, idx: NodeIndex) -> Vec<EdgeKey> {
        let mut keys: Vec<EdgeKey> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| EdgeKey::Linked(e.id()))
            .collect();
        if let Some(missing) = self.missing_by_node.get(&idx) {
            keys.extend(missing.iter().map(|&i| EdgeKey::Missing(i)));
        }
        keys
    }

    fn incoming_keys(&self, idx: NodeIndex) -> Vec<EdgeKey> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| EdgeKey::Linked(e.id()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Handle accessors
    // ------------------------------------------------------------------------

    pub fn node_ref(self: &Arc<Self>, index: NodeIndex) -> Option<NodeRef> {
        self.graph.contains_node(index).then(|| NodeRef {
            graph: Arc::clone(self),
            index,
        })
    }

    /// All nodes in insertion order.
    pub fn nodes(self: &Arc<Self>) -> Vec<NodeRef> {
        self.graph
            .node_indices()
            .map(|index| NodeRef {
                graph: Arc::clone(self),
                index,
            })
            .collect()
    }

    /// All edges, resolved and missing.
    pub fn edges(self: &Arc<Self>) -> Vec<EdgeRef> {
        let mut keys: Vec<EdgeKey> = self.graph.edge_indices().map(EdgeKey::Linked).collect();
        keys.extend(
            self.missing
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_some())
                .map(|(i, _)| EdgeKey::Missing(i)),
        );
        keys.into_iter()
            .map(|key| EdgeRef {
                graph: Arc::clone(self),
                key,
            })
            .collect()
    }

    pub fn find(self: &Arc<Self>, id: &DepId) -> Option<NodeRef> {
        self.index_of(id).and_then(|idx| self.node_ref(idx))
    }

    pub fn find_by_name(self: &Arc<Self>, name: &str) -> Vec<NodeRef> {
        self.nodes().into_iter().filter(|n| n.name == name).collect()
    }

    /// The project root, when the graph is local.
    pub fn main_importer(self: &Arc<Self>) -> Option<NodeRef> {
        self.main_importer.and_then(|idx| self.node_ref(idx))
    }

    /// The project root followed by every workspace.
    pub fn importers(self: &Arc<Self>) -> Vec<NodeRef> {
        self.nodes().into_iter().filter(|n| n.importer).collect()
    }

    /// Workspace importers (importers other than the project root).
    pub fn workspaces(self: &Arc<Self>) -> Vec<NodeRef> {
        self.nodes()
            .into_iter()
            .filter(|n| n.importer && !n.main_importer)
            .collect()
    }
}

// ============================================================================
// Handles
// ============================================================================

/// Shared handle to a node of a graph.
#[derive(Clone)]
pub struct NodeRef {
    graph: Arc<DependencyGraph>,
    index: NodeIndex,
}

impl NodeRef {
    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    fn key(&self) -> (GraphId, NodeIndex) {
        (self.graph.id, self.index)
    }

    fn edge(&self, key: EdgeKey) -> EdgeRef {
        EdgeRef {
            graph: Arc::clone(&self.graph),
            key,
        }
    }

    /// Outgoing edges sorted by dependency name, missing ones included.
    pub fn edges_out(&self) -> Vec<EdgeRef> {
        let mut edges: Vec<EdgeRef> = self
            .graph
            .outgoing_keys(self.index)
            .into_iter()
            .map(|key| self.edge(key))
            .collect();
        edges.sort_by(|a, b| a.name().cmp(b.name()));
        edges
    }

    /// Outgoing edge for a dependency name.
    pub fn edge_out(&self, name: &str) -> Option<EdgeRef> {
        self.edges_out().into_iter().find(|e| e.name() == name)
    }

    /// Incoming resolved edges.
    pub fn edges_in(&self) -> Vec<EdgeRef> {
        self.graph
            .incoming_keys(self.index)
            .into_iter()
            .map(|key| self.edge(key))
            .collect()
    }
}

impl Deref for NodeRef {
    type Target = Node;

    fn deref(&self) -> &Node {
        // Handles are only built for indices present in the graph and the
        // graph is immutable once shared.
        &self.graph.graph[self.index]
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for NodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Shared handle to an edge of a graph.
#[derive(Clone)]
pub struct EdgeRef {
    graph: Arc<DependencyGraph>,
    key: EdgeKey,
}

impl EdgeRef {
    pub fn key(&self) -> EdgeKey {
        self.key
    }

    pub fn dependency(&self) -> &Dependency {
        // Keys come from the graph that owns them and are never tombstoned
        // after the graph is shared.
        match self.graph.dependency(self.key) {
            Some(dependency) => dependency,
            None => unreachable!("edge handle outlived its edge"),
        }
    }

    pub fn name(&self) -> &str {
        &self.dependency().name
    }

    pub fn dep_type(&self) -> DependencyType {
        self.dependency().dep_type
    }

    pub fn spec(&self) -> &EdgeSpec {
        &self.dependency().spec
    }

    pub fn from(&self) -> NodeRef {
        let (from, _) = self.endpoints();
        NodeRef {
            graph: Arc::clone(&self.graph),
            index: from,
        }
    }

    /// Target node, `None` for a missing dependency.
    pub fn to(&self) -> Option<NodeRef> {
        let (_, to) = self.endpoints();
        to.map(|index| NodeRef {
            graph: Arc::clone(&self.graph),
            index,
        })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.key, EdgeKey::Missing(_))
    }

    fn endpoints(&self) -> (NodeIndex, Option<NodeIndex>) {
        match self.graph.endpoints(self.key) {
            Some(ends) => ends,
            None => unreachable!("edge handle outlived its edge"),
        }
    }

    fn sort_key(&self) -> (GraphId, EdgeKey) {
        (self.graph.id, self.key)
    }
}

impl PartialEq for EdgeRef {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for EdgeRef {}

impl Hash for EdgeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl PartialOrd for EdgeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Debug for EdgeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to = self
            .to()
            .map(|n| n.id.to_string())
            .unwrap_or_else(|| "<missing>".to_string());
        write!(
            f,
            "EdgeRef({} -[{}:{}]-> {})",
            self.from().id,
            self.dep_type(),
            self.name(),
            to
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> Node {
        Node::new(DepId::registry(name, "1.0.0"))
    }

    #[test]
    fn test_add_node_dedupes_by_id() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node(pkg("a"));
        let again = graph.add_node(pkg("a"));
        assert_eq!(a, again);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_main_importer_tracking() {
        let mut graph = DependencyGraph::new();
        assert!(!graph.is_local());
        graph.add_node(Node::new(DepId::file(".")).with_name("root").as_main_importer());
        assert!(graph.is_local());

        let graph = Arc::new(graph);
        assert_eq!(graph.main_importer().unwrap().name, "root");
        assert_eq!(graph.importers().len(), 1);
        assert!(graph.workspaces().is_empty());
    }

    #[test]
    fn test_place_package_propagates_flags() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).as_main_importer());
        let b = graph.place_package(root, DependencyType::Dev, "^1.0.0", pkg("b"));
        let c = graph.place_package(b, DependencyType::Prod, "^1.0.0", pkg("c"));
        let f = graph.place_package(c, DependencyType::Optional, "^1.0.0", pkg("f"));
        let a = graph.place_package(root, DependencyType::Prod, "^1.0.0", pkg("a"));

        assert!(graph.node(b).unwrap().dev);
        assert!(graph.node(c).unwrap().dev);
        assert!(graph.node(f).unwrap().dev);
        assert!(graph.node(f).unwrap().optional);
        assert!(!graph.node(c).unwrap().optional);
        assert!(!graph.node(a).unwrap().dev);
    }

    #[test]
    fn test_edges_are_name_keyed() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).as_main_importer());
        graph.add_missing(root, "a", DependencyType::Prod, "^1.0.0");
        assert_eq!(graph.edge_count(), 1);

        graph.place_package(root, DependencyType::Prod, "^1.0.0", pkg("a"));
        assert_eq!(graph.edge_count(), 1);

        let graph = Arc::new(graph);
        let root = graph.main_importer().unwrap();
        let edges = root.edges_out();
        assert_eq!(edges.len(), 1);
        assert!(!edges[0].is_missing());
        assert_eq!(edges[0].to().unwrap().name, "a");
    }

    #[test]
    fn test_missing_edges() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).as_main_importer());
        graph.place_package(root, DependencyType::Prod, "^1.0.0", pkg("a"));
        graph.add_missing(root, "ghost", DependencyType::Peer, "^2.0.0");

        let graph = Arc::new(graph);
        let root = graph.main_importer().unwrap();
        let edges = root.edges_out();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].name(), "ghost");
        assert!(edges[1].to().is_none());
        assert_eq!(edges[1].from(), root);
        assert_eq!(edges[1].dep_type(), DependencyType::Peer);
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_edges_in() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_node(Node::new(DepId::file(".")).as_main_importer());
        let b = graph.place_package(root, DependencyType::Prod, "1", pkg("b"));
        graph.place_package(root, DependencyType::Prod, "1", pkg("e"));
        graph.place_package(b, DependencyType::Prod, "1", pkg("e"));

        let graph = Arc::new(graph);
        let e = graph.find(&DepId::registry("e", "1.0.0")).unwrap();
        let parents: Vec<String> = e.edges_in().iter().map(|edge| edge.from().id.to_string()).collect();
        assert_eq!(parents.len(), 2);
        assert!(parents.contains(&"··b@1.0.0".to_string()));
    }

    #[test]
    fn test_handles_order_by_graph_then_index() {
        let mut first = DependencyGraph::new();
        first.add_node(pkg("a"));
        let mut second = DependencyGraph::new();
        second.add_node(pkg("a"));

        let first = Arc::new(first);
        let second = Arc::new(second);
        let a1 = first.nodes().remove(0);
        let a2 = second.nodes().remove(0);
        assert_ne!(a1, a2);
        assert!(a1 < a2);
        assert_eq!(a1.clone(), a1);
    }

    #[test]
    fn test_private_manifest() {
        let node = pkg("a").with_manifest(serde_json::json!({ "private": true }));
        assert!(node.is_private());
        assert!(!pkg("b").is_private());
    }
}
