//! JSON graph documents.
//!
//! A graph document is the serialized form of a resolved dependency graph:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "file·.", "name": "my-app", "mainImporter": true },
//!     { "id": "··a@1.0.0" }
//!   ],
//!   "edges": [
//!     { "from": "file·.", "to": "··a@1.0.0", "name": "a", "type": "prod", "spec": "^1.0.0" },
//!     { "from": "file·.", "to": null, "name": "ghost", "spec": "^2.0.0" }
//!   ]
//! }
//! ```
//!
//! Flags are taken as written; no dev/optional propagation happens on load.

use crate::dep_id::DepId;
use crate::error::GraphError;
use crate::graph::{BuildState, Dependency, DependencyGraph, DependencyType, EdgeSpec, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub edges: Vec<EdgeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub id: DepId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub manifest: Option<Value>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub dev: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub importer: bool,
    #[serde(default)]
    pub main_importer: bool,
    #[serde(default)]
    pub confused: bool,
    #[serde(default)]
    pub build_state: BuildState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub from: DepId,
    #[serde(default)]
    pub to: Option<DepId>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub dep_type: DependencyType,
    #[serde(default = "default_spec")]
    pub spec: String,
    #[serde(default)]
    pub overridden: bool,
}

fn default_spec() -> String {
    "*".to_string()
}

impl NodeDocument {
    fn into_node(self) -> Node {
        let manifest_str = |key: &str| {
            self.manifest
                .as_ref()
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let name = self
            .name
            .clone()
            .or_else(|| self.id.package_name().map(str::to_string))
            .or_else(|| manifest_str("name"))
            .or_else(|| self.id.path().map(str::to_string))
            .unwrap_or_default();
        let version = self
            .version
            .clone()
            .or_else(|| self.id.package_version().map(str::to_string))
            .or_else(|| manifest_str("version"));

        let mut node = Node::new(self.id)
            .with_name(name)
            .with_build_state(self.build_state);
        node.version = version;
        node.manifest = self.manifest;
        node.location = self.location.unwrap_or_default();
        node.dev = self.dev;
        node.optional = self.optional;
        node.importer = self.importer || self.main_importer;
        node.main_importer = self.main_importer;
        node.confused = self.confused;
        node
    }
}

impl GraphDocument {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the in-memory graph described by this document.
    pub fn into_graph(self) -> Result<DependencyGraph, GraphError> {
        let mut graph = DependencyGraph::new();
        for node in self.nodes {
            graph.add_node(node.into_node());
        }

        for edge in self.edges {
            let from = graph
                .index_of(&edge.from)
                .ok_or_else(|| GraphError::unknown_node(edge.from.to_string()))?;
            let to = match &edge.to {
                Some(id) => Some(
                    graph
                        .index_of(id)
                        .ok_or_else(|| GraphError::unknown_node(id.to_string()))?,
                ),
                None => None,
            };
            let spec = EdgeSpec {
                bare_spec: edge.spec,
                overridden: edge.overridden,
            };
            graph.add_edge(from, to, Dependency::new(edge.name, edge.dep_type, spec));
        }

        debug!(
            "Loaded graph document: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const DOC: &str = r#"{
        "nodes": [
            { "id": "file·.", "name": "app", "mainImporter": true },
            { "id": "··a@1.0.0", "manifest": { "name": "a", "version": "1.0.0" } },
            { "id": "file·./linked", "manifest": { "name": "linked", "version": "0.1.0" }, "dev": true }
        ],
        "edges": [
            { "from": "file·.", "to": "··a@1.0.0", "name": "a", "spec": "^1.0.0" },
            { "from": "file·.", "to": "file·./linked", "name": "linked", "type": "dev", "spec": "file:./linked" },
            { "from": "file·.", "to": null, "name": "ghost", "type": "peer", "spec": "^2.0.0", "overridden": true }
        ]
    }"#;

    #[test]
    fn test_load_document() {
        let graph = Arc::new(GraphDocument::from_json(DOC).unwrap().into_graph().unwrap());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);

        let root = graph.main_importer().unwrap();
        assert_eq!(root.name, "app");
        assert!(root.importer);

        let linked = graph.find(&DepId::file("./linked")).unwrap();
        assert_eq!(linked.name, "linked");
        assert_eq!(linked.version.as_deref(), Some("0.1.0"));
        assert!(linked.dev);

        let ghost = root.edge_out("ghost").unwrap();
        assert!(ghost.to().is_none());
        assert!(ghost.spec().overridden);
        assert_eq!(ghost.dep_type(), DependencyType::Peer);
        assert_eq!(root.edge_out("a").unwrap().dep_type(), DependencyType::Prod);
    }

    #[test]
    fn test_unknown_edge_endpoint() {
        let doc = r#"{
            "nodes": [{ "id": "file·." }],
            "edges": [{ "from": "file·.", "to": "··nope@1.0.0", "name": "nope" }]
        }"#;
        let err = GraphDocument::from_json(doc).unwrap().into_graph().unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
