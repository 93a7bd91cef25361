use super::edge::{Edge, Handle};
use super::node::{Node, NodeKind};
use crate::error::GraphError;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// A snapshot of the pipeline graph.
///
/// Both collections are keyed by `id`. Their array order is the insertion order
/// and is the deterministic iteration order used by validation and compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a graph from JSON and checks its referential integrity.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let state: GraphState =
            serde_json::from_str(json).map_err(|e| GraphError::JsonParseError(e.to_string()))?;
        state.check_integrity()?;
        Ok(state)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Verifies that node ids are unique and every edge endpoint exists.
    pub fn check_integrity(&self) -> Result<(), GraphError> {
        let mut seen = AHashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing_node_id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.node(node_id).is_some()
    }

    pub fn node_kind(&self, node_id: &str) -> Option<NodeKind> {
        self.node(node_id).map(Node::kind)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    /// Whether any edge joins `source_id` to `target_id`, whatever its handles.
    pub fn has_connection(&self, source_id: &str, target_id: &str) -> bool {
        self.edges.iter().any(|e| e.connects(source_id, target_id))
    }

    /// Edges arriving at `handle` on `node_id`, in edge order.
    pub fn incoming<'a>(
        &'a self,
        node_id: &'a str,
        handle: Handle,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.targets(node_id, handle))
    }

    pub fn incident_edge_count(&self, node_id: &str) -> usize {
        self.edges.iter().filter(|e| e.touches(node_id)).count()
    }
}
