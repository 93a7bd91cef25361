use super::edge::Edge;
use super::node::{Node, NodeData, NodeId, NodeKind, NodePatch, Position};
use super::state::GraphState;
use crate::error::GraphError;
use crate::validation::connection;
use log::debug;
use std::fmt;

/// Addresses an edge either by its id or by its endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRef {
    Id(String),
    Endpoints { source_id: String, target_id: String },
}

impl fmt::Display for ConnectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRef::Id(id) => write!(f, "'{}'", id),
            ConnectionRef::Endpoints {
                source_id,
                target_id,
            } => write!(f, "'{}' -> '{}'", source_id, target_id),
        }
    }
}

/// The mutation contract the validators and the tool engine work against.
///
/// Every operation is synchronous and total: it never panics, and failure is
/// reported through the return value or as a no-op on unknown ids.
pub trait GraphMutator {
    /// Read access to the current graph.
    fn state(&self) -> &GraphState;

    /// Adds a node with default data for `kind` and returns its new id.
    fn add_node(&mut self, kind: NodeKind, position: Position) -> NodeId;

    /// Applies a partial data update. No-op on unknown ids, kind mismatches and
    /// locked nodes.
    fn update_node_data(&mut self, node_id: &str, patch: NodePatch) -> bool;

    /// Removes the node and every edge whose source or target is the node.
    fn delete_node(&mut self, node_id: &str) -> bool;

    /// Adds a well-typed edge unless one already joins the same pair of nodes.
    fn add_connection(
        &mut self,
        source_id: &str,
        target_id: &str,
        source_handle: &str,
        target_handle: &str,
    ) -> bool;

    fn delete_connection(&mut self, reference: &ConnectionRef) -> bool;
}

/// A point-in-time copy of a store, used to roll back a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    state: GraphState,
    next_node: u64,
    next_seq: u64,
}

impl GraphSnapshot {
    pub fn state(&self) -> &GraphState {
        &self.state
    }
}

/// The owned, in-memory graph container.
#[derive(Debug, Clone)]
pub struct GraphStore {
    state: GraphState,
    next_node: u64,
    next_seq: u64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            state: GraphState::default(),
            next_node: 1,
            next_seq: 1,
        }
    }

    /// Wraps an existing graph, continuing its creation sequence.
    pub fn from_state(state: GraphState) -> Result<Self, GraphError> {
        state.check_integrity()?;
        let next_seq = state
            .nodes
            .iter()
            .map(|n| n.created_seq)
            .max()
            .map_or(1, |max| max + 1);
        let next_node = state.nodes.len() as u64 + 1;
        Ok(Self {
            state,
            next_node,
            next_seq,
        })
    }

    pub fn into_state(self) -> GraphState {
        self.state
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            state: self.state.clone(),
            next_node: self.next_node,
            next_seq: self.next_seq,
        }
    }

    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        debug!(
            "Restoring graph snapshot with {} nodes and {} edges",
            snapshot.state.nodes.len(),
            snapshot.state.edges.len()
        );
        self.state = snapshot.state;
        self.next_node = snapshot.next_node;
        self.next_seq = snapshot.next_seq;
    }

    fn fresh_node_id(&mut self, kind: NodeKind) -> NodeId {
        loop {
            let candidate = format!("{}-{}", kind.as_str(), self.next_node);
            self.next_node += 1;
            if !self.state.contains_node(&candidate) {
                return candidate;
            }
        }
    }

    fn fresh_edge_id(&self, source_id: &str, target_id: &str) -> String {
        let base = format!("edge-{}-{}", source_id, target_id);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.state.edge(&candidate).is_some() {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}

impl GraphMutator for GraphStore {
    fn state(&self) -> &GraphState {
        &self.state
    }

    fn add_node(&mut self, kind: NodeKind, position: Position) -> NodeId {
        let id = self.fresh_node_id(kind);
        let created_seq = self.next_seq;
        self.next_seq += 1;
        self.state.nodes.push(Node {
            id: id.clone(),
            position,
            created_seq,
            data: NodeData::default_for(kind),
        });
        debug!("Added {} node '{}' at ({}, {})", kind, id, position.x, position.y);
        id
    }

    fn update_node_data(&mut self, node_id: &str, patch: NodePatch) -> bool {
        let Some(node) = self.state.node_mut(node_id) else {
            return false;
        };
        let applied = node.data.apply(patch);
        if applied {
            debug!("Updated data of node '{}'", node_id);
        }
        applied
    }

    fn delete_node(&mut self, node_id: &str) -> bool {
        let Some(index) = self.state.nodes.iter().position(|n| n.id == node_id) else {
            return false;
        };
        self.state.nodes.remove(index);
        let before = self.state.edges.len();
        self.state.edges.retain(|e| !e.touches(node_id));
        debug!(
            "Deleted node '{}' and {} incident edges",
            node_id,
            before - self.state.edges.len()
        );
        true
    }

    fn add_connection(
        &mut self,
        source_id: &str,
        target_id: &str,
        source_handle: &str,
        target_handle: &str,
    ) -> bool {
        if !connection::is_compatible(
            &self.state,
            source_id,
            target_id,
            source_handle,
            target_handle,
        ) {
            return false;
        }
        if self.state.has_connection(source_id, target_id) {
            return false;
        }
        let id = self.fresh_edge_id(source_id, target_id);
        debug!("Connected '{}' -> '{}' as '{}'", source_id, target_id, id);
        self.state.edges.push(Edge {
            id,
            source_node_id: source_id.to_string(),
            target_node_id: target_id.to_string(),
            source_handle: source_handle.to_string(),
            target_handle: target_handle.to_string(),
        });
        true
    }

    fn delete_connection(&mut self, reference: &ConnectionRef) -> bool {
        let before = self.state.edges.len();
        match reference {
            ConnectionRef::Id(id) => self.state.edges.retain(|e| &e.id != id),
            ConnectionRef::Endpoints {
                source_id,
                target_id,
            } => self
                .state
                .edges
                .retain(|e| !e.connects(source_id, target_id)),
        }
        let removed = before - self.state.edges.len();
        if removed > 0 {
            debug!("Removed connection {}", reference);
        }
        removed > 0
    }
}
