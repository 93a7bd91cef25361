use crate::graph::{GraphState, Handle, NodeId, NodeKind};

/// Best-effort repair of a connection endpoint that does not exist in the graph.
///
/// Assistants sometimes pass a title or a stale id where a node id belongs. When
/// the handle on that side implies a node kind, an implementation may pick a
/// real node of that kind instead. Returning `None` leaves the endpoint
/// unresolved and the call fails.
pub trait EndpointRecovery: Send + Sync {
    fn recover(
        &self,
        state: &GraphState,
        created_node_ids: &[NodeId],
        implied_kind: NodeKind,
    ) -> Option<NodeId>;
}

/// Picks the most recently created node of the implied kind.
///
/// Nodes created earlier in the same turn win; otherwise the graph-wide
/// creation sequence decides, with later array position breaking ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestOfKind;

impl EndpointRecovery for LatestOfKind {
    fn recover(
        &self,
        state: &GraphState,
        created_node_ids: &[NodeId],
        implied_kind: NodeKind,
    ) -> Option<NodeId> {
        created_node_ids
            .iter()
            .rev()
            .find(|id| state.node_kind(id) == Some(implied_kind))
            .cloned()
            .or_else(|| {
                state
                    .nodes_of_kind(implied_kind)
                    .max_by_key(|n| n.created_seq)
                    .map(|n| n.id.clone())
            })
    }
}

/// The node kind a handle name implies, if it is one of the known handles.
pub fn implied_kind(handle: &str) -> Option<NodeKind> {
    Handle::parse(handle).map(|h| h.node_kind())
}
