//! Connection compatibility: decides whether a prospective edge is well-typed.
//!
//! Exactly two handle patterns are legal, `dataset-output -> model-input` and
//! `model-output -> training-input`. A matching handle pair is not enough on
//! its own; the node kinds at both endpoints must agree with the pattern too.

use crate::graph::{EdgeKind, GraphState, Handle};

/// Maps a handle pair onto its edge kind, ignoring the nodes involved.
pub fn edge_kind(source_handle: &str, target_handle: &str) -> Option<EdgeKind> {
    let source = Handle::parse(source_handle)?;
    let target = Handle::parse(target_handle)?;
    EdgeKind::ALL
        .into_iter()
        .find(|kind| kind.handles() == (source, target))
}

/// Whether an edge from `source_id` to `target_id` on the given handles is
/// well-typed in `state`. Multiplicity is not checked here.
pub fn is_compatible(
    state: &GraphState,
    source_id: &str,
    target_id: &str,
    source_handle: &str,
    target_handle: &str,
) -> bool {
    if source_id == target_id {
        return false;
    }
    let Some(kind) = edge_kind(source_handle, target_handle) else {
        return false;
    };
    let (Some(source_kind), Some(target_kind)) =
        (state.node_kind(source_id), state.node_kind(target_id))
    else {
        return false;
    };
    kind.endpoint_kinds() == (source_kind, target_kind)
}
