use super::node::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed connection point on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    DatasetOutput,
    ModelInput,
    ModelOutput,
    TrainingInput,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::DatasetOutput,
        Handle::ModelInput,
        Handle::ModelOutput,
        Handle::TrainingInput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::DatasetOutput => "dataset-output",
            Handle::ModelInput => "model-input",
            Handle::ModelOutput => "model-output",
            Handle::TrainingInput => "training-input",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|handle| handle.as_str() == name)
    }

    /// The kind of node that owns this handle.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Handle::DatasetOutput => NodeKind::Dataset,
            Handle::ModelInput | Handle::ModelOutput => NodeKind::Model,
            Handle::TrainingInput => NodeKind::Training,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The semantic kind of a well-typed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    DatasetToModel,
    ModelToTraining,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 2] = [EdgeKind::DatasetToModel, EdgeKind::ModelToTraining];

    /// The `(source, target)` handle pair of this edge kind.
    pub fn handles(&self) -> (Handle, Handle) {
        match self {
            EdgeKind::DatasetToModel => (Handle::DatasetOutput, Handle::ModelInput),
            EdgeKind::ModelToTraining => (Handle::ModelOutput, Handle::TrainingInput),
        }
    }

    /// The `(source, target)` node kinds this edge kind must join.
    pub fn endpoint_kinds(&self) -> (NodeKind, NodeKind) {
        let (source, target) = self.handles();
        (source.node_kind(), target.node_kind())
    }
}

/// A directed connection between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub source_handle: String,
    pub target_handle: String,
}

impl Edge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    pub fn connects(&self, source_id: &str, target_id: &str) -> bool {
        self.source_node_id == source_id && self.target_node_id == target_id
    }

    pub fn targets(&self, node_id: &str, handle: Handle) -> bool {
        self.target_node_id == node_id && self.target_handle == handle.as_str()
    }
}
