use super::edge::{Edge, EdgeKind};
use super::node::{Node, NodeData, NodeKind, Position};
use super::state::GraphState;
use crate::error::GraphError;
use serde::Deserialize;
use serde_json::Value;

/// A trait for external graph formats that can be converted into a `GraphState`.
///
/// Implement it on the structs your canvas or storage layer produces; the
/// resulting graph is checked for duplicate ids and dangling edges.
///
/// # Example
///
/// ```rust,no_run
/// use tunegraph::prelude::*;
///
/// struct Pipeline { datasets: usize }
///
/// impl IntoGraph for Pipeline {
///     fn into_graph(self) -> std::result::Result<GraphState, GraphError> {
///         let mut store = GraphStore::new();
///         for i in 0..self.datasets {
///             store.add_node(NodeKind::Dataset, Position::new(0.0, i as f64 * 120.0));
///         }
///         Ok(store.into_state())
///     }
/// }
/// ```
pub trait IntoGraph {
    /// Consumes the object and converts it into the canonical graph.
    fn into_graph(self) -> Result<GraphState, GraphError>;
}

impl IntoGraph for GraphState {
    fn into_graph(self) -> Result<GraphState, GraphError> {
        self.check_integrity()?;
        Ok(self)
    }
}

/// The node-editor export format: `type` carries the kind, `data` the fields.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasExport {
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl CanvasExport {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::JsonParseError(e.to_string()))
    }
}

/// Accepts `dataset`, `Dataset` and `datasetNode` style type names.
fn parse_node_type(node_type: &str) -> Option<NodeKind> {
    let trimmed = node_type.trim();
    let base = trimmed
        .strip_suffix("Node")
        .or_else(|| trimmed.strip_suffix("-node"))
        .unwrap_or(trimmed);
    NodeKind::parse(base)
}

fn convert_node(raw: CanvasNode, created_seq: u64) -> Result<Node, GraphError> {
    let kind = parse_node_type(&raw.node_type).ok_or_else(|| {
        GraphError::ConversionError(format!(
            "node '{}' has unknown type '{}'",
            raw.id, raw.node_type
        ))
    })?;

    let data = match raw.data {
        Value::Null => NodeData::default_for(kind),
        Value::Object(mut fields) => {
            fields.insert("kind".to_string(), Value::from(kind.as_str()));
            if !fields.contains_key("title") {
                let default_title = NodeData::default_for(kind).title().to_string();
                fields.insert("title".to_string(), Value::from(default_title));
            }
            serde_json::from_value(Value::Object(fields)).map_err(|e| {
                GraphError::ConversionError(format!("node '{}' has invalid data: {}", raw.id, e))
            })?
        }
        other => {
            return Err(GraphError::ConversionError(format!(
                "node '{}' data must be an object, found {}",
                raw.id, other
            )));
        }
    };

    Ok(Node {
        id: raw.id,
        position: raw.position,
        created_seq,
        data,
    })
}

impl IntoGraph for CanvasExport {
    fn into_graph(self) -> Result<GraphState, GraphError> {
        let nodes = self
            .nodes
            .into_iter()
            .zip(1u64..)
            .map(|(raw, seq)| convert_node(raw, seq))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = GraphState {
            nodes,
            edges: Vec::with_capacity(self.edges.len()),
        };

        for raw in self.edges {
            // Missing handles default to the canonical pair implied by the source kind.
            let implied = state.node_kind(&raw.source).and_then(|kind| match kind {
                NodeKind::Dataset => Some(EdgeKind::DatasetToModel.handles()),
                NodeKind::Model => Some(EdgeKind::ModelToTraining.handles()),
                NodeKind::Training => None,
            });
            let source_handle = raw
                .source_handle
                .or_else(|| implied.map(|(source, _)| source.as_str().to_string()))
                .unwrap_or_default();
            let target_handle = raw
                .target_handle
                .or_else(|| implied.map(|(_, target)| target.as_str().to_string()))
                .unwrap_or_default();
            let id = raw
                .id
                .unwrap_or_else(|| format!("edge-{}-{}", raw.source, raw.target));

            state.edges.push(Edge {
                id,
                source_node_id: raw.source,
                target_node_id: raw.target,
                source_handle,
                target_handle,
            });
        }

        state.check_integrity()?;
        Ok(state)
    }
}
