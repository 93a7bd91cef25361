//! Common test utilities for building pipeline graphs and tool turns.
use serde_json::Value;
use tunegraph::compiler::JobContext;
use tunegraph::graph::*;
use tunegraph::tools::RawToolInvocation;

pub const N1_URL: &str = "https://data.example.com/n1.jsonl";

/// A dataset node; `content_url` of `None` leaves it without a content reference.
#[allow(dead_code)]
pub fn dataset_node(id: &str, content_url: Option<&str>) -> Node {
    Node {
        id: id.to_string(),
        position: Position::new(0.0, 0.0),
        created_seq: 0,
        data: NodeData::Dataset(DatasetData {
            content_url: content_url.map(str::to_string),
            ..DatasetData::default()
        }),
    }
}

#[allow(dead_code)]
pub fn model_node(id: &str, selected_model_id: Option<&str>) -> Node {
    Node {
        id: id.to_string(),
        position: Position::new(300.0, 0.0),
        created_seq: 0,
        data: NodeData::Model(ModelData {
            selected_model: selected_model_id.map(|model_id| SelectedModel {
                id: model_id.to_string(),
                display_name: model_id.to_string(),
                provider: "Acme".to_string(),
                parameter_count: 7.0,
            }),
            ..ModelData::default()
        }),
    }
}

#[allow(dead_code)]
pub fn training_node(id: &str) -> Node {
    Node {
        id: id.to_string(),
        position: Position::new(600.0, 0.0),
        created_seq: 0,
        data: NodeData::Training(TrainingData::default()),
    }
}

/// A well-typed edge of the given kind, with the store's id convention.
#[allow(dead_code)]
pub fn edge(source: &str, target: &str, kind: EdgeKind) -> Edge {
    let (source_handle, target_handle) = kind.handles();
    Edge {
        id: format!("edge-{}-{}", source, target),
        source_node_id: source.to_string(),
        target_node_id: target.to_string(),
        source_handle: source_handle.as_str().to_string(),
        target_handle: target_handle.as_str().to_string(),
    }
}

/// Builds a graph, numbering `created_seq` in node order.
#[allow(dead_code)]
pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphState {
    let nodes = nodes
        .into_iter()
        .zip(1u64..)
        .map(|(node, seq)| Node {
            created_seq: seq,
            ..node
        })
        .collect();
    GraphState { nodes, edges }
}

/// Dataset `n1` feeding an unselected model `n2`, and no training node.
#[allow(dead_code)]
pub fn scenario_a_graph() -> GraphState {
    graph(
        vec![dataset_node("n1", Some(N1_URL)), model_node("n2", None)],
        vec![edge("n1", "n2", EdgeKind::DatasetToModel)],
    )
}

/// The complete `n1 -> n2 -> n3` pipeline with `acme/small-7b` selected.
#[allow(dead_code)]
pub fn scenario_b_graph() -> GraphState {
    graph(
        vec![
            dataset_node("n1", Some(N1_URL)),
            model_node("n2", Some("acme/small-7b")),
            training_node("n3"),
        ],
        vec![
            edge("n1", "n2", EdgeKind::DatasetToModel),
            edge("n2", "n3", EdgeKind::ModelToTraining),
        ],
    )
}

#[allow(dead_code)]
pub fn job_context() -> JobContext {
    JobContext::new("job-1", "Test project", "assistant")
}

#[allow(dead_code)]
pub fn raw(tool_name: &str, args: Value) -> RawToolInvocation {
    RawToolInvocation::new(tool_name, args)
}

/// Mutable access to a node's training data, panicking on any other kind.
#[allow(dead_code)]
pub fn training_data_mut<'a>(state: &'a mut GraphState, id: &str) -> &'a mut TrainingData {
    match state.node_mut(id).map(|n| &mut n.data) {
        Some(NodeData::Training(data)) => data,
        _ => panic!("'{}' is not a training node", id),
    }
}

#[allow(dead_code)]
pub fn dataset_data_mut<'a>(state: &'a mut GraphState, id: &str) -> &'a mut DatasetData {
    match state.node_mut(id).map(|n| &mut n.data) {
        Some(NodeData::Dataset(data)) => data,
        _ => panic!("'{}' is not a dataset node", id),
    }
}
