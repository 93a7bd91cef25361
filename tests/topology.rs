//! Tests for topology validation of the dataset -> model -> training path.
mod common;
use common::*;
use tunegraph::error::TopologyError;
use tunegraph::graph::EdgeKind;
use tunegraph::prelude::*;

#[test]
fn test_scenario_a_reports_missing_training_node() {
    let report = validate_topology(&scenario_a_graph());

    assert!(!report.is_valid);
    assert_eq!(report.errors, vec![TopologyError::NoTrainingNode]);
    assert_eq!(report.messages(), vec!["no training node".to_string()]);
    assert_eq!(report.training_node_id, None);
}

#[test]
fn test_scenario_b_names_the_training_path() {
    let report = validate_topology(&scenario_b_graph());

    assert!(report.is_valid, "errors: {:?}", report.messages());
    assert_eq!(report.training_node_id.as_deref(), Some("n3"));
    assert_eq!(report.model_node_id.as_deref(), Some("n2"));
    assert_eq!(report.dataset_node_ids, vec!["n1".to_string()]);
}

#[test]
fn test_multiple_training_nodes() {
    let mut state = scenario_b_graph();
    state.nodes.push(training_node("n4"));
    state.nodes.push(training_node("n5"));

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::MultipleTrainingNodes { count: 3 }]
    );
    assert!(report.messages()[0].starts_with("multiple training nodes"));
}

#[test]
fn test_unconnected_training_node() {
    let mut state = scenario_b_graph();
    state.edges.retain(|e| e.target_node_id != "n3");

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::TrainingNodeUnconnected {
            training_id: "n3".to_string()
        }]
    );
}

#[test]
fn test_over_connected_training_node() {
    let mut state = scenario_b_graph();
    state.nodes.push(model_node("m2", Some("acme/other")));
    state.edges.push(edge("m2", "n3", EdgeKind::ModelToTraining));

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::TrainingNodeOverConnected {
            training_id: "n3".to_string(),
            count: 2
        }]
    );
}

#[test]
fn test_training_fed_by_non_model() {
    // Raw graph data can hold edges the store would never create.
    let mut state = scenario_b_graph();
    state.edges[1].source_node_id = "n1".to_string();

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::TrainingConnectedToNonModel {
            node_id: "n1".to_string()
        }]
    );
}

#[test]
fn test_model_without_datasets() {
    let mut state = scenario_b_graph();
    state.edges.remove(0);

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::ModelHasNoDatasets {
            model_id: "n2".to_string()
        }]
    );
}

#[test]
fn test_non_dataset_sources_are_each_reported_once() {
    let mut state = scenario_b_graph();
    state.nodes.push(model_node("m2", None));
    let mut bad = edge("m2", "n2", EdgeKind::DatasetToModel);
    state.edges.push(bad.clone());
    bad.id = "edge-m2-n2-2".to_string();
    state.edges.push(bad);

    let report = validate_topology(&state);
    assert_eq!(
        report.errors,
        vec![TopologyError::NonDatasetConnectedToModel {
            node_id: "m2".to_string()
        }]
    );
}

#[test]
fn test_dataset_ids_follow_graph_node_order() {
    let mut state = graph(
        vec![
            dataset_node("late", Some("https://x/late")),
            dataset_node("early", Some("https://x/early")),
            model_node("m", Some("acme/small-7b")),
            training_node("t"),
        ],
        vec![],
    );
    // Edges are inserted in the opposite order of the nodes.
    state.edges = vec![
        edge("early", "m", EdgeKind::DatasetToModel),
        edge("late", "m", EdgeKind::DatasetToModel),
        edge("m", "t", EdgeKind::ModelToTraining),
    ];

    let report = validate_topology(&state);
    assert_eq!(
        report.dataset_node_ids,
        vec!["late".to_string(), "early".to_string()]
    );
}

#[test]
fn test_validation_is_idempotent() {
    for state in [scenario_a_graph(), scenario_b_graph()] {
        assert_eq!(validate_topology(&state), validate_topology(&state));
    }
}
