//! Tests for the tool invocation engine.
mod common;
use common::*;
use serde_json::json;
use parking_lot::Mutex;
use std::sync::Arc;
use tunegraph::error::CatalogError;
use tunegraph::graph::*;
use tunegraph::prelude::*;
use tunegraph::tools::*;

fn run(store: &mut GraphStore, turn: &[RawToolInvocation]) -> TurnReport {
    run_with_created(store, turn, Vec::new())
}

fn run_with_created(
    store: &mut GraphStore,
    turn: &[RawToolInvocation],
    created: Vec<NodeId>,
) -> TurnReport {
    let catalog = ModelCatalog::default();
    ToolEngine::builder(store, &catalog)
        .build()
        .run_turn(turn, created)
}

fn scenario_b_store() -> GraphStore {
    GraphStore::from_state(scenario_b_graph()).expect("valid graph")
}

fn selected_model_id(store: &GraphStore, node_id: &str) -> Option<String> {
    match &store.state().node(node_id)?.data {
        NodeData::Model(data) => data.selected_model.as_ref().map(|m| m.id.clone()),
        _ => None,
    }
}

fn only_error(report: &TurnReport) -> &ToolError {
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    &report.errors[0].error
}

#[test]
fn test_new_node_id_resolves_to_node_created_earlier_in_turn() {
    let mut store = GraphStore::new();
    let report = run(
        &mut store,
        &[
            raw(ADD_NODE, json!({ "kind": "model", "position": { "x": 10, "y": 20 } })),
            raw(
                UPDATE_NODE_PROPERTIES,
                json!({ "nodeId": NEW_NODE_ID, "kind": "model",
                        "properties": { "selectedModelId": "phi3" } }),
            ),
        ],
    );

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.processed_count, 2);
    assert_eq!(report.updated_created_node_ids, vec!["model-1".to_string()]);
    assert_eq!(
        selected_model_id(&store, "model-1").as_deref(),
        Some("microsoft/Phi-3-mini-4k-instruct")
    );
    assert_eq!(store.state().node("model-1").unwrap().position, Position::new(10.0, 20.0));
}

#[test]
fn test_new_node_id_uses_ids_from_earlier_turns() {
    let mut store = scenario_b_store();
    let report = run_with_created(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": NEW_NODE_ID, "kind": "training",
                    "properties": { "epochs": 2 } }),
        )],
        vec!["n1".to_string(), "n3".to_string()],
    );

    assert!(report.success);
    match &store.state().node("n3").unwrap().data {
        NodeData::Training(data) => assert_eq!(data.epochs, 2),
        other => panic!("Expected training data, got {:?}", other),
    }
}

#[test]
fn test_unresolved_new_node_id_fails_without_aborting_turn() {
    let mut store = GraphStore::new();
    let report = run(
        &mut store,
        &[
            raw(DELETE_NODE, json!({ "nodeId": NEW_NODE_ID })),
            raw(ADD_NODE, json!({ "kind": "dataset", "position": { "x": 0, "y": 0 } })),
        ],
    );

    assert!(!report.success);
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.errors[0].index, 0);
    assert_eq!(report.errors[0].error, ToolError::UnresolvedNewNodeId);
    assert_eq!(report.replies.len(), 2);
    assert!(!report.replies[0].success);
    assert!(report.replies[1].success);
    assert_eq!(store.state().nodes.len(), 1);
}

#[test]
fn test_scenario_d_model_resolution() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "n2", "kind": "model",
                    "properties": { "selectedModelId": "smaller llama" } }),
        )],
    );
    assert!(report.success);
    assert_eq!(
        selected_model_id(&store, "n2").as_deref(),
        Some("meta-llama/Llama-3.2-1B-Instruct")
    );

    let report = run(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "n2", "kind": "model",
                    "properties": { "selectedModelId": "unobtainium-9000" } }),
        )],
    );
    assert!(matches!(
        only_error(&report),
        ToolError::Catalog(CatalogError::NoMatch { input, .. }) if input == "unobtainium-9000"
    ));
    assert!(report.replies[0].message.contains("unobtainium-9000"));
    // The failed call left the previous selection in place.
    assert_eq!(
        selected_model_id(&store, "n2").as_deref(),
        Some("meta-llama/Llama-3.2-1B-Instruct")
    );
}

#[test]
fn test_update_rejects_unknown_node_and_kind_mismatch() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "ghost", "kind": "model", "properties": { "model": "phi3" } }),
        )],
    );
    assert_eq!(only_error(&report), &ToolError::NodeNotFound("ghost".to_string()));

    let report = run(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "n3", "kind": "model", "properties": { "model": "phi3" } }),
        )],
    );
    assert_eq!(
        only_error(&report),
        &ToolError::KindMismatch {
            node_id: "n3".to_string(),
            actual: NodeKind::Training,
            requested: NodeKind::Model,
        }
    );
}

#[test]
fn test_training_property_validation() {
    let update = |properties: serde_json::Value| {
        raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "n3", "kind": "training", "properties": properties }),
        )
    };
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[
            update(json!({ "epochs": 0 })),
            update(json!({ "epochs": 6 })),
            update(json!({ "batchSize": 8 })),
            update(json!({ "quantization": "fp16" })),
            update(json!({ "unrelated": true })),
            update(json!({ "epochs": "3", "batchSize": "4", "downloadQuant": "INT4" })),
        ],
    );

    let failed: Vec<usize> = report.errors.iter().map(|e| e.index).collect();
    assert_eq!(failed, vec![0, 1, 2, 3, 4]);
    assert!(matches!(
        report.errors[0].error,
        ToolError::InvalidProperty { property: "epochs", .. }
    ));
    assert!(matches!(
        report.errors[2].error,
        ToolError::InvalidProperty { property: "batchSize", .. }
    ));
    assert!(matches!(
        report.errors[4].error,
        ToolError::EmptyWriteSet { kind: NodeKind::Training, .. }
    ));

    match &store.state().node("n3").unwrap().data {
        NodeData::Training(data) => {
            assert_eq!(data.epochs, 3);
            assert_eq!(data.batch_size, "4");
            assert_eq!(data.quantization, "int4");
            assert_eq!(data.download_quant, "int4");
        }
        other => panic!("Expected training data, got {:?}", other),
    }
}

#[test]
fn test_dataset_property_updates() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[
            raw(
                UPDATE_NODE_PROPERTIES,
                json!({ "nodeId": "n1", "kind": "dataset",
                        "properties": { "status": "ready", "activeTab": "preview" } }),
            ),
            raw(
                UPDATE_NODE_PROPERTIES,
                json!({ "nodeId": "n1", "kind": "dataset", "properties": { "status": "done" } }),
            ),
        ],
    );

    assert_eq!(report.processed_count, 1);
    match &store.state().node("n1").unwrap().data {
        NodeData::Dataset(data) => {
            assert_eq!(data.status, DatasetStatus::Ready);
            assert_eq!(data.active_tab.as_deref(), Some("preview"));
            assert_eq!(data.content_url.as_deref(), Some(N1_URL));
        }
        other => panic!("Expected dataset data, got {:?}", other),
    }
}

#[test]
fn test_locked_model_refuses_updates() {
    let mut store = scenario_b_store();
    store.update_node_data(
        "n2",
        NodePatch::Model(ModelPatch {
            is_locked: Some(true),
            ..ModelPatch::default()
        }),
    );

    let report = run(
        &mut store,
        &[raw(
            UPDATE_NODE_PROPERTIES,
            json!({ "nodeId": "n2", "kind": "model", "properties": { "model": "phi3" } }),
        )],
    );
    assert_eq!(only_error(&report), &ToolError::NodeLocked("n2".to_string()));
    assert_eq!(selected_model_id(&store, "n2").as_deref(), Some("acme/small-7b"));
}

#[test]
fn test_invocation_shape_errors() {
    let mut store = GraphStore::new();
    let report = run(
        &mut store,
        &[
            raw("renameNode", json!({ "nodeId": "x" })),
            raw(ADD_NODE, json!({ "kind": "dataset" })),
            raw(ADD_NODE, json!({ "kind": "prompt", "position": { "x": 0, "y": 0 } })),
        ],
    );

    assert_eq!(
        report.errors[0].error,
        ToolError::UnknownTool("renameNode".to_string())
    );
    assert!(matches!(
        &report.errors[1].error,
        ToolError::InvalidArguments { tool, .. } if tool == ADD_NODE
    ));
    assert_eq!(
        report.errors[2].error,
        ToolError::UnknownNodeKind("prompt".to_string())
    );
    assert!(store.state().nodes.is_empty());
}

#[test]
fn test_add_node_rejects_non_finite_position() {
    let mut store = GraphStore::new();
    let catalog = ModelCatalog::default();
    let mut engine = ToolEngine::builder(&mut store, &catalog).build();
    let mut ctx = TurnContext::default();

    let invocation = ToolInvocation::AddNode(AddNodeArgs {
        kind: "dataset".to_string(),
        position: Position::new(f64::NAN, 0.0),
    });
    assert!(matches!(
        engine.execute(&invocation, &mut ctx),
        Err(ToolError::InvalidArguments { .. })
    ));
    assert!(ctx.created_node_ids.is_empty());
}

#[test]
fn test_node_and_edge_limits() {
    let mut store = GraphStore::new();
    let catalog = ModelCatalog::default();
    let add = |kind: &str| raw(ADD_NODE, json!({ "kind": kind, "position": { "x": 0, "y": 0 } }));
    let report = ToolEngine::builder(&mut store, &catalog)
        .with_limits(2, 0)
        .build()
        .run_turn(
            &[
                add("dataset"),
                add("model"),
                add("training"),
                raw(
                    ADD_CONNECTION,
                    json!({ "sourceId": "dataset-1", "targetId": "model-2",
                            "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
                ),
            ],
            Vec::new(),
        );

    assert_eq!(report.processed_count, 2);
    assert_eq!(
        report.errors[0].error,
        ToolError::NodeLimitReached { limit: 2 }
    );
    assert_eq!(
        report.errors[1].error,
        ToolError::EdgeLimitReached { limit: 0 }
    );
    assert_eq!(store.state().nodes.len(), 2);
    assert!(store.state().edges.is_empty());
}

#[test]
fn test_limits_come_from_config() {
    let config = EngineConfig::from_json(r#"{ "maxNodes": 3 }"#).unwrap();
    let mut store = scenario_b_store();
    let catalog = ModelCatalog::default();
    let report = ToolEngine::builder(&mut store, &catalog)
        .with_config(&config)
        .build()
        .run_turn(
            &[raw(ADD_NODE, json!({ "kind": "dataset", "position": { "x": 0, "y": 0 } }))],
            Vec::new(),
        );
    assert_eq!(only_error(&report), &ToolError::NodeLimitReached { limit: 3 });
}

#[test]
fn test_scenario_c_duplicate_connection_is_not_fatal() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[raw(
            ADD_CONNECTION,
            json!({ "sourceId": "n1", "targetId": "n2",
                    "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
        )],
    );

    assert!(report.success);
    assert!(report.replies[0].message.contains("already connected"));
    assert_eq!(store.state().edges.len(), 2);
}

#[test]
fn test_incompatible_connection_is_rejected() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[raw(
            ADD_CONNECTION,
            json!({ "sourceId": "n1", "targetId": "n3",
                    "sourceHandle": "dataset-output", "targetHandle": "training-input" }),
        )],
    );
    assert!(matches!(
        only_error(&report),
        ToolError::ConnectionRejected { source_id, .. } if source_id == "n1"
    ));
}

#[test]
fn test_connection_to_new_node_id() {
    let mut store = GraphStore::from_state(scenario_a_graph()).expect("valid graph");
    let report = run(
        &mut store,
        &[
            raw(ADD_NODE, json!({ "kind": "training", "position": { "x": 600, "y": 0 } })),
            raw(
                ADD_CONNECTION,
                json!({ "sourceId": "n2", "targetId": NEW_NODE_ID,
                        "sourceHandle": "model-output", "targetHandle": "training-input" }),
            ),
        ],
    );

    assert!(report.success, "errors: {:?}", report.errors);
    let training_id = &report.updated_created_node_ids[0];
    assert!(store.state().has_connection("n2", training_id));
    assert!(validate_topology(store.state()).is_valid);
}

#[test]
fn test_endpoint_recovery_uses_handle_kind() {
    let mut store = GraphStore::from_state(graph(
        vec![
            dataset_node("a", Some("https://x/a")),
            dataset_node("b", Some("https://x/b")),
            model_node("m", None),
        ],
        vec![],
    ))
    .expect("valid graph");
    let connect = raw(
        ADD_CONNECTION,
        json!({ "sourceId": "Support tickets", "targetId": "m",
                "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
    );

    // Nodes created in this conversation win over graph-wide creation order.
    let report = run_with_created(&mut store, &[connect.clone()], vec!["a".to_string()]);
    assert!(report.success, "errors: {:?}", report.errors);
    assert!(store.state().has_connection("a", "m"));

    let report = run(&mut store, &[connect]);
    assert!(report.success, "errors: {:?}", report.errors);
    assert!(store.state().has_connection("b", "m"));
}

#[test]
fn test_endpoint_recovery_follows_creation_sequence_not_array_order() {
    let mut state = graph(
        vec![
            dataset_node("late", Some("https://x/late")),
            dataset_node("early", Some("https://x/early")),
            model_node("m", None),
        ],
        vec![],
    );
    state.nodes[0].created_seq = 7;
    state.nodes[1].created_seq = 2;
    let mut store = GraphStore::from_state(state).expect("valid graph");

    let report = run(
        &mut store,
        &[raw(
            ADD_CONNECTION,
            json!({ "sourceId": "Support tickets", "targetId": "m",
                    "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
        )],
    );
    assert!(report.success, "errors: {:?}", report.errors);
    assert!(store.state().has_connection("late", "m"));
    assert!(!store.state().has_connection("early", "m"));
}

/// Always answers with one fixed node and records the kinds it was asked for.
struct FixedRecovery {
    node_id: NodeId,
    asked: Arc<Mutex<Vec<NodeKind>>>,
}

impl EndpointRecovery for FixedRecovery {
    fn recover(
        &self,
        _state: &GraphState,
        _created_node_ids: &[NodeId],
        implied_kind: NodeKind,
    ) -> Option<NodeId> {
        self.asked.lock().push(implied_kind);
        Some(self.node_id.clone())
    }
}

#[test]
fn test_custom_endpoint_recovery_is_consulted() {
    let mut store = GraphStore::from_state(graph(
        vec![
            dataset_node("a", Some("https://x/a")),
            dataset_node("b", Some("https://x/b")),
            model_node("m", None),
        ],
        vec![],
    ))
    .expect("valid graph");
    let catalog = ModelCatalog::default();
    let asked = Arc::new(Mutex::new(Vec::new()));

    let report = ToolEngine::builder(&mut store, &catalog)
        .with_recovery(Box::new(FixedRecovery {
            node_id: "a".to_string(),
            asked: Arc::clone(&asked),
        }))
        .build()
        .run_turn(
            &[raw(
                ADD_CONNECTION,
                json!({ "sourceId": "Support tickets", "targetId": "m",
                        "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
            )],
            Vec::new(),
        );

    assert!(report.success, "errors: {:?}", report.errors);
    // The default strategy would have picked "b", the latest dataset.
    assert!(store.state().has_connection("a", "m"));
    assert_eq!(*asked.lock(), vec![NodeKind::Dataset]);
}

#[test]
fn test_ill_typed_call_on_connected_pair_is_rejected() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[
            raw(
                ADD_CONNECTION,
                json!({ "sourceId": "n1", "targetId": "n2",
                        "sourceHandle": "model-output", "targetHandle": "training-input" }),
            ),
            raw(
                ADD_CONNECTION,
                json!({ "sourceId": "n1", "targetId": "n2",
                        "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
            ),
        ],
    );

    assert_eq!(report.processed_count, 1);
    assert_eq!(
        only_error(&report),
        &ToolError::ConnectionRejected {
            source_id: "n1".to_string(),
            target_id: "n2".to_string(),
            source_handle: "model-output".to_string(),
            target_handle: "training-input".to_string(),
        }
    );
    assert!(!report.replies[0].success);
    assert!(report.replies[1].success);
    assert_eq!(store.state().edges.len(), 2);
}

#[test]
fn test_endpoint_recovery_can_be_disabled() {
    let mut store = scenario_b_store();
    store.delete_connection(&ConnectionRef::Id("edge-n1-n2".to_string()));
    let catalog = ModelCatalog::default();

    let report = ToolEngine::builder(&mut store, &catalog)
        .without_recovery()
        .build()
        .run_turn(
            &[raw(
                ADD_CONNECTION,
                json!({ "sourceId": "my dataset", "targetId": "n2",
                        "sourceHandle": "dataset-output", "targetHandle": "model-input" }),
            )],
            Vec::new(),
        );
    assert_eq!(
        only_error(&report),
        &ToolError::NodeNotFound("my dataset".to_string())
    );
}

#[test]
fn test_delete_connection_addressing_modes() {
    let mut store = scenario_b_store();
    let report = run_with_created(
        &mut store,
        &[
            raw(DELETE_CONNECTION, json!({ "connectionId": "edge-n1-n2", "sourceId": "n1" })),
            raw(DELETE_CONNECTION, json!({})),
            raw(DELETE_CONNECTION, json!({ "connectionId": "edge-n1-n2" })),
            raw(DELETE_CONNECTION, json!({ "sourceId": "n2", "targetId": NEW_NODE_ID })),
            raw(DELETE_CONNECTION, json!({ "connectionId": "edge-n1-n2" })),
        ],
        vec!["n3".to_string()],
    );

    let failed: Vec<usize> = report.errors.iter().map(|e| e.index).collect();
    assert_eq!(failed, vec![0, 1, 4]);
    assert_eq!(report.errors[0].error, ToolError::AmbiguousConnectionRef);
    assert_eq!(report.errors[1].error, ToolError::AmbiguousConnectionRef);
    assert!(matches!(report.errors[2].error, ToolError::ConnectionNotFound(_)));
    assert!(store.state().edges.is_empty());
}

#[test]
fn test_delete_node_cascades_through_engine() {
    let mut store = scenario_b_store();
    let report = run(
        &mut store,
        &[
            raw(DELETE_NODE, json!({ "nodeId": "n2" })),
            raw(DELETE_NODE, json!({ "nodeId": "n2" })),
        ],
    );

    assert_eq!(report.processed_count, 1);
    assert_eq!(report.errors[0].error, ToolError::NodeNotFound("n2".to_string()));
    assert_eq!(store.state().nodes.len(), 2);
    assert!(store.state().edges.is_empty());
}

#[test]
fn test_tool_reply_translation() {
    let ok = ToolReply {
        success: true,
        message: "Added dataset node 'dataset-1'".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        json!({ "success": true, "message": "Added dataset node 'dataset-1'" })
    );
    assert_eq!(ok.into_result(), Ok("Added dataset node 'dataset-1'".to_string()));

    let failed = ToolReply::from_result(&Err(ToolError::UnresolvedNewNodeId));
    assert!(!failed.success);
    assert!(failed.into_result().unwrap_err().contains("NEW_NODE_ID"));
}

#[test]
fn test_raw_invocation_deserializes_from_transcript_json() {
    let raw: RawToolInvocation = serde_json::from_str(
        r#"{ "toolName": "deleteNode", "args": { "nodeId": "n1" } }"#,
    )
    .unwrap();
    let invocation = ToolInvocation::try_from(&raw).unwrap();

    assert_eq!(invocation.tool_name(), DELETE_NODE);
    assert_eq!(
        invocation,
        ToolInvocation::DeleteNode(DeleteNodeArgs {
            node_id: "n1".to_string()
        })
    );
}
