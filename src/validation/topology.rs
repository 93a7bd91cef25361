use crate::error::TopologyError;
use crate::graph::{GraphState, Handle, Node, NodeId, NodeKind};
use ahash::AHashSet;
use log::debug;

/// The outcome of topology validation.
///
/// On success it carries the ids later compilation stages need, so the
/// topology does not have to be derived twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyReport {
    pub is_valid: bool,
    pub errors: Vec<TopologyError>,
    pub training_node_id: Option<NodeId>,
    pub model_node_id: Option<NodeId>,
    /// Datasets feeding the model, in graph node order.
    pub dataset_node_ids: Vec<NodeId>,
}

impl TopologyReport {
    fn invalid(errors: Vec<TopologyError>) -> Self {
        Self {
            is_valid: false,
            errors,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Checks that `state` holds exactly one dataset -> model -> training path.
///
/// The steps run in order and the first failing step ends validation:
/// 1. exactly one training node exists;
/// 2. exactly one edge enters its `training-input` handle;
/// 3. that edge starts at a model node;
/// 4. at least one edge enters the model's `model-input` handle;
/// 5. every such edge starts at a dataset node.
pub fn validate_topology(state: &GraphState) -> TopologyReport {
    let report = match trace_training_path(state) {
        Ok((training, model, datasets)) => TopologyReport {
            is_valid: true,
            errors: Vec::new(),
            training_node_id: Some(training.id.clone()),
            model_node_id: Some(model.id.clone()),
            dataset_node_ids: datasets,
        },
        Err(errors) => TopologyReport::invalid(errors),
    };
    debug!(
        "Topology validation finished: valid={}, {} errors",
        report.is_valid,
        report.errors.len()
    );
    report
}

type TrainingPath<'a> = (&'a Node, &'a Node, Vec<NodeId>);

fn trace_training_path(state: &GraphState) -> Result<TrainingPath<'_>, Vec<TopologyError>> {
    let training = single_training_node(state)?;

    let model_edges: Vec<_> = state
        .incoming(&training.id, Handle::TrainingInput)
        .collect();
    let model_edge = match model_edges.as_slice() {
        [] => {
            return Err(vec![TopologyError::TrainingNodeUnconnected {
                training_id: training.id.clone(),
            }]);
        }
        [edge] => *edge,
        many => {
            return Err(vec![TopologyError::TrainingNodeOverConnected {
                training_id: training.id.clone(),
                count: many.len(),
            }]);
        }
    };

    let model = state
        .node(&model_edge.source_node_id)
        .filter(|n| n.kind() == NodeKind::Model)
        .ok_or_else(|| {
            vec![TopologyError::TrainingConnectedToNonModel {
                node_id: model_edge.source_node_id.clone(),
            }]
        })?;

    let dataset_sources: Vec<&str> = state
        .incoming(&model.id, Handle::ModelInput)
        .map(|e| e.source_node_id.as_str())
        .collect();
    if dataset_sources.is_empty() {
        return Err(vec![TopologyError::ModelHasNoDatasets {
            model_id: model.id.clone(),
        }]);
    }

    let mut reported = AHashSet::new();
    let errors: Vec<TopologyError> = dataset_sources
        .iter()
        .filter(|id| state.node_kind(id) != Some(NodeKind::Dataset))
        .filter(|id| reported.insert(**id))
        .map(|id| TopologyError::NonDatasetConnectedToModel {
            node_id: id.to_string(),
        })
        .collect();
    if !errors.is_empty() {
        return Err(errors);
    }

    let sources: AHashSet<&str> = dataset_sources.into_iter().collect();
    let datasets = state
        .nodes
        .iter()
        .filter(|n| sources.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    Ok((training, model, datasets))
}

fn single_training_node(state: &GraphState) -> Result<&Node, Vec<TopologyError>> {
    let mut training_nodes = state.nodes_of_kind(NodeKind::Training);
    match (training_nodes.next(), training_nodes.next()) {
        (None, _) => Err(vec![TopologyError::NoTrainingNode]),
        (Some(node), None) => Ok(node),
        (Some(_), Some(_)) => Err(vec![TopologyError::MultipleTrainingNodes {
            count: state.nodes_of_kind(NodeKind::Training).count(),
        }]),
    }
}
