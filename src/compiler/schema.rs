use super::storage::StorageResolver;
use crate::error::{CompileError, CompileFailure, TopologyError};
use crate::graph::{
    ContentRef, GraphState, MAX_EPOCHS, MIN_EPOCHS, Node, NodeData, NodeId, Quantization,
};
use crate::validation::TopologyReport;
use ahash::AHashMap;
use log::warn;

pub const MODEL_SYMBOL: &str = "b1";
pub const TRAINING_SYMBOL: &str = "t1";

fn dataset_symbol(index: usize) -> String {
    format!("d{}", index + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDataset {
    pub symbolic_id: String,
    pub node_id: NodeId,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    pub symbolic_id: String,
    pub node_id: NodeId,
    pub model_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTraining {
    pub symbolic_id: String,
    pub node_id: NodeId,
    pub epochs: u32,
    /// Validated to parse as an integer; converted when the wire format is built.
    pub batch_size: String,
    pub train_quant: Quantization,
    pub download_quant: Quantization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEdge {
    pub from: String,
    pub to: String,
}

/// The training-relevant subset of a graph, re-indexed under symbolic ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSchemaData {
    pub datasets: Vec<SchemaDataset>,
    pub model: SchemaModel,
    pub training: SchemaTraining,
    pub edges: Vec<SchemaEdge>,
}

impl TrainingSchemaData {
    /// Symbolic id assigned to a graph node, if it is part of the schema.
    pub fn symbol_of(&self, node_id: &str) -> Option<&str> {
        self.datasets
            .iter()
            .find(|d| d.node_id == node_id)
            .map(|d| d.symbolic_id.as_str())
            .or_else(|| (self.model.node_id == node_id).then_some(self.model.symbolic_id.as_str()))
            .or_else(|| {
                (self.training.node_id == node_id).then_some(self.training.symbolic_id.as_str())
            })
    }
}

fn require_node<'a>(state: &'a GraphState, node_id: Option<&str>) -> Result<&'a Node, CompileError> {
    let node_id = node_id.unwrap_or_default();
    state
        .node(node_id)
        .ok_or_else(|| CompileError::NodeMissing(node_id.to_string()))
}

fn compile_datasets(
    state: &GraphState,
    report: &TopologyReport,
    resolver: &dyn StorageResolver,
    errors: &mut Vec<CompileError>,
    warnings: &mut Vec<CompileError>,
) -> Vec<SchemaDataset> {
    let mut datasets = Vec::with_capacity(report.dataset_node_ids.len());
    for node_id in &report.dataset_node_ids {
        let node = match require_node(state, Some(node_id)) {
            Ok(node) => node,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let NodeData::Dataset(data) = &node.data else {
            errors.push(TopologyError::NonDatasetConnectedToModel {
                node_id: node_id.clone(),
            }
            .into());
            continue;
        };
        let uri = match data.content_reference() {
            Some(ContentRef::Url(url)) => url.to_string(),
            Some(ContentRef::Storage(storage_id)) => resolver.resolve_uri(storage_id),
            None => {
                warn!("Excluding dataset '{}': no content reference", node_id);
                warnings.push(CompileError::DatasetMissingReference {
                    node_id: node_id.clone(),
                });
                continue;
            }
        };
        datasets.push(SchemaDataset {
            symbolic_id: dataset_symbol(datasets.len()),
            node_id: node_id.clone(),
            uri,
        });
    }
    if datasets.is_empty() {
        errors.push(CompileError::NoValidDatasets);
    }
    datasets
}

fn compile_model(node: &Node) -> Result<SchemaModel, CompileError> {
    let NodeData::Model(data) = &node.data else {
        return Err(TopologyError::TrainingConnectedToNonModel {
            node_id: node.id.clone(),
        }
        .into());
    };
    let model_id = data
        .selected_model
        .as_ref()
        .map(|m| m.id.trim())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CompileError::ModelNotSelected {
            node_id: node.id.clone(),
        })?;
    Ok(SchemaModel {
        symbolic_id: MODEL_SYMBOL.to_string(),
        node_id: node.id.clone(),
        model_id: model_id.to_string(),
    })
}

fn compile_training(node: &Node) -> Result<SchemaTraining, Vec<CompileError>> {
    let NodeData::Training(data) = &node.data else {
        return Err(vec![CompileError::NodeMissing(node.id.clone())]);
    };
    let mut errors = Vec::new();

    if !(MIN_EPOCHS..=MAX_EPOCHS).contains(&data.epochs) {
        errors.push(CompileError::InvalidEpochs {
            node_id: node.id.clone(),
            value: data.epochs,
        });
    }
    if data.batch_size.trim().parse::<u32>().is_err() {
        errors.push(CompileError::InvalidBatchSize {
            node_id: node.id.clone(),
            value: data.batch_size.clone(),
        });
    }
    let mut quantization = |field: &'static str, value: &str| {
        let parsed = Quantization::from_exact(value);
        if parsed.is_none() {
            errors.push(CompileError::InvalidQuantization {
                node_id: node.id.clone(),
                field,
                value: value.to_string(),
            });
        }
        parsed
    };
    let train_quant = quantization("quantization", &data.quantization);
    let download_quant = quantization("downloadQuant", &data.download_quant);

    match (train_quant, download_quant) {
        (Some(train_quant), Some(download_quant)) if errors.is_empty() => Ok(SchemaTraining {
            symbolic_id: TRAINING_SYMBOL.to_string(),
            node_id: node.id.clone(),
            epochs: data.epochs,
            batch_size: data.batch_size.trim().to_string(),
            train_quant,
            download_quant,
        }),
        _ => Err(errors),
    }
}

/// Stage A: re-indexes the training path of a topology-valid graph.
///
/// Datasets without a content reference are excluded and reported as warnings
/// in the `Ok` value; only when every dataset is excluded does that become a
/// hard failure. Symbolic ids follow graph node order. Edges keep graph edge
/// order and are dropped when either endpoint is outside the compiled subset.
pub fn build_schema_data(
    state: &GraphState,
    report: &TopologyReport,
    resolver: &dyn StorageResolver,
) -> Result<(TrainingSchemaData, Vec<CompileError>), CompileFailure> {
    if !report.is_valid {
        return Err(report.errors.clone().into());
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let datasets = compile_datasets(state, report, resolver, &mut errors, &mut warnings);
    let model = require_node(state, report.model_node_id.as_deref())
        .and_then(compile_model)
        .map_err(|e| errors.push(e))
        .ok();
    let training = match require_node(state, report.training_node_id.as_deref()) {
        Ok(node) => compile_training(node).map_err(|e| errors.extend(e)).ok(),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let (Some(model), Some(training)) = (model, training) else {
        errors.extend(warnings);
        return Err(CompileFailure::new(errors));
    };
    if !errors.is_empty() {
        errors.extend(warnings);
        return Err(CompileFailure::new(errors));
    }

    let symbols: AHashMap<&str, &str> = datasets
        .iter()
        .map(|d| (d.node_id.as_str(), d.symbolic_id.as_str()))
        .chain([
            (model.node_id.as_str(), model.symbolic_id.as_str()),
            (training.node_id.as_str(), training.symbolic_id.as_str()),
        ])
        .collect();
    let edges = state
        .edges
        .iter()
        .filter_map(|e| {
            Some(SchemaEdge {
                from: symbols.get(e.source_node_id.as_str())?.to_string(),
                to: symbols.get(e.target_node_id.as_str())?.to_string(),
            })
        })
        .collect();

    Ok((
        TrainingSchemaData {
            datasets,
            model,
            training,
            edges,
        },
        warnings,
    ))
}
