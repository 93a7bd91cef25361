use crate::graph::NodeKind;
use itertools::Itertools;
use thiserror::Error;

/// Errors raised while loading or converting a graph into the canonical model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Failed to parse graph JSON: {0}")]
    JsonParseError(String),

    #[error("Node id '{0}' is used by more than one node")]
    DuplicateNodeId(String),

    #[error("Edge '{edge_id}' references node '{missing_node_id}', which does not exist")]
    DanglingEdge {
        edge_id: String,
        missing_node_id: String,
    },

    #[error("Invalid canvas data: {0}")]
    ConversionError(String),
}

/// A rule of the dataset -> model -> training path that the graph violates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("no training node")]
    NoTrainingNode,

    #[error("multiple training nodes (found {count})")]
    MultipleTrainingNodes { count: usize },

    #[error("training node unconnected: '{training_id}' has no incoming model connection")]
    TrainingNodeUnconnected { training_id: String },

    #[error("training node over-connected: '{training_id}' has {count} incoming connections")]
    TrainingNodeOverConnected { training_id: String, count: usize },

    #[error("training node connected to non-model: '{node_id}' is not a model node")]
    TrainingConnectedToNonModel { node_id: String },

    #[error("model node has no datasets: '{model_id}' has no incoming dataset connection")]
    ModelHasNoDatasets { model_id: String },

    #[error("non-dataset connected to model: '{node_id}' is not a dataset node")]
    NonDatasetConnectedToModel { node_id: String },
}

/// Errors produced while compiling a graph into the wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Node '{0}' was selected by topology validation but is missing from the graph")]
    NodeMissing(String),

    #[error("Dataset '{node_id}' has no content reference and was excluded")]
    DatasetMissingReference { node_id: String },

    #[error("no datasets with valid references")]
    NoValidDatasets,

    #[error("Model node '{node_id}' has no selected base model")]
    ModelNotSelected { node_id: String },

    #[error("Training node '{node_id}' has {value} epochs, expected 1 to 5")]
    InvalidEpochs { node_id: String, value: u32 },

    #[error("Training node '{node_id}' has batch size '{value}', which is not an integer")]
    InvalidBatchSize { node_id: String, value: String },

    #[error("Training node '{node_id}' has {field} '{value}', expected int4 or int8")]
    InvalidQuantization {
        node_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("Edge {from} -> {to} references a node that is not part of the schema")]
    DanglingEdge { from: String, to: String },
}

/// Aggregate failure of a compile request. No partial schema accompanies it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Compilation failed: {}", .errors.iter().join("; "))]
pub struct CompileFailure {
    pub errors: Vec<CompileError>,
}

impl CompileFailure {
    pub fn new(errors: Vec<CompileError>) -> Self {
        Self { errors }
    }

    /// The itemized, user-visible messages.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl From<Vec<TopologyError>> for CompileFailure {
    fn from(errors: Vec<TopologyError>) -> Self {
        Self::new(errors.into_iter().map(CompileError::from).collect())
    }
}

/// Errors from the model catalog and the natural-language model resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No model matches '{input}'. Valid models are: {}", .valid.join(", "))]
    NoMatch { input: String, valid: Vec<String> },

    #[error("Model name is empty")]
    EmptyInput,

    #[error("Failed to parse model catalog: {0}")]
    ParseError(String),

    #[error("Could not read model catalog '{path}': {message}")]
    Io { path: String, message: String },
}

/// Errors for a single tool invocation. They never abort the rest of a turn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("NEW_NODE_ID was used, but no node has been created in this conversation yet")]
    UnresolvedNewNodeId,

    #[error("Node '{0}' does not exist in the graph")]
    NodeNotFound(String),

    #[error("Unknown node kind '{0}', expected dataset, model or training")]
    UnknownNodeKind(String),

    #[error("Node '{node_id}' is a {actual} node, not a {requested} node")]
    KindMismatch {
        node_id: String,
        actual: NodeKind,
        requested: NodeKind,
    },

    #[error("No writable {kind} properties in [{keys}]")]
    EmptyWriteSet { kind: NodeKind, keys: String },

    #[error("Invalid value for '{property}': {message}")]
    InvalidProperty {
        property: &'static str,
        message: String,
    },

    #[error("Model node '{0}' was used in a completed training run and is read-only")]
    NodeLocked(String),

    #[error("Update of node '{0}' was rejected by the graph")]
    UpdateRejected(String),

    #[error("Node limit reached: the graph already has {limit} nodes")]
    NodeLimitReached { limit: usize },

    #[error("Connection limit reached: the graph already has {limit} connections")]
    EdgeLimitReached { limit: usize },

    #[error(
        "Cannot connect '{source_id}' ({source_handle}) to '{target_id}' ({target_handle}): incompatible endpoints"
    )]
    ConnectionRejected {
        source_id: String,
        target_id: String,
        source_handle: String,
        target_handle: String,
    },

    #[error("Connection {0} not found")]
    ConnectionNotFound(String),

    #[error("deleteConnection requires either a connectionId or both sourceId and targetId")]
    AmbiguousConnectionRef,

    #[error("Failed to delete node '{0}'")]
    DeleteFailed(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors loading an `EngineConfig`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
