use serde::{Deserialize, Serialize};
use std::fmt;

/// Graph-internal node identifier. Immutable once the node is created.
pub type NodeId = String;

/// The three kinds of pipeline node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dataset,
    Model,
    Training,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [NodeKind::Dataset, NodeKind::Model, NodeKind::Training];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Dataset => "dataset",
            NodeKind::Model => "model",
            NodeKind::Training => "training",
        }
    }

    /// Case-insensitive parse of a kind name as sent by the canvas or an assistant.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Quantization applied at train time or to the downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    Int4,
    Int8,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Int4 => "int4",
            Quantization::Int8 => "int8",
        }
    }

    /// Accepts only the canonical lowercase names.
    pub fn from_exact(value: &str) -> Option<Self> {
        match value {
            "int4" => Some(Quantization::Int4),
            "int8" => Some(Quantization::Int8),
            _ => None,
        }
    }

    /// Lenient form for assistant input: ignores case and surrounding space.
    pub fn parse(value: &str) -> Option<Self> {
        Self::from_exact(&value.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for Quantization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of an uploaded dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    #[default]
    Idle,
    Uploading,
    Processing,
    Ready,
    Error,
}

impl DatasetStatus {
    pub const ALL: [DatasetStatus; 5] = [
        DatasetStatus::Idle,
        DatasetStatus::Uploading,
        DatasetStatus::Processing,
        DatasetStatus::Ready,
        DatasetStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Idle => "idle",
            DatasetStatus::Uploading => "uploading",
            DatasetStatus::Processing => "processing",
            DatasetStatus::Ready => "ready",
            DatasetStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

/// Where a dataset's content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRef<'a> {
    Url(&'a str),
    Storage(&'a str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
    #[serde(default)]
    pub status: DatasetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<String>,
}

impl DatasetData {
    /// The first non-blank content reference, preferring the URL.
    pub fn content_reference(&self) -> Option<ContentRef<'_>> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        }
        non_blank(&self.content_url)
            .map(ContentRef::Url)
            .or_else(|| non_blank(&self.storage_id).map(ContentRef::Storage))
    }
}

impl Default for DatasetData {
    fn default() -> Self {
        Self {
            title: "Dataset".to_string(),
            description: "Upload a file with training examples".to_string(),
            content_url: None,
            storage_id: None,
            status: DatasetStatus::Idle,
            active_tab: None,
        }
    }
}

/// The base model picked on a model node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedModel {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub provider: String,
    /// Parameter count in billions.
    #[serde(default)]
    pub parameter_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<SelectedModel>,
    /// Set once the model took part in a completed training run.
    #[serde(default)]
    pub is_locked: bool,
}

impl Default for ModelData {
    fn default() -> Self {
        Self {
            title: "Base Model".to_string(),
            description: "Choose the model to fine-tune".to_string(),
            selected_model: None,
            is_locked: false,
        }
    }
}

pub const DEFAULT_BATCH_SIZE: &str = "4";
pub const MIN_EPOCHS: u32 = 1;
pub const MAX_EPOCHS: u32 = 5;

fn default_epochs() -> u32 {
    MIN_EPOCHS
}

fn default_batch_size() -> String {
    DEFAULT_BATCH_SIZE.to_string()
}

fn default_quantization() -> String {
    Quantization::Int4.as_str().to_string()
}

fn default_download_quant() -> String {
    Quantization::Int8.as_str().to_string()
}

/// Training configuration. Numeric and enum fields are kept as entered so that
/// compilation, not deserialization, reports bad values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: String,
    #[serde(default = "default_quantization")]
    pub quantization: String,
    #[serde(default = "default_download_quant")]
    pub download_quant: String,
}

impl Default for TrainingData {
    fn default() -> Self {
        Self {
            title: "Training".to_string(),
            description: "Configure the fine-tuning run".to_string(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            quantization: default_quantization(),
            download_quant: default_download_quant(),
        }
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeData {
    Dataset(DatasetData),
    Model(ModelData),
    Training(TrainingData),
}

impl NodeData {
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Dataset => NodeData::Dataset(DatasetData::default()),
            NodeKind::Model => NodeData::Model(ModelData::default()),
            NodeKind::Training => NodeData::Training(TrainingData::default()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Dataset(_) => NodeKind::Dataset,
            NodeData::Model(_) => NodeKind::Model,
            NodeData::Training(_) => NodeKind::Training,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            NodeData::Dataset(data) => &data.title,
            NodeData::Model(data) => &data.title,
            NodeData::Training(data) => &data.title,
        }
    }

    /// Applies a partial update. Returns `false` without touching anything when
    /// the patch targets another kind or the node is locked.
    pub fn apply(&mut self, patch: NodePatch) -> bool {
        match (self, patch) {
            (NodeData::Dataset(data), NodePatch::Dataset(patch)) => {
                set(&mut data.title, patch.title);
                set(&mut data.description, patch.description);
                if patch.content_url.is_some() {
                    data.content_url = patch.content_url;
                }
                if patch.storage_id.is_some() {
                    data.storage_id = patch.storage_id;
                }
                set(&mut data.status, patch.status);
                if patch.active_tab.is_some() {
                    data.active_tab = patch.active_tab;
                }
                true
            }
            (NodeData::Model(data), NodePatch::Model(patch)) => {
                if data.is_locked {
                    return false;
                }
                set(&mut data.title, patch.title);
                set(&mut data.description, patch.description);
                if patch.selected_model.is_some() {
                    data.selected_model = patch.selected_model;
                }
                set(&mut data.is_locked, patch.is_locked);
                true
            }
            (NodeData::Training(data), NodePatch::Training(patch)) => {
                set(&mut data.title, patch.title);
                set(&mut data.description, patch.description);
                set(&mut data.epochs, patch.epochs);
                set(&mut data.batch_size, patch.batch_size);
                set(&mut data.quantization, patch.quantization);
                set(&mut data.download_quant, patch.download_quant);
                true
            }
            _ => false,
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// A node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    /// Monotonic creation counter assigned by the store. Higher is newer.
    #[serde(default)]
    pub created_seq: u64,
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn is_locked(&self) -> bool {
        matches!(&self.data, NodeData::Model(model) if model.is_locked)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_url: Option<String>,
    pub storage_id: Option<String>,
    pub status: Option<DatasetStatus>,
    pub active_tab: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub selected_model: Option<SelectedModel>,
    pub is_locked: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub epochs: Option<u32>,
    pub batch_size: Option<String>,
    pub quantization: Option<String>,
    pub download_quant: Option<String>,
}

/// A partial, kind-specific update of node data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePatch {
    Dataset(DatasetPatch),
    Model(ModelPatch),
    Training(TrainingPatch),
}

impl NodePatch {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePatch::Dataset(_) => NodeKind::Dataset,
            NodePatch::Model(_) => NodeKind::Model,
            NodePatch::Training(_) => NodeKind::Training,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NodePatch::Dataset(patch) => *patch == DatasetPatch::default(),
            NodePatch::Model(patch) => *patch == ModelPatch::default(),
            NodePatch::Training(patch) => *patch == TrainingPatch::default(),
        }
    }
}
