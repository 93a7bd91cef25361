use crate::catalog::ModelCatalog;
use crate::error::ToolError;
use crate::graph::{
    DEFAULT_BATCH_SIZE, DatasetPatch, DatasetStatus, MAX_EPOCHS, MIN_EPOCHS, ModelPatch, NodeKind,
    NodePatch, Quantization, TrainingPatch,
};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

/// A numeric property that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(Number),
    Text(String),
}

impl Numeric {
    fn as_integer(&self) -> Option<i64> {
        match self {
            Numeric::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Numeric::Text(text) => text.trim().parse().ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Numeric::Number(n) => n.to_string(),
            Numeric::Text(text) => format!("'{}'", text),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrainingProperties {
    #[serde(default)]
    epochs: Option<Numeric>,
    #[serde(default, alias = "batch_size")]
    batch_size: Option<Numeric>,
    #[serde(default, alias = "trainQuant", alias = "train_quant")]
    quantization: Option<String>,
    #[serde(default, alias = "download_quant")]
    download_quant: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelProperties {
    #[serde(
        default,
        alias = "modelId",
        alias = "model",
        alias = "modelName",
        alias = "selectedModel"
    )]
    selected_model_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetProperties {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    active_tab: Option<String>,
}

fn parse_properties<T: DeserializeOwned>(properties: &Map<String, Value>) -> Result<T, ToolError> {
    T::deserialize(Value::Object(properties.clone())).map_err(|e| ToolError::InvalidArguments {
        tool: super::invocation::UPDATE_NODE_PROPERTIES.to_string(),
        message: e.to_string(),
    })
}

fn training_patch(properties: &Map<String, Value>) -> Result<TrainingPatch, ToolError> {
    let props: TrainingProperties = parse_properties(properties)?;

    let epochs = props
        .epochs
        .map(|raw| {
            raw.as_integer()
                .filter(|e| (i64::from(MIN_EPOCHS)..=i64::from(MAX_EPOCHS)).contains(e))
                .map(|e| e as u32)
                .ok_or_else(|| ToolError::InvalidProperty {
                    property: "epochs",
                    message: format!(
                        "{} is not a whole number between {} and {}",
                        raw.describe(),
                        MIN_EPOCHS,
                        MAX_EPOCHS
                    ),
                })
        })
        .transpose()?;

    let batch_size = props
        .batch_size
        .map(|raw| match raw.as_integer() {
            Some(value) if value.to_string() == DEFAULT_BATCH_SIZE => Ok(value.to_string()),
            _ => Err(ToolError::InvalidProperty {
                property: "batchSize",
                message: format!(
                    "{} is not supported, batch size is fixed at {}",
                    raw.describe(),
                    DEFAULT_BATCH_SIZE
                ),
            }),
        })
        .transpose()?;

    let quantization = |property: &'static str, value: Option<String>| {
        value
            .map(|raw| {
                Quantization::parse(&raw)
                    .map(|q| q.as_str().to_string())
                    .ok_or_else(|| ToolError::InvalidProperty {
                        property,
                        message: format!("'{}' is not one of int4, int8", raw),
                    })
            })
            .transpose()
    };

    Ok(TrainingPatch {
        epochs,
        batch_size,
        quantization: quantization("quantization", props.quantization)?,
        download_quant: quantization("downloadQuant", props.download_quant)?,
        ..TrainingPatch::default()
    })
}

fn model_patch(
    properties: &Map<String, Value>,
    catalog: &ModelCatalog,
) -> Result<ModelPatch, ToolError> {
    let props: ModelProperties = parse_properties(properties)?;
    let selected_model = props
        .selected_model_id
        .map(|name| catalog.resolve(&name).map(|entry| entry.to_selected_model()))
        .transpose()?;
    Ok(ModelPatch {
        selected_model,
        ..ModelPatch::default()
    })
}

fn dataset_patch(properties: &Map<String, Value>) -> Result<DatasetPatch, ToolError> {
    let props: DatasetProperties = parse_properties(properties)?;
    let status = props
        .status
        .map(|raw| {
            DatasetStatus::parse(&raw).ok_or_else(|| ToolError::InvalidProperty {
                property: "status",
                message: format!(
                    "'{}' is not one of {}",
                    raw,
                    DatasetStatus::ALL.iter().map(|s| s.as_str()).join(", ")
                ),
            })
        })
        .transpose()?;
    Ok(DatasetPatch {
        status,
        active_tab: props.active_tab,
        ..DatasetPatch::default()
    })
}

/// Builds the patch for an `updateNodeProperties` call, keeping only the
/// properties that kind is allowed to write.
///
/// Training: `epochs`, `batchSize`, `quantization`, `downloadQuant`.
/// Model: a model reference resolved through the catalog.
/// Dataset: `status`, `activeTab`.
pub fn parse_patch(
    kind: NodeKind,
    properties: &Map<String, Value>,
    catalog: &ModelCatalog,
) -> Result<NodePatch, ToolError> {
    let patch = match kind {
        NodeKind::Training => NodePatch::Training(training_patch(properties)?),
        NodeKind::Model => NodePatch::Model(model_patch(properties, catalog)?),
        NodeKind::Dataset => NodePatch::Dataset(dataset_patch(properties)?),
    };
    if patch.is_empty() {
        return Err(ToolError::EmptyWriteSet {
            kind,
            keys: properties.keys().join(", "),
        });
    }
    Ok(patch)
}
