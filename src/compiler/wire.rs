use super::JobContext;
use super::schema::TrainingSchemaData;
use crate::error::{CompileError, CompileFailure};
use crate::graph::Quantization;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const SCHEMA_VERSION: u32 = 1;

/// The job description consumed by the training service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSchemaOutput {
    pub training_id: String,
    pub project_name: String,
    pub node_schema: NodeSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub schema_version: u32,
    pub nodes: WireNodes,
    pub edges: Vec<WireEdge>,
    pub meta: WireMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireNodeType {
    Dataset,
    BaseModel,
    Train,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_quant: Option<Quantization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_quant: Option<Quantization>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: WireNodeType,
    pub props: WireProps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMeta {
    pub created_by: String,
}

/// The `nodes` object of the wire format, keyed by symbolic id.
///
/// Entries serialize in insertion order (`d1..dn`, `b1`, `t1`) so the output
/// is byte-for-byte stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireNodes(Vec<WireNode>);

impl WireNodes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn insert(&mut self, node: WireNode) {
        match self.0.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => self.0.push(node),
        }
    }

    pub fn get(&self, id: &str) -> Option<&WireNode> {
        self.0.iter().find(|n| n.id == id)
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|n| n.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireNode> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for WireNodes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in &self.0 {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }
}

struct WireNodesVisitor;

impl<'de> Visitor<'de> for WireNodesVisitor {
    type Value = WireNodes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of symbolic ids to schema nodes")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut nodes = WireNodes::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, node)) = access.next_entry::<String, WireNode>()? {
            if key != node.id {
                return Err(de::Error::custom(format!(
                    "node key '{}' does not match its id '{}'",
                    key, node.id
                )));
            }
            nodes.insert(node);
        }
        Ok(nodes)
    }
}

impl<'de> Deserialize<'de> for WireNodes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(WireNodesVisitor)
    }
}

/// Stage B: structural remap of the schema data onto the wire format.
pub fn build_final_schema(
    data: &TrainingSchemaData,
    context: &JobContext,
) -> Result<FinalSchemaOutput, CompileFailure> {
    let mut errors = context.validate();

    let batch_size = match data.training.batch_size.trim().parse::<u32>() {
        Ok(batch_size) => Some(batch_size),
        Err(_) => {
            errors.push(CompileError::InvalidBatchSize {
                node_id: data.training.node_id.clone(),
                value: data.training.batch_size.clone(),
            });
            None
        }
    };
    if !errors.is_empty() {
        return Err(CompileFailure::new(errors));
    }

    let mut nodes = WireNodes::with_capacity(data.datasets.len() + 2);
    for dataset in &data.datasets {
        nodes.insert(WireNode {
            id: dataset.symbolic_id.clone(),
            node_type: WireNodeType::Dataset,
            props: WireProps {
                uris: Some(vec![dataset.uri.clone()]),
                ..WireProps::default()
            },
        });
    }
    nodes.insert(WireNode {
        id: data.model.symbolic_id.clone(),
        node_type: WireNodeType::BaseModel,
        props: WireProps {
            model_id: Some(data.model.model_id.clone()),
            ..WireProps::default()
        },
    });
    nodes.insert(WireNode {
        id: data.training.symbolic_id.clone(),
        node_type: WireNodeType::Train,
        props: WireProps {
            epochs: Some(data.training.epochs),
            batch_size,
            train_quant: Some(data.training.train_quant),
            download_quant: Some(data.training.download_quant),
            ..WireProps::default()
        },
    });

    let output = FinalSchemaOutput {
        training_id: context.training_id.clone(),
        project_name: context.project_name.clone(),
        node_schema: NodeSchema {
            schema_version: SCHEMA_VERSION,
            nodes,
            edges: data
                .edges
                .iter()
                .map(|e| WireEdge {
                    from: e.from.clone(),
                    to: e.to.clone(),
                })
                .collect(),
            meta: WireMeta {
                created_by: context.created_by.clone(),
            },
        },
    };

    verify_edge_integrity(&output)?;
    Ok(output)
}

/// Every edge endpoint must be a key of the `nodes` map.
pub fn verify_edge_integrity(output: &FinalSchemaOutput) -> Result<(), CompileFailure> {
    let schema = &output.node_schema;
    let errors: Vec<CompileError> = schema
        .edges
        .iter()
        .filter(|e| !schema.nodes.contains_key(&e.from) || !schema.nodes.contains_key(&e.to))
        .map(|e| CompileError::DanglingEdge {
            from: e.from.clone(),
            to: e.to.clone(),
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CompileFailure::new(errors))
    }
}
