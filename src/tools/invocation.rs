use crate::error::ToolError;
use crate::graph::{ConnectionRef, Position};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool call exactly as the assistant emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

impl RawToolInvocation {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePropertiesArgs {
    pub node_id: String,
    #[serde(alias = "nodeType", alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeArgs {
    #[serde(alias = "nodeType", alias = "type")]
    pub kind: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodeArgs {
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddConnectionArgs {
    #[serde(alias = "source", alias = "sourceNodeId")]
    pub source_id: String,
    #[serde(alias = "target", alias = "targetNodeId")]
    pub target_id: String,
    pub source_handle: String,
    pub target_handle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConnectionArgs {
    #[serde(default, alias = "edgeId")]
    pub connection_id: Option<String>,
    #[serde(default, alias = "source")]
    pub source_id: Option<String>,
    #[serde(default, alias = "target")]
    pub target_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DeleteConnectionArgs {
    /// Exactly one addressing mode must be given: an id, or both endpoints.
    pub fn reference(&self) -> Result<ConnectionRef, ToolError> {
        let id = present(&self.connection_id);
        let source = present(&self.source_id);
        let target = present(&self.target_id);
        match (id, source, target) {
            (Some(id), None, None) => Ok(ConnectionRef::Id(id.to_string())),
            (None, Some(source), Some(target)) => Ok(ConnectionRef::Endpoints {
                source_id: source.to_string(),
                target_id: target.to_string(),
            }),
            _ => Err(ToolError::AmbiguousConnectionRef),
        }
    }
}

/// A validated tool call with strongly typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    UpdateNodeProperties(UpdateNodePropertiesArgs),
    AddNode(AddNodeArgs),
    DeleteNode(DeleteNodeArgs),
    AddConnection(AddConnectionArgs),
    DeleteConnection(DeleteConnectionArgs),
}

pub const UPDATE_NODE_PROPERTIES: &str = "updateNodeProperties";
pub const ADD_NODE: &str = "addNode";
pub const DELETE_NODE: &str = "deleteNode";
pub const ADD_CONNECTION: &str = "addConnection";
pub const DELETE_CONNECTION: &str = "deleteConnection";

fn parse_args<T: DeserializeOwned>(raw: &RawToolInvocation) -> Result<T, ToolError> {
    T::deserialize(&raw.args).map_err(|e| ToolError::InvalidArguments {
        tool: raw.tool_name.clone(),
        message: e.to_string(),
    })
}

impl ToolInvocation {
    /// Checks the payload shape for the named tool.
    pub fn from_raw(raw: &RawToolInvocation) -> Result<Self, ToolError> {
        match raw.tool_name.as_str() {
            UPDATE_NODE_PROPERTIES => parse_args(raw).map(Self::UpdateNodeProperties),
            ADD_NODE => parse_args(raw).map(Self::AddNode),
            DELETE_NODE => parse_args(raw).map(Self::DeleteNode),
            ADD_CONNECTION => parse_args(raw).map(Self::AddConnection),
            DELETE_CONNECTION => parse_args(raw).map(Self::DeleteConnection),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::UpdateNodeProperties(_) => UPDATE_NODE_PROPERTIES,
            Self::AddNode(_) => ADD_NODE,
            Self::DeleteNode(_) => DELETE_NODE,
            Self::AddConnection(_) => ADD_CONNECTION,
            Self::DeleteConnection(_) => DELETE_CONNECTION,
        }
    }
}

impl TryFrom<&RawToolInvocation> for ToolInvocation {
    type Error = ToolError;

    fn try_from(raw: &RawToolInvocation) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}
