use crate::compiler::DEFAULT_STORAGE_PREFIX;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

pub const DEFAULT_MAX_NODES: usize = 50;
pub const DEFAULT_MAX_EDGES: usize = 100;

/// Engine limits and compile defaults. Every field is optional in JSON.
///
/// ```json
/// { "maxNodes": 50, "maxEdges": 100, "endpointRecovery": true,
///   "storageUriPrefix": "storage://", "createdBy": "assistant" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// `addNode` is refused once the graph holds this many nodes.
    pub max_nodes: usize,
    /// `addConnection` is refused once the graph holds this many edges.
    pub max_edges: usize,
    /// Whether unknown connection endpoints may be recovered from handle kinds.
    pub endpoint_recovery: bool,
    pub storage_uri_prefix: String,
    pub created_by: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_edges: DEFAULT_MAX_EDGES,
            endpoint_recovery: true,
            storage_uri_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            created_by: "assistant".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }
}
