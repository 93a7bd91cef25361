use crate::config::EngineConfig;
use crate::error::{CompileError, CompileFailure};
use crate::graph::GraphState;
use crate::validation::{TopologyReport, validate_topology};
use log::info;
use serde::{Deserialize, Serialize};

pub mod schema;
pub mod storage;
pub mod wire;

pub use schema::*;
pub use storage::*;
pub use wire::*;

/// Caller-supplied fields of the wire format that are not derived from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub training_id: String,
    pub project_name: String,
    pub created_by: String,
}

impl JobContext {
    pub fn new(
        training_id: impl Into<String>,
        project_name: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            training_id: training_id.into(),
            project_name: project_name.into(),
            created_by: created_by.into(),
        }
    }

    /// Uses the configured `createdBy` value.
    pub fn from_config(
        training_id: impl Into<String>,
        project_name: impl Into<String>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(training_id, project_name, config.created_by.clone())
    }

    pub(crate) fn validate(&self) -> Vec<CompileError> {
        [
            ("training_id", &self.training_id),
            ("project_name", &self.project_name),
            ("created_by", &self.created_by),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| CompileError::EmptyField(field))
        .collect()
    }
}

/// A successfully compiled job description.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledJob {
    pub output: FinalSchemaOutput,
    pub schema: TrainingSchemaData,
    /// Non-fatal problems, such as datasets excluded for lacking a reference.
    pub warnings: Vec<CompileError>,
}

impl CompiledJob {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.output)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.output)
    }
}

/// Compiles a pipeline graph into the training service's wire format.
///
/// Construct it fresh for every compile request; the output is never cached.
pub struct Compiler<'a> {
    graph: &'a GraphState,
    context: JobContext,
    storage: Box<dyn StorageResolver>,
}

pub struct CompilerBuilder<'a> {
    graph: &'a GraphState,
    context: JobContext,
    storage: Box<dyn StorageResolver>,
}

impl<'a> CompilerBuilder<'a> {
    pub fn new(graph: &'a GraphState, context: JobContext) -> Self {
        Self {
            graph,
            context,
            storage: Box::new(PrefixStorageResolver::default()),
        }
    }

    pub fn with_storage_resolver(mut self, resolver: Box<dyn StorageResolver>) -> Self {
        self.storage = resolver;
        self
    }

    pub fn with_storage_prefix(self, prefix: &str) -> Self {
        self.with_storage_resolver(Box::new(PrefixStorageResolver::new(prefix)))
    }

    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.with_storage_prefix(&config.storage_uri_prefix)
    }

    pub fn build(self) -> Compiler<'a> {
        Compiler {
            graph: self.graph,
            context: self.context,
            storage: self.storage,
        }
    }
}

impl<'a> Compiler<'a> {
    pub fn builder(graph: &'a GraphState, context: JobContext) -> CompilerBuilder<'a> {
        CompilerBuilder::new(graph, context)
    }

    /// Runs topology validation only.
    pub fn validate(&self) -> TopologyReport {
        validate_topology(self.graph)
    }

    /// Runs topology validation and Stage A.
    pub fn schema_data(&self) -> Result<(TrainingSchemaData, Vec<CompileError>), CompileFailure> {
        let report = self.validate();
        build_schema_data(self.graph, &report, self.storage.as_ref())
    }

    /// Validates the topology, then runs Stage A and Stage B.
    ///
    /// Fails without any partial schema when the topology is invalid or any
    /// data-integrity check fails.
    pub fn compile(&self) -> Result<CompiledJob, CompileFailure> {
        let (schema, warnings) = self.schema_data()?;
        let output = build_final_schema(&schema, &self.context)?;
        info!(
            "Compiled training job '{}' with {} nodes and {} edges",
            output.training_id,
            output.node_schema.nodes.len(),
            output.node_schema.edges.len()
        );
        Ok(CompiledJob {
            output,
            schema,
            warnings,
        })
    }
}

/// Compiles `graph` with the default storage resolver.
pub fn compile(graph: &GraphState, context: JobContext) -> Result<CompiledJob, CompileFailure> {
    Compiler::builder(graph, context).build().compile()
}
