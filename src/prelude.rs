//! Prelude module for convenient imports
//!
//! Re-exports the types and traits most callers need to load, edit, validate and
//! compile a pipeline graph.
//!
//! # Example
//!
//! ```rust,no_run
//! use tunegraph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let graph_json = std::fs::read_to_string("path/to/graph.json")?;
//! let graph = GraphState::from_json(&graph_json)?;
//!
//! let report = validate_topology(&graph);
//! if !report.is_valid {
//!     println!("Invalid graph: {:?}", report.messages());
//! }
//!
//! let job = compile(&graph, JobContext::new("job-1", "My project", "assistant"))?;
//! println!("{}", job.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

// Graph model and mutation
pub use crate::graph::{
    ConnectionRef, Edge, GraphMutator, GraphState, GraphStore, IntoGraph, Node, NodeData, NodeId,
    NodeKind, Position,
};

// Validation
pub use crate::validation::{TopologyReport, validate_topology};

// Compilation
pub use crate::compiler::{CompiledJob, Compiler, FinalSchemaOutput, JobContext, compile};

// Assistant tools
pub use crate::catalog::ModelCatalog;
pub use crate::tools::{RawToolInvocation, SharedGraph, ToolEngine, TurnReport};

// Configuration
pub use crate::config::EngineConfig;

// Error types
pub use crate::error::{CompileFailure, GraphError, ToolError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
