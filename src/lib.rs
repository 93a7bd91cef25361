//! # Tunegraph - Fine-Tuning Pipeline Graph Engine
//!
//! **Tunegraph** models a fine-tuning job as a small visual graph of datasets, a base
//! model and a training node, lets an assistant edit that graph through structured
//! tool calls, and compiles a valid graph into the versioned JSON job description a
//! remote training service consumes.
//!
//! ## Core Workflow
//!
//! 1.  **Load the Graph**: Parse a canonical graph with `GraphState::from_json`, or implement
//!     `IntoGraph` for your own canvas format (a `CanvasExport` importer is included).
//! 2.  **Edit**: Wrap the graph in a `GraphStore` and apply assistant tool calls with a
//!     `ToolEngine`. Every call is validated against the current graph; failures are
//!     reported per call and never abort the turn.
//! 3.  **Validate**: `validate_topology` checks the dataset -> model -> training shape and
//!     names the nodes that take part in it.
//! 4.  **Compile**: `Compiler::builder` turns a valid graph into a `FinalSchemaOutput`
//!     ready to serialize and send.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tunegraph::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let catalog = ModelCatalog::default();
//!     let mut store = GraphStore::new();
//!
//!     // An assistant turn that builds the whole pipeline.
//!     let turn = vec![
//!         RawToolInvocation::new("addNode", json!({ "kind": "dataset", "position": { "x": 0, "y": 0 } })),
//!         RawToolInvocation::new("addNode", json!({ "kind": "model", "position": { "x": 300, "y": 0 } })),
//!         RawToolInvocation::new("updateNodeProperties", json!({
//!             "nodeId": "NEW_NODE_ID", "kind": "model",
//!             "properties": { "selectedModelId": "the smaller llama" }
//!         })),
//!         RawToolInvocation::new("addNode", json!({ "kind": "training", "position": { "x": 600, "y": 0 } })),
//!         RawToolInvocation::new("addConnection", json!({
//!             "sourceId": "dataset-1", "targetId": "model-2",
//!             "sourceHandle": "dataset-output", "targetHandle": "model-input"
//!         })),
//!         RawToolInvocation::new("addConnection", json!({
//!             "sourceId": "model-2", "targetId": "NEW_NODE_ID",
//!             "sourceHandle": "model-output", "targetHandle": "training-input"
//!         })),
//!     ];
//!
//!     let report = ToolEngine::builder(&mut store, &catalog).build().run_turn(&turn, Vec::new());
//!     for reply in &report.replies {
//!         println!("{}: {}", if reply.success { "ok" } else { "failed" }, reply.message);
//!     }
//!
//!     // The dataset still needs content before the graph compiles.
//!     let context = JobContext::new("job-42", "Support bot", "assistant");
//!     match Compiler::builder(store.state(), context).build().compile() {
//!         Ok(job) => println!("{}", job.to_json_pretty()?),
//!         Err(failure) => {
//!             for message in failure.messages() {
//!                 eprintln!("-> {}", message);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod tools;
pub mod validation;
