use super::engine::{ToolEngine, TurnReport};
use super::invocation::RawToolInvocation;
use crate::catalog::ModelCatalog;
use crate::compiler::{CompiledJob, Compiler, JobContext};
use crate::config::EngineConfig;
use crate::error::CompileFailure;
use crate::graph::{GraphMutator, GraphState, GraphStore, NodeId};
use crate::validation::{TopologyReport, validate_topology};
use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;

/// A graph shared between the editing surface and the assistant.
///
/// A turn holds the lock from its first invocation to its last, so concurrent
/// turns never interleave. Cloning shares the same graph.
#[derive(Clone)]
pub struct SharedGraph {
    store: Arc<Mutex<GraphStore>>,
    catalog: Arc<ModelCatalog>,
    config: Arc<EngineConfig>,
}

impl SharedGraph {
    pub fn new(store: GraphStore, catalog: ModelCatalog, config: EngineConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// A copy of the current graph.
    pub fn state(&self) -> GraphState {
        self.with_store(|store| store.state().clone())
    }

    /// Runs `f` with exclusive access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut GraphStore) -> R) -> R {
        let mut store = self.store.lock();
        f(&mut store)
    }

    /// Applies a turn; successful invocations stay applied even when others fail.
    pub fn run_turn(
        &self,
        invocations: &[RawToolInvocation],
        created_node_ids: Vec<NodeId>,
    ) -> TurnReport {
        let mut store = self.store.lock();
        ToolEngine::builder(&mut *store, &self.catalog)
            .with_config(&self.config)
            .build()
            .run_turn(invocations, created_node_ids)
    }

    /// Applies a turn all-or-nothing.
    ///
    /// When any invocation fails, the graph is restored to its state before the
    /// turn, `processed_count` is zero and the created-node list is handed back
    /// unchanged. The per-invocation replies still describe the attempt.
    pub fn run_turn_atomic(
        &self,
        invocations: &[RawToolInvocation],
        created_node_ids: Vec<NodeId>,
    ) -> TurnReport {
        let mut store = self.store.lock();
        let snapshot = store.snapshot();
        let mut report = ToolEngine::builder(&mut *store, &self.catalog)
            .with_config(&self.config)
            .build()
            .run_turn(invocations, created_node_ids.clone());

        if !report.success {
            warn!(
                "Rolling back turn: {} of {} invocations failed",
                report.errors.len(),
                invocations.len()
            );
            store.restore(snapshot);
            report.processed_count = 0;
            report.updated_created_node_ids = created_node_ids;
        }
        report
    }

    pub fn validate(&self) -> TopologyReport {
        let store = self.store.lock();
        validate_topology(store.state())
    }

    /// Compiles the current graph with the configured storage prefix.
    pub fn compile(&self, context: JobContext) -> Result<CompiledJob, CompileFailure> {
        let store = self.store.lock();
        Compiler::builder(store.state(), context)
            .with_config(&self.config)
            .build()
            .compile()
    }
}
