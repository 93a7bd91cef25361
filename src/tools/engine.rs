use super::invocation::{
    ADD_NODE, AddConnectionArgs, AddNodeArgs, DeleteConnectionArgs, DeleteNodeArgs,
    RawToolInvocation, ToolInvocation, UpdateNodePropertiesArgs,
};
use super::properties::parse_patch;
use super::recovery::{EndpointRecovery, LatestOfKind, implied_kind};
use crate::catalog::ModelCatalog;
use crate::config::EngineConfig;
use crate::error::ToolError;
use crate::graph::{ConnectionRef, GraphMutator, GraphState, NodeId, NodeKind};
use crate::validation::is_compatible;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;

/// Placeholder an assistant uses for "the node I just created".
pub const NEW_NODE_ID: &str = "NEW_NODE_ID";

/// Cross-invocation memory of one conversational turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnContext {
    /// Ids of nodes created so far in this conversation, oldest first.
    pub created_node_ids: Vec<NodeId>,
}

impl TurnContext {
    pub fn new(created_node_ids: Vec<NodeId>) -> Self {
        Self { created_node_ids }
    }

    pub fn last_created(&self) -> Option<&NodeId> {
        self.created_node_ids.last()
    }
}

/// What a successful invocation did to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    NodeAdded { node_id: NodeId, kind: NodeKind },
    NodeUpdated { node_id: NodeId },
    NodeDeleted { node_id: NodeId },
    Connected {
        edge_id: String,
        source_id: NodeId,
        target_id: NodeId,
    },
    /// The pair was already connected; treated as success.
    AlreadyConnected { source_id: NodeId, target_id: NodeId },
    Disconnected { reference: ConnectionRef },
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::NodeAdded { node_id, kind } => {
                write!(f, "Added {} node '{}'", kind, node_id)
            }
            ToolOutcome::NodeUpdated { node_id } => write!(f, "Updated node '{}'", node_id),
            ToolOutcome::NodeDeleted { node_id } => write!(f, "Deleted node '{}'", node_id),
            ToolOutcome::Connected {
                source_id,
                target_id,
                ..
            } => write!(f, "Connected '{}' to '{}'", source_id, target_id),
            ToolOutcome::AlreadyConnected {
                source_id,
                target_id,
            } => write!(
                f,
                "'{}' and '{}' are already connected",
                source_id, target_id
            ),
            ToolOutcome::Disconnected { reference } => {
                write!(f, "Removed connection {}", reference)
            }
        }
    }
}

/// Per-invocation status handed back to the assistant transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReply {
    pub success: bool,
    pub message: String,
}

impl ToolReply {
    pub fn from_result(result: &Result<ToolOutcome, ToolError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                message: outcome.to_string(),
            },
            Err(error) => Self {
                success: false,
                message: error.to_string(),
            },
        }
    }

    /// For transports that mark a tool call as failed by rejecting it.
    pub fn into_result(self) -> Result<String, String> {
        if self.success {
            Ok(self.message)
        } else {
            Err(self.message)
        }
    }
}

/// A failed invocation, with its position in the turn.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationError {
    pub index: usize,
    pub tool_name: String,
    pub error: ToolError,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index + 1, self.tool_name, self.error)
    }
}

/// Result of applying one turn of invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// True iff no invocation failed.
    pub success: bool,
    /// Number of invocations applied without error.
    pub processed_count: usize,
    pub errors: Vec<InvocationError>,
    pub updated_created_node_ids: Vec<NodeId>,
    /// One reply per invocation, in order.
    pub replies: Vec<ToolReply>,
}

/// Applies assistant tool invocations to a borrowed graph.
///
/// Each call reads the graph as the previous call left it. There is no
/// rollback: earlier successful invocations stay applied when a later one fails.
pub struct ToolEngine<'a, M: GraphMutator + ?Sized> {
    graph: &'a mut M,
    catalog: &'a ModelCatalog,
    max_nodes: usize,
    max_edges: usize,
    recovery: Option<Box<dyn EndpointRecovery>>,
}

pub struct ToolEngineBuilder<'a, M: GraphMutator + ?Sized> {
    graph: &'a mut M,
    catalog: &'a ModelCatalog,
    max_nodes: usize,
    max_edges: usize,
    recovery: Option<Box<dyn EndpointRecovery>>,
}

impl<'a, M: GraphMutator + ?Sized> ToolEngineBuilder<'a, M> {
    pub fn new(graph: &'a mut M, catalog: &'a ModelCatalog) -> Self {
        let defaults = EngineConfig::default();
        Self {
            graph,
            catalog,
            max_nodes: defaults.max_nodes,
            max_edges: defaults.max_edges,
            recovery: Some(Box::new(LatestOfKind)),
        }
    }

    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.max_nodes = config.max_nodes;
        self.max_edges = config.max_edges;
        if !config.endpoint_recovery {
            self.recovery = None;
        }
        self
    }

    pub fn with_limits(mut self, max_nodes: usize, max_edges: usize) -> Self {
        self.max_nodes = max_nodes;
        self.max_edges = max_edges;
        self
    }

    pub fn with_recovery(mut self, recovery: Box<dyn EndpointRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn without_recovery(mut self) -> Self {
        self.recovery = None;
        self
    }

    pub fn build(self) -> ToolEngine<'a, M> {
        ToolEngine {
            graph: self.graph,
            catalog: self.catalog,
            max_nodes: self.max_nodes,
            max_edges: self.max_edges,
            recovery: self.recovery,
        }
    }
}

impl<'a, M: GraphMutator + ?Sized> ToolEngine<'a, M> {
    pub fn builder(graph: &'a mut M, catalog: &'a ModelCatalog) -> ToolEngineBuilder<'a, M> {
        ToolEngineBuilder::new(graph, catalog)
    }

    pub fn graph(&self) -> &GraphState {
        self.graph.state()
    }

    /// Applies a turn strictly in order, threading `created_node_ids` through
    /// every call and handing the updated list back in the report.
    pub fn run_turn(
        &mut self,
        invocations: &[RawToolInvocation],
        created_node_ids: Vec<NodeId>,
    ) -> TurnReport {
        let mut ctx = TurnContext::new(created_node_ids);
        let mut errors = Vec::new();
        let mut replies = Vec::with_capacity(invocations.len());
        let mut processed_count = 0;

        for (index, raw) in invocations.iter().enumerate() {
            let result = self.execute_raw(raw, &mut ctx);
            replies.push(ToolReply::from_result(&result));
            match result {
                Ok(outcome) => {
                    debug!("{} #{} succeeded: {}", raw.tool_name, index + 1, outcome);
                    processed_count += 1;
                }
                Err(error) => {
                    warn!("{} #{} failed: {}", raw.tool_name, index + 1, error);
                    errors.push(InvocationError {
                        index,
                        tool_name: raw.tool_name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Turn finished: {}/{} invocations applied",
            processed_count,
            invocations.len()
        );
        TurnReport {
            success: errors.is_empty(),
            processed_count,
            errors,
            updated_created_node_ids: ctx.created_node_ids,
            replies,
        }
    }

    pub fn execute_raw(
        &mut self,
        raw: &RawToolInvocation,
        ctx: &mut TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        let invocation = ToolInvocation::from_raw(raw)?;
        self.execute(&invocation, ctx)
    }

    pub fn execute(
        &mut self,
        invocation: &ToolInvocation,
        ctx: &mut TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        match invocation {
            ToolInvocation::UpdateNodeProperties(args) => self.update_node_properties(args, ctx),
            ToolInvocation::AddNode(args) => self.add_node(args, ctx),
            ToolInvocation::DeleteNode(args) => self.delete_node(args, ctx),
            ToolInvocation::AddConnection(args) => self.add_connection(args, ctx),
            ToolInvocation::DeleteConnection(args) => self.delete_connection(args, ctx),
        }
    }

    /// Replaces `NEW_NODE_ID` with the last node created in this conversation.
    fn resolve_reference(&self, node_id: &str, ctx: &TurnContext) -> Result<NodeId, ToolError> {
        if node_id.trim() != NEW_NODE_ID {
            return Ok(node_id.trim().to_string());
        }
        let resolved = ctx
            .last_created()
            .cloned()
            .ok_or(ToolError::UnresolvedNewNodeId)?;
        debug!("Resolved {} to '{}'", NEW_NODE_ID, resolved);
        Ok(resolved)
    }

    fn require_existing(&self, node_id: &str, ctx: &TurnContext) -> Result<NodeId, ToolError> {
        let resolved = self.resolve_reference(node_id, ctx)?;
        if self.graph.state().contains_node(&resolved) {
            Ok(resolved)
        } else {
            Err(ToolError::NodeNotFound(resolved))
        }
    }

    /// Resolves a connection endpoint, falling back to endpoint recovery when
    /// the id is not in the graph.
    fn resolve_endpoint(
        &self,
        node_id: &str,
        handle: &str,
        ctx: &TurnContext,
    ) -> Result<NodeId, ToolError> {
        let resolved = self.resolve_reference(node_id, ctx)?;
        let state = self.graph.state();
        if state.contains_node(&resolved) {
            return Ok(resolved);
        }
        let recovered = self.recovery.as_ref().and_then(|recovery| {
            implied_kind(handle)
                .and_then(|kind| recovery.recover(state, &ctx.created_node_ids, kind))
        });
        match recovered {
            Some(recovered) => {
                warn!(
                    "Endpoint '{}' not found; recovered '{}' from handle '{}'",
                    resolved, recovered, handle
                );
                Ok(recovered)
            }
            None => Err(ToolError::NodeNotFound(resolved)),
        }
    }

    fn update_node_properties(
        &mut self,
        args: &UpdateNodePropertiesArgs,
        ctx: &TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        let node_id = self.require_existing(&args.node_id, ctx)?;
        let requested =
            NodeKind::parse(&args.kind).ok_or_else(|| ToolError::UnknownNodeKind(args.kind.clone()))?;

        let node = self
            .graph
            .state()
            .node(&node_id)
            .ok_or_else(|| ToolError::NodeNotFound(node_id.clone()))?;
        if node.kind() != requested {
            return Err(ToolError::KindMismatch {
                node_id,
                actual: node.kind(),
                requested,
            });
        }
        if node.is_locked() {
            return Err(ToolError::NodeLocked(node_id));
        }

        let patch = parse_patch(requested, &args.properties, self.catalog)?;
        if !self.graph.update_node_data(&node_id, patch) {
            return Err(ToolError::UpdateRejected(node_id));
        }
        Ok(ToolOutcome::NodeUpdated { node_id })
    }

    fn add_node(
        &mut self,
        args: &AddNodeArgs,
        ctx: &mut TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        let kind =
            NodeKind::parse(&args.kind).ok_or_else(|| ToolError::UnknownNodeKind(args.kind.clone()))?;
        if !args.position.is_finite() {
            return Err(ToolError::InvalidArguments {
                tool: ADD_NODE.to_string(),
                message: "position.x and position.y must be finite numbers".to_string(),
            });
        }
        if self.graph.state().nodes.len() >= self.max_nodes {
            return Err(ToolError::NodeLimitReached {
                limit: self.max_nodes,
            });
        }

        let node_id = self.graph.add_node(kind, args.position);
        ctx.created_node_ids.push(node_id.clone());
        Ok(ToolOutcome::NodeAdded { node_id, kind })
    }

    fn delete_node(
        &mut self,
        args: &DeleteNodeArgs,
        ctx: &TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        let node_id = self.require_existing(&args.node_id, ctx)?;
        if !self.graph.delete_node(&node_id) {
            return Err(ToolError::DeleteFailed(node_id));
        }
        Ok(ToolOutcome::NodeDeleted { node_id })
    }

    fn add_connection(
        &mut self,
        args: &AddConnectionArgs,
        ctx: &TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        if self.graph.state().edges.len() >= self.max_edges {
            return Err(ToolError::EdgeLimitReached {
                limit: self.max_edges,
            });
        }
        let source_id = self.resolve_endpoint(&args.source_id, &args.source_handle, ctx)?;
        let target_id = self.resolve_endpoint(&args.target_id, &args.target_handle, ctx)?;

        if !is_compatible(
            self.graph.state(),
            &source_id,
            &target_id,
            &args.source_handle,
            &args.target_handle,
        ) {
            return Err(ToolError::ConnectionRejected {
                source_id,
                target_id,
                source_handle: args.source_handle.clone(),
                target_handle: args.target_handle.clone(),
            });
        }
        // Only a well-typed duplicate counts as already connected.
        if self.graph.state().has_connection(&source_id, &target_id) {
            warn!(
                "'{}' -> '{}' already connected, keeping the existing edge",
                source_id, target_id
            );
            return Ok(ToolOutcome::AlreadyConnected {
                source_id,
                target_id,
            });
        }

        if !self.graph.add_connection(
            &source_id,
            &target_id,
            &args.source_handle,
            &args.target_handle,
        ) {
            return Err(ToolError::ConnectionRejected {
                source_id,
                target_id,
                source_handle: args.source_handle.clone(),
                target_handle: args.target_handle.clone(),
            });
        }

        let edge_id = self
            .graph
            .state()
            .edges
            .iter()
            .rev()
            .find(|e| e.connects(&source_id, &target_id))
            .map(|e| e.id.clone())
            .unwrap_or_default();
        Ok(ToolOutcome::Connected {
            edge_id,
            source_id,
            target_id,
        })
    }

    fn delete_connection(
        &mut self,
        args: &DeleteConnectionArgs,
        ctx: &TurnContext,
    ) -> Result<ToolOutcome, ToolError> {
        let reference = match args.reference()? {
            ConnectionRef::Endpoints {
                source_id,
                target_id,
            } => ConnectionRef::Endpoints {
                source_id: self.resolve_reference(&source_id, ctx)?,
                target_id: self.resolve_reference(&target_id, ctx)?,
            },
            by_id => by_id,
        };
        if !self.graph.delete_connection(&reference) {
            return Err(ToolError::ConnectionNotFound(reference.to_string()));
        }
        Ok(ToolOutcome::Disconnected { reference })
    }
}
