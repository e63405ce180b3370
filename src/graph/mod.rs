//! Tariff graph: named nodes, product metadata, evaluation entry points

mod descriptor;
mod metadata;
mod node;

pub use descriptor::{BranchDescriptor, GraphError, LookupMode, NodeDescriptor};
pub use metadata::TariffMetadata;
pub use node::{Branch, CaseKey, CompareOp, InputKind, Node, NodeId, NodeKind};

pub(crate) use node::case_matches;

use std::collections::HashMap;

use crate::eval::{self, EvaluationError, Profiler, Trace};
use crate::tables::TableRegistry;
use crate::value::{Context, Value};

/// Owning container of a tariff's computation DAG.
///
/// Built once from parsed descriptors and a table registry, then immutable
/// and safe to share across concurrent evaluations.
#[derive(Debug, Clone)]
pub struct TariffGraph {
    /// Dense storage; a node's position equals its `NodeId`.
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    metadata: TariffMetadata,
}

impl TariffGraph {
    /// Build a graph from named descriptors in declaration order.
    ///
    /// Duplicate names, unresolved references, unknown tables, table-mode
    /// mismatches, and empty input lists are rejected here. Reference
    /// cycles are not: the evaluator detects them on first traversal.
    pub fn new(
        metadata: TariffMetadata,
        descriptors: Vec<(String, NodeDescriptor)>,
        tables: &TableRegistry,
    ) -> Result<Self, GraphError> {
        let (nodes, index) = descriptor::build_nodes(descriptors, tables)?;
        Ok(Self { nodes, index, metadata })
    }

    pub fn metadata(&self) -> &TariffMetadata {
        &self.metadata
    }

    /// Look a node up by name.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|id| &self.nodes[id.index()])
    }

    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in declaration order, for visualization consumers.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Dependency names of a node, in declared order.
    pub fn dependency_names(&self, node: &Node) -> Vec<&str> {
        node.dependencies()
            .iter()
            .map(|id| self.nodes[id.index()].name())
            .collect()
    }

    /// Evaluate `target` against one context.
    pub fn evaluate(&self, target: &str, context: &Context) -> Result<Value, EvaluationError> {
        eval::evaluate(self, target, context, None, None)
    }

    /// Evaluate `target`, populating the given trace and/or profiler.
    pub fn evaluate_observed(
        &self,
        target: &str,
        context: &Context,
        trace: Option<&mut Trace>,
        profiler: Option<&mut Profiler>,
    ) -> Result<Value, EvaluationError> {
        eval::evaluate(self, target, context, trace, profiler)
    }

    /// Evaluate `target` against each context independently, aborting with
    /// the first failing row's error (in input order).
    pub fn evaluate_batch(
        &self,
        target: &str,
        contexts: &[Context],
    ) -> Result<Vec<Value>, EvaluationError> {
        eval::evaluate_batch(self, target, contexts)
    }

    /// Batch evaluation with per-row error capture: failing rows yield
    /// `Value::Absent` and their structured error in the parallel vector.
    pub fn evaluate_batch_collecting(
        &self,
        target: &str,
        contexts: &[Context],
    ) -> (Vec<Value>, Vec<Option<EvaluationError>>) {
        eval::evaluate_batch_collecting(self, target, contexts)
    }
}
