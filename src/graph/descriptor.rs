//! Node descriptors: the hand-off format from the declaration parser
//!
//! An external parser turns the textual declaration into a list of named
//! [`NodeDescriptor`]s with name-based references. Graph construction
//! resolves those names to dense ids in two passes (allocate, then wire),
//! validating everything the evaluator is entitled to assume: unique
//! names, resolvable references, known tables in the right mode, and
//! non-empty input lists.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use super::node::{Branch, CaseKey, CompareOp, InputKind, Node, NodeId, NodeKind};
use crate::tables::{Table, TableRegistry};
use crate::value::{RoundingMode, Value};

/// Query mode requested by a LOOKUP descriptor; must match the variant of
/// the table it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    Range,
    Exact,
}

impl LookupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupMode::Range => "range",
            LookupMode::Exact => "exact",
        }
    }
}

/// An IF branch as declared: a baked constant or a node reference.
#[derive(Debug, Clone)]
pub enum BranchDescriptor {
    Constant(Value),
    Node(String),
}

/// Parsed form of one node declaration.
#[derive(Debug, Clone)]
pub enum NodeDescriptor {
    Input {
        dtype: InputKind,
    },
    Constant {
        value: Value,
    },
    Add {
        inputs: Vec<String>,
    },
    Multiply {
        inputs: Vec<String>,
    },
    Lookup {
        table: String,
        key_node: String,
        mode: LookupMode,
    },
    If {
        condition: String,
        op: CompareOp,
        threshold: Decimal,
        then_branch: BranchDescriptor,
        else_branch: BranchDescriptor,
    },
    Round {
        input: String,
        decimals: u32,
        mode: RoundingMode,
    },
    Switch {
        discriminator: String,
        cases: Vec<(CaseKey, Value)>,
        default: Option<Value>,
    },
    Coalesce {
        inputs: Vec<String>,
    },
    Min {
        inputs: Vec<String>,
    },
    Max {
        inputs: Vec<String>,
    },
    Abs {
        input: String,
    },
}

/// Structural error raised at graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),
    #[error("node '{node}' references unknown node '{reference}'")]
    UnresolvedReference { node: String, reference: String },
    #[error("node '{node}' references unknown table '{table}'")]
    UnknownTable { node: String, table: String },
    #[error("node '{node}' queries table '{table}' in {requested} mode but the table is {actual}")]
    TableModeMismatch {
        node: String,
        table: String,
        requested: &'static str,
        actual: &'static str,
    },
    #[error("node '{node}' requires at least one input")]
    EmptyInputs { node: String },
    #[error("SWITCH node '{node}' requires at least one case")]
    EmptyCases { node: String },
}

/// Resolve descriptors into wired nodes plus the name index.
pub(super) fn build_nodes(
    descriptors: Vec<(String, NodeDescriptor)>,
    tables: &TableRegistry,
) -> Result<(Vec<Node>, HashMap<String, NodeId>), GraphError> {
    // First pass: allocate dense ids in declaration order.
    let mut index: HashMap<String, NodeId> = HashMap::with_capacity(descriptors.len());
    for (position, (name, _)) in descriptors.iter().enumerate() {
        if index.insert(name.clone(), NodeId(position)).is_some() {
            return Err(GraphError::DuplicateNode(name.clone()));
        }
    }

    // Second pass: resolve references and wire kinds.
    let mut nodes = Vec::with_capacity(descriptors.len());
    for (position, (name, descriptor)) in descriptors.into_iter().enumerate() {
        let kind = wire(&name, descriptor, &index, tables)?;
        nodes.push(Node { name, id: NodeId(position), kind });
    }

    Ok((nodes, index))
}

fn wire(
    name: &str,
    descriptor: NodeDescriptor,
    index: &HashMap<String, NodeId>,
    tables: &TableRegistry,
) -> Result<NodeKind, GraphError> {
    let resolve = |reference: &str| -> Result<NodeId, GraphError> {
        index.get(reference).copied().ok_or_else(|| GraphError::UnresolvedReference {
            node: name.to_string(),
            reference: reference.to_string(),
        })
    };

    let resolve_all = |references: &[String]| -> Result<Vec<NodeId>, GraphError> {
        if references.is_empty() {
            return Err(GraphError::EmptyInputs { node: name.to_string() });
        }
        references.iter().map(|r| resolve(r)).collect()
    };

    Ok(match descriptor {
        NodeDescriptor::Input { dtype } => NodeKind::Input { dtype },
        NodeDescriptor::Constant { value } => NodeKind::Constant { value },
        NodeDescriptor::Add { inputs } => NodeKind::Add { inputs: resolve_all(&inputs)? },
        NodeDescriptor::Multiply { inputs } => {
            NodeKind::Multiply { inputs: resolve_all(&inputs)? }
        }
        NodeDescriptor::Lookup { table, key_node, mode } => {
            let shared: &Arc<Table> =
                tables.get(&table).ok_or_else(|| GraphError::UnknownTable {
                    node: name.to_string(),
                    table: table.clone(),
                })?;
            let actual = shared.kind_name();
            if actual != mode.as_str() {
                return Err(GraphError::TableModeMismatch {
                    node: name.to_string(),
                    table,
                    requested: mode.as_str(),
                    actual,
                });
            }
            NodeKind::Lookup {
                table_name: table,
                table: Arc::clone(shared),
                key: resolve(&key_node)?,
            }
        }
        NodeDescriptor::If { condition, op, threshold, then_branch, else_branch } => {
            NodeKind::If {
                condition: resolve(&condition)?,
                op,
                threshold,
                then_branch: wire_branch(then_branch, &resolve)?,
                else_branch: wire_branch(else_branch, &resolve)?,
            }
        }
        NodeDescriptor::Round { input, decimals, mode } => {
            NodeKind::Round { input: resolve(&input)?, decimals, mode }
        }
        NodeDescriptor::Switch { discriminator, cases, default } => {
            if cases.is_empty() {
                return Err(GraphError::EmptyCases { node: name.to_string() });
            }
            NodeKind::Switch { discriminator: resolve(&discriminator)?, cases, default }
        }
        NodeDescriptor::Coalesce { inputs } => {
            NodeKind::Coalesce { inputs: resolve_all(&inputs)? }
        }
        NodeDescriptor::Min { inputs } => NodeKind::Min { inputs: resolve_all(&inputs)? },
        NodeDescriptor::Max { inputs } => NodeKind::Max { inputs: resolve_all(&inputs)? },
        NodeDescriptor::Abs { input } => NodeKind::Abs { input: resolve(&input)? },
    })
}

fn wire_branch(
    branch: BranchDescriptor,
    resolve: &impl Fn(&str) -> Result<NodeId, GraphError>,
) -> Result<Branch, GraphError> {
    Ok(match branch {
        BranchDescriptor::Constant(value) => Branch::Constant(value),
        BranchDescriptor::Node(reference) => Branch::Node(resolve(&reference)?),
    })
}
