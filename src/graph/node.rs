//! Node algebra for the tariff computation graph
//!
//! The twelve node kinds form a closed sum type; the evaluator dispatches
//! with an exhaustive match. Dependencies are dense [`NodeId`] indices
//! assigned at graph construction, so per-evaluation state can live in
//! flat vectors instead of name-keyed maps.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::tables::Table;
use crate::value::{RoundingMode, Value};

/// Dense index of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Expected category of an INPUT node's context value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Decimal,
    Text,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Decimal => "decimal",
            InputKind::Text => "text",
        }
    }
}

/// Comparison operator of an IF condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            _ => None,
        }
    }

    pub fn apply(&self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

/// An IF branch: a constant baked at declaration time, or a reference to
/// another node that is only evaluated when selected.
#[derive(Debug, Clone)]
pub enum Branch {
    Constant(Value),
    Node(NodeId),
}

/// A SWITCH case key, typed by the incoming discriminator: text compares
/// by exact match, numbers by numeric equality.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseKey {
    Text(String),
    Number(Decimal),
}

impl CaseKey {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (CaseKey::Text(k), Value::Text(v)) => k == v,
            (CaseKey::Number(k), Value::Decimal(v)) => k == v,
            _ => false,
        }
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Read a named value from the evaluation context.
    Input { dtype: InputKind },
    /// A value fixed at declaration time.
    Constant { value: Value },
    /// Left-to-right sum of decimal inputs.
    Add { inputs: Vec<NodeId> },
    /// Left-to-right product of decimal inputs.
    Multiply { inputs: Vec<NodeId> },
    /// Query a shared table with the key node's value.
    Lookup {
        table_name: String,
        table: Arc<Table>,
        key: NodeId,
    },
    /// Compare a node against a threshold and take one branch.
    If {
        condition: NodeId,
        op: CompareOp,
        threshold: Decimal,
        then_branch: Branch,
        else_branch: Branch,
    },
    /// Round a decimal input to a fixed number of fractional digits.
    Round {
        input: NodeId,
        decimals: u32,
        mode: RoundingMode,
    },
    /// Multi-way selection over literal case keys.
    Switch {
        discriminator: NodeId,
        cases: Vec<(CaseKey, Value)>,
        default: Option<Value>,
    },
    /// First non-absent input, in order.
    Coalesce { inputs: Vec<NodeId> },
    /// Smallest non-absent decimal input.
    Min { inputs: Vec<NodeId> },
    /// Largest non-absent decimal input.
    Max { inputs: Vec<NodeId> },
    /// Decimal absolute value.
    Abs { input: NodeId },
}

/// A named node of the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Declaration-vocabulary name of the kind, for traces and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Input { .. } => "INPUT",
            NodeKind::Constant { .. } => "CONSTANT",
            NodeKind::Add { .. } => "ADD",
            NodeKind::Multiply { .. } => "MULTIPLY",
            NodeKind::Lookup { .. } => "LOOKUP",
            NodeKind::If { .. } => "IF",
            NodeKind::Round { .. } => "ROUND",
            NodeKind::Switch { .. } => "SWITCH",
            NodeKind::Coalesce { .. } => "COALESCE",
            NodeKind::Min { .. } => "MIN",
            NodeKind::Max { .. } => "MAX",
            NodeKind::Abs { .. } => "ABS",
        }
    }

    /// Every node this node may reference during evaluation, in declared
    /// order. Branch references of IF are included even though only one
    /// side is evaluated per call; visualization consumers want the full
    /// wiring.
    pub fn dependencies(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Input { .. } | NodeKind::Constant { .. } => Vec::new(),
            NodeKind::Add { inputs }
            | NodeKind::Multiply { inputs }
            | NodeKind::Coalesce { inputs }
            | NodeKind::Min { inputs }
            | NodeKind::Max { inputs } => inputs.clone(),
            NodeKind::Lookup { key, .. } => vec![*key],
            NodeKind::If { condition, then_branch, else_branch, .. } => {
                let mut deps = vec![*condition];
                if let Branch::Node(id) = then_branch {
                    deps.push(*id);
                }
                if let Branch::Node(id) = else_branch {
                    deps.push(*id);
                }
                deps
            }
            NodeKind::Round { input, .. } | NodeKind::Abs { input } => vec![*input],
            NodeKind::Switch { discriminator, .. } => vec![*discriminator],
        }
    }
}

pub(crate) fn case_matches(cases: &[(CaseKey, Value)], value: &Value) -> Option<Value> {
    cases
        .iter()
        .find(|(key, _)| key.matches(value))
        .map(|(_, v)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_compare_op_semantics() {
        assert!(CompareOp::Gt.apply(d("1500"), d("1000")));
        assert!(!CompareOp::Gt.apply(d("1000"), d("1000")));
        assert!(CompareOp::Ge.apply(d("1000"), d("1000")));
        assert!(CompareOp::Lt.apply(d("1"), d("2")));
        assert!(CompareOp::Le.apply(d("2"), d("2")));
        assert_eq!(CompareOp::parse(">="), Some(CompareOp::Ge));
        assert_eq!(CompareOp::parse("=="), None);
    }

    #[test]
    fn test_case_keys_compare_by_category() {
        let cases = vec![
            (CaseKey::Text("Paris".into()), Value::Decimal(d("1.5"))),
            (CaseKey::Number(d("2")), Value::Decimal(d("0.5"))),
        ];

        assert_eq!(
            case_matches(&cases, &Value::Text("Paris".into())),
            Some(Value::Decimal(d("1.5")))
        );
        // Numeric equality ignores trailing zeros.
        assert_eq!(
            case_matches(&cases, &Value::Decimal(d("2.00"))),
            Some(Value::Decimal(d("0.5")))
        );
        // Text never matches a number key, and vice versa.
        assert_eq!(case_matches(&cases, &Value::Text("2".into())), None);
        assert_eq!(case_matches(&cases, &Value::Absent), None);
    }
}
