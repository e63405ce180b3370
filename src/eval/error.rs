//! Structured evaluation errors
//!
//! Failures are wrapped exactly once, at the node where the cause
//! originates, into an [`EvaluationError`] carrying the node name, the
//! traversal path from the target down to that node, and a snapshot of the
//! evaluation context. Frames above the failing node re-raise untouched,
//! so the path always reflects the target-to-leaf boundary.

use std::error;
use std::fmt;

use thiserror::Error;

use crate::value::Context;

/// Innermost cause of an evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A concrete value was demanded where the context has none. Plain
    /// absence is not an error; only nodes that cannot tolerate it (an IF
    /// condition operand) raise this.
    #[error("missing input '{name}' where a concrete value is required")]
    MissingInput { name: String },

    #[error("expected {expected} but found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("table '{table}' has no row matching {key} and no default")]
    LookupMiss { table: String, key: String },

    #[error("dependency cycle detected through node '{name}'")]
    Cycle { name: String },

    #[error("reference to unknown node '{name}'")]
    UnresolvedReference { name: String },

    /// Numeric failure: invalid decimal literal, arithmetic overflow.
    #[error("{0}")]
    Domain(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// An evaluation failure with its location and context attached.
#[derive(Debug, Clone)]
pub struct EvaluationError {
    kind: ErrorKind,
    node: String,
    path: Vec<String>,
    context: Context,
}

impl EvaluationError {
    pub(crate) fn new(kind: ErrorKind, node: String, path: Vec<String>, context: Context) -> Self {
        Self { kind, node, path, context }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Name of the node at which the failure surfaced.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Traversal path from the target down to the failing node, inclusive.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Snapshot of the context the evaluation ran against.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Multi-line diagnostic with path and context, for logs and batch
    /// error reports.
    pub fn detail(&self) -> String {
        let mut out = format!("{}\n  Node: {}", self.kind, self.node);
        if !self.path.is_empty() {
            out.push_str(&format!("\n  Path: {}", self.path.join(" -> ")));
        }
        if !self.context.is_empty() {
            let entries: Vec<String> = self
                .context
                .sorted_entries()
                .into_iter()
                .take(5)
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            out.push_str(&format!("\n  Context: {}", entries.join(", ")));
        }
        out
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evaluation failed at node '{}'", self.node)?;
        if self.path.len() > 1 {
            write!(f, " (path: {})", self.path.join(" -> "))?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl error::Error for EvaluationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_node_path_and_cause() {
        let err = EvaluationError::new(
            ErrorKind::LookupMiss { table: "age_table".into(), key: "17".into() },
            "age_factor".into(),
            vec!["total".into(), "tech".into(), "age_factor".into()],
            Context::new().with("driver_age", 17),
        );

        let msg = err.to_string();
        assert!(msg.contains("age_factor"));
        assert!(msg.contains("total -> tech -> age_factor"));
        assert!(msg.contains("age_table"));

        let detail = err.detail();
        assert!(detail.contains("Node: age_factor"));
        assert!(detail.contains("driver_age=17"));
    }

    #[test]
    fn test_kind_is_exposed_as_source() {
        use std::error::Error;

        let err = EvaluationError::new(
            ErrorKind::Cycle { name: "a".into() },
            "a".into(),
            vec!["a".into()],
            Context::new(),
        );
        assert!(matches!(err.kind(), ErrorKind::Cycle { .. }));
        assert!(err.source().is_some());
    }
}
