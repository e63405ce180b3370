//! Lookup tables backing LOOKUP nodes
//!
//! Two variants: [`RangeTable`] for inclusive numeric intervals and
//! [`ExactMatchTable`] for keyed rows. Tables are built once, then shared
//! read-only across evaluations through a [`TableRegistry`].

mod exact;
mod range;
pub mod loader;

pub use exact::{ExactKey, ExactMatchTable, KeyKind};
pub use range::RangeTable;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a table query; the evaluator translates this into
/// the evaluation error taxonomy with node and path attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no matching row and no default")]
    Miss,
    #[error("key type mismatch: table expects {expected}, got {found}")]
    KeyType {
        expected: &'static str,
        found: &'static str,
    },
}

/// A lookup table of either variant.
#[derive(Debug, Clone)]
pub enum Table {
    Range(RangeTable),
    Exact(ExactMatchTable),
}

impl Table {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Table::Range(_) => "range",
            Table::Exact(_) => "exact",
        }
    }

    pub fn as_range(&self) -> Option<&RangeTable> {
        match self {
            Table::Range(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_exact(&self) -> Option<&ExactMatchTable> {
        match self {
            Table::Exact(t) => Some(t),
            _ => None,
        }
    }
}

/// Named store of shared tables, resolved by LOOKUP descriptors at graph
/// construction.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, Arc<Table>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under a symbolic name, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), Arc::new(table));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered names, sorted for deterministic reporting.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
