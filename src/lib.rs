//! Rating Engine - deterministic declarative pricing for P&C insurance tariffs
//!
//! This library provides:
//! - A twelve-kind node algebra forming a tariff computation DAG
//! - Ordered-range and exact-match lookup tables with O(log n) range queries
//! - A memoized evaluator with trace capture and structured errors
//! - Parallel batch evaluation with per-row error isolation
//! - A per-node profiler integrated with the evaluation cache
//!
//! Graphs and tables are built once and shared read-only across
//! evaluations; all arithmetic is exact fixed-precision decimal, with
//! rounding confined to explicit ROUND nodes.

pub mod eval;
pub mod fingerprint;
pub mod graph;
pub mod tables;
pub mod value;

// Re-export commonly used types
pub use eval::{ErrorKind, EvaluationError, Profiler, ProfilerStats, Trace};
pub use graph::{
    BranchDescriptor, CaseKey, CompareOp, GraphError, InputKind, LookupMode, NodeDescriptor,
    TariffGraph, TariffMetadata,
};
pub use tables::{ExactMatchTable, KeyKind, RangeTable, Table, TableRegistry};
pub use value::{Context, ContextValue, RoundingMode, Value};
