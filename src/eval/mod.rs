//! Evaluation: memoized driver, observers, batch runner, error model

mod batch;
mod error;
mod evaluator;
mod profiler;
mod trace;

pub use batch::write_batch_csv;
pub use error::{ErrorKind, EvaluationError};
pub use profiler::{NodeReport, NodeStats, Profiler, ProfilerStats};
pub use trace::{Trace, TraceRecord};

pub(crate) use batch::{evaluate_batch, evaluate_batch_collecting};
pub(crate) use evaluator::evaluate;
