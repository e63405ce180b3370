//! Memoized depth-first evaluation driver
//!
//! One [`Evaluator`] lives for exactly one evaluation. It owns the dense
//! per-call cache, the in-progress set used for cycle detection, and the
//! traversal path threaded into traces and errors. Dependencies resolve
//! recursively through `eval`, so IF and COALESCE only touch the branches
//! they actually select.
//!
//! Profiler time is exclusive of descendants: each frame accumulates its
//! children's inclusive time and subtracts it from its own before
//! recording.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use super::error::{ErrorKind, EvaluationError};
use super::profiler::Profiler;
use super::trace::Trace;
use crate::graph::{case_matches, Branch, InputKind, Node, NodeId, NodeKind, TariffGraph};
use crate::tables::{LookupError, Table};
use crate::value::{round_decimal, Context, ContextValue, Value};

/// Evaluate `target` in `graph` against `context`, feeding the optional
/// observers.
pub(crate) fn evaluate(
    graph: &TariffGraph,
    target: &str,
    context: &Context,
    mut trace: Option<&mut Trace>,
    mut profiler: Option<&mut Profiler>,
) -> Result<Value, EvaluationError> {
    let Some(id) = graph.resolve(target) else {
        return Err(EvaluationError::new(
            ErrorKind::UnresolvedReference { name: target.to_string() },
            target.to_string(),
            vec![target.to_string()],
            context.clone(),
        ));
    };

    let mut evaluator = Evaluator {
        graph,
        context,
        cache: vec![None; graph.node_count()],
        in_progress: vec![false; graph.node_count()],
        path: Vec::new(),
        child_time: Vec::new(),
        trace: trace.as_deref_mut(),
        profiler: profiler.as_deref_mut(),
    };
    evaluator.eval(id)
}

struct Evaluator<'g, 'o> {
    graph: &'g TariffGraph,
    context: &'g Context,
    /// Dense per-evaluation memo, indexed by `NodeId`.
    cache: Vec<Option<Value>>,
    /// Nodes currently on the traversal stack; re-entry is a cycle.
    in_progress: Vec<bool>,
    path: Vec<NodeId>,
    /// Per-frame accumulator of descendant inclusive time.
    child_time: Vec<Duration>,
    trace: Option<&'o mut Trace>,
    profiler: Option<&'o mut Profiler>,
}

impl<'g, 'o> Evaluator<'g, 'o> {
    fn eval(&mut self, id: NodeId) -> Result<Value, EvaluationError> {
        let graph = self.graph;
        let node = graph.node(id);

        if let Some(cached) = self.cache[id.index()].clone() {
            if let Some(profiler) = self.profiler.as_deref_mut() {
                profiler.record_cache_hit(node.name());
            }
            if let Some(trace) = self.trace.as_deref_mut() {
                if !trace.contains(node.name()) {
                    let mut path = path_names(graph, &self.path);
                    path.push(node.name().to_string());
                    trace.record(node.name(), cached.clone(), node.kind_name(), path);
                }
            }
            return Ok(cached);
        }

        if self.in_progress[id.index()] {
            let mut path = path_names(graph, &self.path);
            path.push(node.name().to_string());
            return Err(EvaluationError::new(
                ErrorKind::Cycle { name: node.name().to_string() },
                node.name().to_string(),
                path,
                self.context.clone(),
            ));
        }

        if let Some(profiler) = self.profiler.as_deref_mut() {
            profiler.record_cache_miss(node.name());
        }

        self.in_progress[id.index()] = true;
        self.path.push(id);
        self.child_time.push(Duration::ZERO);
        let timing = self.profiler.as_deref().map_or(false, Profiler::is_enabled);
        let started = timing.then(Instant::now);

        let outcome = self.compute(node);

        let own_children = self.child_time.pop().unwrap_or_default();
        self.path.pop();
        self.in_progress[id.index()] = false;

        if let Some(started) = started {
            let inclusive = started.elapsed();
            if let Some(parent) = self.child_time.last_mut() {
                *parent += inclusive;
            }
            if let Some(profiler) = self.profiler.as_deref_mut() {
                profiler.record_compute(node.name(), inclusive.saturating_sub(own_children));
            }
        }

        let value = outcome?;
        self.cache[id.index()] = Some(value.clone());
        if let Some(trace) = self.trace.as_deref_mut() {
            let mut path = path_names(graph, &self.path);
            path.push(node.name().to_string());
            trace.record(node.name(), value.clone(), node.kind_name(), path);
        }
        Ok(value)
    }

    fn compute(&mut self, node: &'g Node) -> Result<Value, EvaluationError> {
        match node.kind() {
            NodeKind::Input { dtype } => self.compute_input(node, *dtype),
            NodeKind::Constant { value } => Ok(value.clone()),
            NodeKind::Add { inputs } => {
                self.compute_reduce(node, inputs, Decimal::ZERO, Decimal::checked_add)
            }
            NodeKind::Multiply { inputs } => {
                self.compute_reduce(node, inputs, Decimal::ONE, Decimal::checked_mul)
            }
            NodeKind::Lookup { table_name, table, key } => {
                let table = table.clone();
                let key_value = self.eval(*key)?;
                if key_value.is_absent() {
                    return Ok(Value::Absent);
                }
                let found = match table.as_ref() {
                    Table::Range(ranged) => {
                        let key = key_value.as_decimal().ok_or_else(|| {
                            self.fail(node, ErrorKind::TypeMismatch {
                                expected: "decimal",
                                found: key_value.kind_name(),
                            })
                        })?;
                        ranged.lookup(key)
                    }
                    Table::Exact(exact) => exact.lookup(&key_value),
                };
                match found {
                    Ok(value) => Ok(value.clone()),
                    Err(LookupError::Miss) => Err(self.fail(node, ErrorKind::LookupMiss {
                        table: table_name.clone(),
                        key: key_value.to_string(),
                    })),
                    Err(LookupError::KeyType { expected, found }) => {
                        Err(self.fail(node, ErrorKind::TypeMismatch { expected, found }))
                    }
                }
            }
            NodeKind::If { condition, op, threshold, then_branch, else_branch } => {
                let operand = match self.eval(*condition)? {
                    Value::Absent => {
                        let name = self.graph.node(*condition).name().to_string();
                        return Err(self.fail(node, ErrorKind::MissingInput { name }));
                    }
                    Value::Text(_) => {
                        return Err(self.fail(node, ErrorKind::TypeMismatch {
                            expected: "decimal",
                            found: "text",
                        }))
                    }
                    Value::Decimal(d) => d,
                };
                let branch =
                    if op.apply(operand, *threshold) { then_branch } else { else_branch };
                match branch {
                    Branch::Constant(value) => Ok(value.clone()),
                    Branch::Node(id) => self.eval(*id),
                }
            }
            NodeKind::Round { input, decimals, mode } => match self.eval(*input)? {
                Value::Absent => Ok(Value::Absent),
                Value::Decimal(d) => Ok(Value::Decimal(round_decimal(d, *decimals, *mode))),
                Value::Text(_) => Err(self.fail(node, ErrorKind::TypeMismatch {
                    expected: "decimal",
                    found: "text",
                })),
            },
            NodeKind::Switch { discriminator, cases, default } => {
                let value = self.eval(*discriminator)?;
                if value.is_absent() {
                    return Ok(Value::Absent);
                }
                match case_matches(cases, &value) {
                    Some(found) => Ok(found),
                    None => Ok(default.clone().unwrap_or(Value::Absent)),
                }
            }
            NodeKind::Coalesce { inputs } => {
                for id in inputs {
                    let value = self.eval(*id)?;
                    if !value.is_absent() {
                        return Ok(value);
                    }
                }
                Ok(Value::Absent)
            }
            NodeKind::Min { inputs } => self.compute_extremum(node, inputs, true),
            NodeKind::Max { inputs } => self.compute_extremum(node, inputs, false),
            NodeKind::Abs { input } => match self.eval(*input)? {
                Value::Absent => Ok(Value::Absent),
                Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
                Value::Text(_) => Err(self.fail(node, ErrorKind::TypeMismatch {
                    expected: "decimal",
                    found: "text",
                })),
            },
        }
    }

    fn compute_input(&mut self, node: &Node, dtype: InputKind) -> Result<Value, EvaluationError> {
        let context = self.context;
        let raw = match context.get(node.name()) {
            None | Some(ContextValue::Null) => return Ok(Value::Absent),
            Some(raw) => raw,
        };

        match dtype {
            InputKind::Decimal => match raw {
                ContextValue::Integer(i) => Ok(Value::Decimal(Decimal::from(*i))),
                ContextValue::Decimal(d) => Ok(Value::Decimal(*d)),
                ContextValue::Text(s) => match s.trim().parse::<Decimal>() {
                    Ok(d) => Ok(Value::Decimal(d)),
                    Err(_) => Err(self.fail(
                        node,
                        ErrorKind::Domain(format!("invalid decimal literal '{}'", s)),
                    )),
                },
                ContextValue::Null => unreachable!("null handled above"),
            },
            InputKind::Text => match raw {
                ContextValue::Text(s) => Ok(Value::Text(s.clone())),
                other => Err(self.fail(node, ErrorKind::TypeMismatch {
                    expected: "text",
                    found: other.kind_name(),
                })),
            },
        }
    }

    /// ADD / MULTIPLY: evaluate every input left-to-right, then fold.
    /// Any absent input lifts to an absent result; any text input is
    /// fatal.
    fn compute_reduce(
        &mut self,
        node: &Node,
        inputs: &[NodeId],
        identity: Decimal,
        op: fn(Decimal, Decimal) -> Option<Decimal>,
    ) -> Result<Value, EvaluationError> {
        let values = self.eval_all(inputs)?;
        let mut acc = identity;
        for value in values {
            match value {
                Value::Absent => return Ok(Value::Absent),
                Value::Decimal(d) => {
                    acc = op(acc, d).ok_or_else(|| {
                        self.fail(node, ErrorKind::Domain("decimal overflow".to_string()))
                    })?;
                }
                Value::Text(_) => {
                    return Err(self.fail(node, ErrorKind::TypeMismatch {
                        expected: "decimal",
                        found: "text",
                    }))
                }
            }
        }
        Ok(Value::Decimal(acc))
    }

    /// MIN / MAX: evaluate every input, drop absents, keep the extremum.
    /// The first occurrence wins on numeric ties.
    fn compute_extremum(
        &mut self,
        node: &Node,
        inputs: &[NodeId],
        smallest: bool,
    ) -> Result<Value, EvaluationError> {
        let values = self.eval_all(inputs)?;
        let mut best: Option<Decimal> = None;
        for value in values {
            match value {
                Value::Absent => continue,
                Value::Decimal(d) => {
                    best = Some(match best {
                        None => d,
                        Some(current) => {
                            let replace = if smallest { d < current } else { d > current };
                            if replace { d } else { current }
                        }
                    });
                }
                Value::Text(_) => {
                    return Err(self.fail(node, ErrorKind::TypeMismatch {
                        expected: "decimal",
                        found: "text",
                    }))
                }
            }
        }
        Ok(best.map_or(Value::Absent, Value::Decimal))
    }

    fn eval_all(&mut self, inputs: &[NodeId]) -> Result<Vec<Value>, EvaluationError> {
        inputs.iter().map(|id| self.eval(*id)).collect()
    }

    /// Wrap a cause at the node where it originated. Frames above the
    /// failing node propagate the result untouched.
    fn fail(&self, node: &Node, kind: ErrorKind) -> EvaluationError {
        EvaluationError::new(
            kind,
            node.name().to_string(),
            path_names(self.graph, &self.path),
            self.context.clone(),
        )
    }
}

fn path_names(graph: &TariffGraph, path: &[NodeId]) -> Vec<String> {
    path.iter().map(|id| graph.node(*id).name().to_string()).collect()
}
