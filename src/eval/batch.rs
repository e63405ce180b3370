//! Batch evaluation over independent contexts
//!
//! Evaluation is pure given (graph, tables, context), so rows run in
//! parallel with rayon; collecting into a vector preserves input order,
//! which keeps the parallel schedule indistinguishable from sequential
//! execution. Per-row state (cache, traversal stack) is fresh; no
//! inter-row memoization is attempted since the inputs differ.

use std::collections::BTreeSet;
use std::io::Write;

use rayon::prelude::*;

use super::error::EvaluationError;
use super::evaluator;
use crate::graph::TariffGraph;
use crate::value::{Context, Value};

/// Evaluate each context, aborting with the error of the first failing
/// row in input order.
pub(crate) fn evaluate_batch(
    graph: &TariffGraph,
    target: &str,
    contexts: &[Context],
) -> Result<Vec<Value>, EvaluationError> {
    let rows: Vec<Result<Value, EvaluationError>> = contexts
        .par_iter()
        .map(|context| evaluator::evaluate(graph, target, context, None, None))
        .collect();

    rows.into_iter().collect()
}

/// Evaluate each context, capturing failures per row instead of aborting:
/// a failing row yields `Value::Absent` and its structured error in the
/// parallel vector.
pub(crate) fn evaluate_batch_collecting(
    graph: &TariffGraph,
    target: &str,
    contexts: &[Context],
) -> (Vec<Value>, Vec<Option<EvaluationError>>) {
    contexts
        .par_iter()
        .map(|context| match evaluator::evaluate(graph, target, context, None, None) {
            Ok(value) => (value, None),
            Err(err) => (Value::Absent, Some(err)),
        })
        .unzip()
}

/// Write batch results as CSV: `row_index,result,error` plus one column
/// per context key (union across rows, sorted).
pub fn write_batch_csv<W: Write>(
    writer: W,
    contexts: &[Context],
    results: &[Value],
    errors: &[Option<EvaluationError>],
) -> csv::Result<()> {
    let context_keys: BTreeSet<&str> = contexts
        .iter()
        .flat_map(|ctx| ctx.iter().map(|(k, _)| k))
        .collect();

    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["row_index".to_string(), "result".to_string(), "error".to_string()];
    header.extend(context_keys.iter().map(|k| k.to_string()));
    out.write_record(&header)?;

    for (i, (result, context)) in results.iter().zip(contexts).enumerate() {
        let mut row = vec![
            i.to_string(),
            result.to_string(),
            errors
                .get(i)
                .and_then(|e| e.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_default(),
        ];
        for &key in &context_keys {
            row.push(context.get(key).map(|v| v.to_string()).unwrap_or_default());
        }
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ErrorKind;
    use crate::graph::{BranchDescriptor, CompareOp, NodeDescriptor, TariffMetadata};
    use crate::tables::TableRegistry;
    use crate::value::ContextValue;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Premium that demands a concrete `age`: IF on an absent condition is
    /// fatal, which gives the error-handling tests a failing row.
    fn surcharge_graph() -> TariffGraph {
        TariffGraph::new(
            TariffMetadata::new("MOTOR_PRIVATE", "2024_09", "EUR"),
            vec![
                ("age".into(), NodeDescriptor::Input { dtype: crate::graph::InputKind::Decimal }),
                ("base".into(), NodeDescriptor::Constant { value: Value::Decimal(d("100")) }),
                (
                    "surcharge".into(),
                    NodeDescriptor::If {
                        condition: "age".into(),
                        op: CompareOp::Lt,
                        threshold: d("25"),
                        then_branch: BranchDescriptor::Constant(Value::Decimal(d("50"))),
                        else_branch: BranchDescriptor::Constant(Value::Decimal(d("0"))),
                    },
                ),
                (
                    "premium".into(),
                    NodeDescriptor::Add { inputs: vec!["base".into(), "surcharge".into()] },
                ),
            ],
            &TableRegistry::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_batch_matches_single_evaluations_in_order() {
        let graph = surcharge_graph();
        let contexts: Vec<Context> = (18..40)
            .map(|age| Context::new().with("age", age))
            .collect();

        let batch = graph.evaluate_batch("premium", &contexts).unwrap();

        assert_eq!(batch.len(), contexts.len());
        for (i, context) in contexts.iter().enumerate() {
            let single = graph.evaluate("premium", context).unwrap();
            assert_eq!(batch[i], single, "row {}", i);
        }
        assert_eq!(batch[0], Value::Decimal(d("150"))); // age 18
        assert_eq!(batch[21], Value::Decimal(d("100"))); // age 39
    }

    #[test]
    fn test_abort_mode_reports_first_failing_row() {
        let graph = surcharge_graph();
        let contexts = vec![
            Context::new().with("age", 30),
            Context::new(), // fails: IF demands a concrete age
            Context::new().with("age", "bad-number"), // fails differently
        ];

        let err = graph.evaluate_batch("premium", &contexts).unwrap_err();
        // Row 1's error wins over row 2's, regardless of scheduling.
        assert!(matches!(err.kind(), ErrorKind::MissingInput { name } if name == "age"));
    }

    #[test]
    fn test_collecting_mode_isolates_failing_rows() {
        let graph = surcharge_graph();
        let contexts = vec![
            Context::new().with("age", 22),
            Context::new(),
            Context::new().with("age", 40),
        ];

        let (results, errors) = graph.evaluate_batch_collecting("premium", &contexts);

        assert_eq!(results.len(), 3);
        assert_eq!(errors.len(), 3);
        assert_eq!(results[0], Value::Decimal(d("150")));
        assert_eq!(results[1], Value::Absent);
        assert_eq!(results[2], Value::Decimal(d("100")));
        assert!(errors[0].is_none());
        assert!(errors[2].is_none());

        let err = errors[1].as_ref().unwrap();
        assert!(matches!(err.kind(), ErrorKind::MissingInput { .. }));
        assert_eq!(err.node(), "surcharge");
    }

    #[test]
    fn test_empty_batch_is_empty() {
        let graph = surcharge_graph();
        assert!(graph.evaluate_batch("premium", &[]).unwrap().is_empty());
        let (results, errors) = graph.evaluate_batch_collecting("premium", &[]);
        assert!(results.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_batch_csv_export() {
        let graph = surcharge_graph();
        let contexts = vec![
            Context::new().with("age", 22),
            Context::new(),
        ];
        let (results, errors) = graph.evaluate_batch_collecting("premium", &contexts);

        let mut buffer = Vec::new();
        write_batch_csv(&mut buffer, &contexts, &results, &errors).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "row_index,result,error,age");
        assert_eq!(lines[1], "0,150,,22");
        assert!(lines[2].starts_with("1,,"));
        assert!(lines[2].contains("surcharge"));
    }

    #[test]
    fn test_row_contexts_are_independent() {
        let graph = surcharge_graph();
        // Same graph, interleaved young/old/missing rows; each row's answer
        // depends only on its own context.
        let contexts = vec![
            Context::new().with("age", 20),
            Context::new(),
            Context::new().with("age", 20),
        ];

        let (results, _) = graph.evaluate_batch_collecting("premium", &contexts);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0], Value::Decimal(d("150")));
        assert_eq!(
            contexts[0].get("age"),
            Some(&ContextValue::Integer(20)),
        );
    }
}
