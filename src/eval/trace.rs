//! Per-evaluation trace capture and export
//!
//! A trace records every node touched during one evaluation: the value it
//! produced, its kind, and the discovery path (target down to the node)
//! by which it was first reached. Records are keyed in a sorted map so
//! exports iterate deterministically.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use serde_json::json;

use crate::graph::TariffMetadata;
use crate::value::{Context, Value};

/// One traced node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub value: Value,
    /// Declaration-vocabulary kind name (`"ADD"`, `"LOOKUP"`, ...).
    pub kind: &'static str,
    /// Node names from the target down to this node, inclusive.
    pub path: Vec<String>,
}

/// Trace of a single evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    records: BTreeMap<String, TraceRecord>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &str) -> Option<&TraceRecord> {
        self.records.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.records.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in node-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TraceRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn record(
        &mut self,
        node: &str,
        value: Value,
        kind: &'static str,
        path: Vec<String>,
    ) {
        self.records
            .entry(node.to_string())
            .or_insert(TraceRecord { value, kind, path });
    }

    /// Export as a JSON document, optionally embedding tariff metadata and
    /// the evaluation context.
    pub fn to_json(
        &self,
        metadata: Option<&TariffMetadata>,
        context: Option<&Context>,
    ) -> serde_json::Result<String> {
        let mut doc = json!({ "trace": self });
        if let Some(metadata) = metadata {
            doc["metadata"] = serde_json::to_value(metadata)?;
        }
        if let Some(context) = context {
            let entries: serde_json::Map<String, serde_json::Value> = context
                .sorted_entries()
                .into_iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
            doc["context"] = serde_json::Value::Object(entries);
        }
        serde_json::to_string_pretty(&doc)
    }

    /// Export one CSV row per traced node:
    /// `node_name,node_type,value,path`.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(["node_name", "node_type", "value", "path"])?;
        for (name, record) in self.iter() {
            let value = record.value.to_string();
            let path = record.path.join(" -> ");
            out.write_record([name, record.kind, value.as_str(), path.as_str()])?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_trace() -> Trace {
        let mut trace = Trace::new();
        trace.record(
            "total",
            Value::Decimal(d("525")),
            "ADD",
            vec!["total".into()],
        );
        trace.record(
            "base",
            Value::Decimal(d("500")),
            "CONSTANT",
            vec!["total".into(), "base".into()],
        );
        trace
    }

    #[test]
    fn test_first_recording_wins() {
        let mut trace = sample_trace();
        trace.record("base", Value::Decimal(d("999")), "CONSTANT", vec!["base".into()]);

        let record = trace.get("base").unwrap();
        assert_eq!(record.value, Value::Decimal(d("500")));
        assert_eq!(record.path, vec!["total".to_string(), "base".to_string()]);
    }

    #[test]
    fn test_json_export_embeds_metadata_and_context() {
        let trace = sample_trace();
        let metadata = TariffMetadata::new("MOTOR_PRIVATE", "2024_09", "EUR");
        let context = Context::new().with("driver_age", 22);

        let doc: serde_json::Value = serde_json::from_str(
            &trace.to_json(Some(&metadata), Some(&context)).unwrap(),
        )
        .unwrap();

        assert_eq!(doc["metadata"]["product"], "MOTOR_PRIVATE");
        assert_eq!(doc["context"]["driver_age"], "22");
        assert_eq!(doc["trace"]["total"]["kind"], "ADD");
        // Decimals export as strings to preserve precision.
        assert_eq!(doc["trace"]["total"]["value"], "525");
    }

    #[test]
    fn test_csv_export_is_sorted_by_node_name() {
        let trace = sample_trace();
        let mut buffer = Vec::new();
        trace.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "node_name,node_type,value,path");
        assert!(lines[1].starts_with("base,CONSTANT,500,"));
        assert!(lines[2].starts_with("total,ADD,525,"));
    }
}
