//! Value model shared by nodes, tables, and evaluation contexts
//!
//! Every node evaluates to a [`Value`]: a first-class null (`Absent`), an
//! exact decimal, or text. Decimal and text are disjoint categories; the
//! engine never converts between them implicitly. Callers supply raw
//! [`ContextValue`]s per quote; INPUT nodes are the only place raw values
//! are coerced into the engine's value algebra.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Result of evaluating any node.
///
/// `Absent` is distinct from decimal zero and from empty text; arithmetic
/// nodes lift it (absent in, absent out) rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// First-class null.
    Absent,
    /// Exact fixed-precision decimal.
    Decimal(Decimal),
    /// Opaque text (lookup keys, switch discriminators).
    Text(String),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// The decimal payload, if this value is a decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// The text payload, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Category name used in type-mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => Ok(()),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Raw caller-supplied value for one input name.
///
/// Contexts carry these untouched; the coercion rules of the INPUT node
/// decide what they become inside the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// Explicitly supplied null (distinct from a missing key only in that
    /// the caller chose to state it; both read as absent).
    Null,
    Integer(i64),
    Decimal(Decimal),
    Text(String),
}

impl ContextValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ContextValue::Null => "null",
            ContextValue::Integer(_) => "integer",
            ContextValue::Decimal(_) => "decimal",
            ContextValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Null => Ok(()),
            ContextValue::Integer(i) => write!(f, "{}", i),
            ContextValue::Decimal(d) => write!(f, "{}", d),
            ContextValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Integer(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        ContextValue::Integer(i as i64)
    }
}

impl From<Decimal> for ContextValue {
    fn from(d: Decimal) -> Self {
        ContextValue::Decimal(d)
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => ContextValue::Null,
        }
    }
}

/// Input mapping for a single evaluation.
///
/// Names not referenced by any INPUT node are permitted and ignored;
/// missing keys read as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion for literal contexts.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Key-sorted view for deterministic reporting.
    pub fn sorted_entries(&self) -> Vec<(&str, &ContextValue)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

/// Rounding mode recognized by ROUND nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundingMode {
    /// Half away from zero.
    HalfUp,
    /// Banker's rounding.
    HalfEven,
}

impl RoundingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "HALF_UP",
            RoundingMode::HalfEven => "HALF_EVEN",
        }
    }

    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HALF_UP" => Ok(RoundingMode::HalfUp),
            "HALF_EVEN" => Ok(RoundingMode::HalfEven),
            other => Err(format!("unknown rounding mode '{}'", other)),
        }
    }
}

/// Round to `decimals` fractional digits under `mode`.
///
/// The result always carries exactly `decimals` fractional digits, so
/// `round(1267, 2, HalfUp)` displays as `1267.00`.
pub fn round_decimal(value: Decimal, decimals: u32, mode: RoundingMode) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(decimals, mode.strategy());
    rounded.rescale(decimals);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_half_up_rounds_midpoint_away_from_zero() {
        assert_eq!(round_decimal(d("2.345"), 2, RoundingMode::HalfUp), d("2.35"));
        assert_eq!(round_decimal(d("-2.345"), 2, RoundingMode::HalfUp), d("-2.35"));
        assert_eq!(round_decimal(d("2.5"), 0, RoundingMode::HalfUp), d("3"));
    }

    #[test]
    fn test_half_even_rounds_midpoint_to_even() {
        assert_eq!(round_decimal(d("2.345"), 2, RoundingMode::HalfEven), d("2.34"));
        assert_eq!(round_decimal(d("2.355"), 2, RoundingMode::HalfEven), d("2.36"));
        assert_eq!(round_decimal(d("2.5"), 0, RoundingMode::HalfEven), d("2"));
        assert_eq!(round_decimal(d("3.5"), 0, RoundingMode::HalfEven), d("4"));
    }

    #[test]
    fn test_round_pads_to_requested_scale() {
        let rounded = round_decimal(d("1267"), 2, RoundingMode::HalfUp);
        assert_eq!(rounded.to_string(), "1267.00");

        let rounded = round_decimal(d("500.000"), 2, RoundingMode::HalfUp);
        assert_eq!(rounded.to_string(), "500.00");
    }

    #[test]
    fn test_context_builder_and_lookup() {
        let ctx = Context::new()
            .with("driver_age", 22)
            .with("brand", "BMW")
            .with("bonus", d("0.95"))
            .with("optional", Option::<i64>::None);

        assert_eq!(ctx.get("driver_age"), Some(&ContextValue::Integer(22)));
        assert_eq!(ctx.get("brand"), Some(&ContextValue::Text("BMW".into())));
        assert_eq!(ctx.get("optional"), Some(&ContextValue::Null));
        assert!(ctx.get("missing").is_none());
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_value_category_names() {
        assert_eq!(Value::Absent.kind_name(), "absent");
        assert_eq!(Value::Decimal(Decimal::ONE).kind_name(), "decimal");
        assert_eq!(Value::Text("x".into()).kind_name(), "text");
        assert!(Value::Absent.is_absent());
        assert_eq!(Value::Decimal(d("1.5")).as_decimal(), Some(d("1.5")));
        assert_eq!(Value::Text("Paris".into()).as_text(), Some("Paris"));
    }
}
