//! Exact-match lookup table
//!
//! Keyed rows with the key type (text or integer) fixed at construction
//! and enforced at query time. A decimal key with no fractional part may
//! query an integer-keyed table; every other cross-type query is a type
//! mismatch rather than a silent conversion.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;

use super::LookupError;
use crate::value::Value;

/// Key type a table was declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Text,
    Integer,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Text => "text",
            KeyKind::Integer => "integer",
        }
    }
}

/// A stored key; all keys of one table share the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExactKey {
    Text(String),
    Integer(i64),
}

/// Exact-match table with an optional default for unmatched keys.
#[derive(Debug, Clone)]
pub struct ExactMatchTable {
    entries: HashMap<ExactKey, Value>,
    key_kind: KeyKind,
    default: Option<Value>,
}

impl ExactMatchTable {
    /// Build a text-keyed table from authored rows.
    pub fn with_text_keys(rows: Vec<(String, Value)>, default: Option<Value>) -> Self {
        Self {
            entries: rows
                .into_iter()
                .map(|(k, v)| (ExactKey::Text(k), v))
                .collect(),
            key_kind: KeyKind::Text,
            default,
        }
    }

    /// Build an integer-keyed table from authored rows.
    pub fn with_integer_keys(rows: Vec<(i64, Value)>, default: Option<Value>) -> Self {
        Self {
            entries: rows
                .into_iter()
                .map(|(k, v)| (ExactKey::Integer(k), v))
                .collect(),
            key_kind: KeyKind::Integer,
            default,
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Find the payload for an evaluated key value.
    pub fn lookup(&self, key: &Value) -> Result<&Value, LookupError> {
        let stored_key = match (self.key_kind, key) {
            (KeyKind::Text, Value::Text(s)) => ExactKey::Text(s.clone()),
            (KeyKind::Integer, Value::Decimal(d)) => {
                // Only whole decimals address integer keys.
                match d.fract().is_zero().then(|| d.trunc().to_i64()).flatten() {
                    Some(i) => ExactKey::Integer(i),
                    None => {
                        return Err(LookupError::KeyType {
                            expected: self.key_kind.as_str(),
                            found: key.kind_name(),
                        })
                    }
                }
            }
            _ => {
                return Err(LookupError::KeyType {
                    expected: self.key_kind.as_str(),
                    found: key.kind_name(),
                })
            }
        };

        match self.entries.get(&stored_key) {
            Some(value) => Ok(value),
            None => self.default.as_ref().ok_or(LookupError::Miss),
        }
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

    fn brand_table() -> ExactMatchTable {
        ExactMatchTable::with_text_keys(
            vec![
                ("BMW".into(), Value::Decimal(d("1.15"))),
                ("Toyota".into(), Value::Decimal(d("0.95"))),
            ],
            None,
        )
    }

    #[test]
    fn test_text_key_match_and_miss() {
        let table = brand_table();
        assert_eq!(
            table.lookup(&Value::Text("BMW".into())).unwrap(),
            &Value::Decimal(d("1.15"))
        );
        assert_eq!(table.lookup(&Value::Text("Lada".into())), Err(LookupError::Miss));
    }

    #[test]
    fn test_miss_falls_back_to_default() {
        let table = ExactMatchTable::with_text_keys(
            vec![("BMW".into(), Value::Decimal(d("1.15")))],
            Some(Value::Decimal(d("1.0"))),
        );
        assert_eq!(
            table.lookup(&Value::Text("Lada".into())).unwrap(),
            &Value::Decimal(d("1.0"))
        );
    }

    #[test]
    fn test_integer_keys_accept_whole_decimals() {
        let table = ExactMatchTable::with_integer_keys(
            vec![(75, Value::Decimal(d("1.5"))), (69, Value::Decimal(d("1.2")))],
            None,
        );
        assert_eq!(
            table.lookup(&Value::Decimal(d("75"))).unwrap(),
            &Value::Decimal(d("1.5"))
        );
        // Same key authored with trailing zeros still matches.
        assert_eq!(
            table.lookup(&Value::Decimal(d("75.0"))).unwrap(),
            &Value::Decimal(d("1.5"))
        );
    }

    #[test]
    fn test_fractional_key_against_integer_table_is_a_type_error() {
        let table =
            ExactMatchTable::with_integer_keys(vec![(75, Value::Decimal(d("1.5")))], None);
        assert_eq!(
            table.lookup(&Value::Decimal(d("75.5"))),
            Err(LookupError::KeyType { expected: "integer", found: "decimal" })
        );
    }

    #[test]
    fn test_cross_type_queries_are_rejected() {
        let text_table = brand_table();
        assert_eq!(
            text_table.lookup(&Value::Decimal(d("5"))),
            Err(LookupError::KeyType { expected: "text", found: "decimal" })
        );

        let int_table =
            ExactMatchTable::with_integer_keys(vec![(1, Value::Decimal(d("2")))], None);
        assert_eq!(
            int_table.lookup(&Value::Text("1".into())),
            Err(LookupError::KeyType { expected: "integer", found: "text" })
        );
    }
}
