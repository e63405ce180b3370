//! Ordered-range lookup table
//!
//! Rows are inclusive `[lo, hi]` decimal intervals. The table keeps them
//! sorted by `lo` ascending (ties by insertion order) so a query is a
//! binary search plus a bounded candidate check, O(log n) for the common
//! disjoint case. Authored intervals should be disjoint; when they are
//! not, the earliest-inserted interval containing the key wins.

use rust_decimal::Decimal;

use super::LookupError;
use crate::value::Value;

/// One inclusive interval with its payload.
#[derive(Debug, Clone)]
struct Interval {
    lo: Decimal,
    hi: Decimal,
    value: Value,
    /// Position in the authored sequence; the overlap tie-breaker.
    ordinal: usize,
}

impl Interval {
    fn contains(&self, key: Decimal) -> bool {
        self.lo <= key && key <= self.hi
    }
}

/// Range table with an optional default for keys outside every interval.
#[derive(Debug, Clone)]
pub struct RangeTable {
    /// Sorted by `lo` ascending, stable on insertion order.
    intervals: Vec<Interval>,
    default: Option<Value>,
}

impl RangeTable {
    /// Build from authored rows in declaration order.
    pub fn new(rows: Vec<(Decimal, Decimal, Value)>, default: Option<Value>) -> Self {
        let mut intervals: Vec<Interval> = rows
            .into_iter()
            .enumerate()
            .map(|(ordinal, (lo, hi, value))| Interval { lo, hi, value, ordinal })
            .collect();
        intervals.sort_by(|a, b| a.lo.cmp(&b.lo).then(a.ordinal.cmp(&b.ordinal)));
        Self { intervals, default }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Find the payload for `key`.
    ///
    /// Binary search locates the last interval whose `lo` does not exceed
    /// the key; that interval, its left neighbor, and a right neighbor
    /// tied on `lo` are the only candidates that can contain the key. The
    /// containing candidate with the smallest insertion ordinal wins.
    pub fn lookup(&self, key: Decimal) -> Result<&Value, LookupError> {
        let upper = self.intervals.partition_point(|iv| iv.lo <= key);
        if upper == 0 {
            // Key below every interval.
            return self.default.as_ref().ok_or(LookupError::Miss);
        }

        let i = upper - 1;
        let mut best: Option<&Interval> = None;
        let candidates = [
            i.checked_sub(1),
            Some(i),
            match self.intervals.get(i + 1) {
                Some(next) if next.lo == self.intervals[i].lo => Some(i + 1),
                _ => None,
            },
        ];

        for idx in candidates.into_iter().flatten() {
            let iv = &self.intervals[idx];
            if iv.contains(key) && best.map_or(true, |b| iv.ordinal < b.ordinal) {
                best = Some(iv);
            }
        }

        match best {
            Some(iv) => Ok(&iv.value),
            None => self.default.as_ref().ok_or(LookupError::Miss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn motor_age_table() -> RangeTable {
        RangeTable::new(
            vec![
                (d("18"), d("25"), Value::Decimal(d("1.8"))),
                (d("26"), d("35"), Value::Decimal(d("1.2"))),
                (d("36"), d("55"), Value::Decimal(d("1.0"))),
                (d("56"), d("99"), Value::Decimal(d("1.3"))),
            ],
            None,
        )
    }

    #[rstest]
    #[case("18", "1.8")] // lower boundary inclusive
    #[case("22", "1.8")]
    #[case("25", "1.8")] // upper boundary inclusive
    #[case("26", "1.2")]
    #[case("35", "1.2")]
    #[case("45", "1.0")]
    #[case("56", "1.3")]
    #[case("99", "1.3")]
    fn test_disjoint_intervals_return_their_payload(#[case] key: &str, #[case] expected: &str) {
        let table = motor_age_table();
        assert_eq!(table.lookup(d(key)).unwrap(), &Value::Decimal(d(expected)));
    }

    #[test]
    fn test_key_below_all_intervals_misses_without_default() {
        let table = motor_age_table();
        assert_eq!(table.lookup(d("17")), Err(LookupError::Miss));
    }

    #[test]
    fn test_key_in_gap_or_above_falls_back_to_default() {
        let table = RangeTable::new(
            vec![
                (d("0"), d("10"), Value::Decimal(d("1"))),
                (d("20"), d("30"), Value::Decimal(d("2"))),
            ],
            Some(Value::Decimal(d("9"))),
        );
        assert_eq!(table.lookup(d("15")).unwrap(), &Value::Decimal(d("9")));
        assert_eq!(table.lookup(d("31")).unwrap(), &Value::Decimal(d("9")));
        assert_eq!(table.lookup(d("-1")).unwrap(), &Value::Decimal(d("9")));
    }

    #[test]
    fn test_overlap_earliest_insertion_wins() {
        // Authored order: [10,25] first, [20,30] second.
        let table = RangeTable::new(
            vec![
                (d("10"), d("25"), Value::Decimal(d("1"))),
                (d("20"), d("30"), Value::Decimal(d("2"))),
            ],
            None,
        );
        assert_eq!(table.lookup(d("22")).unwrap(), &Value::Decimal(d("1")));
        // Outside the overlap, each interval still answers for itself.
        assert_eq!(table.lookup(d("12")).unwrap(), &Value::Decimal(d("1")));
        assert_eq!(table.lookup(d("28")).unwrap(), &Value::Decimal(d("2")));
    }

    #[test]
    fn test_overlap_tiebreak_independent_of_lo_order() {
        // Same rows authored with the later-inserted interval starting lower.
        let table = RangeTable::new(
            vec![
                (d("20"), d("30"), Value::Decimal(d("2"))),
                (d("10"), d("25"), Value::Decimal(d("1"))),
            ],
            None,
        );
        // [20,30] was inserted first, so it wins inside the overlap.
        assert_eq!(table.lookup(d("22")).unwrap(), &Value::Decimal(d("2")));
        assert_eq!(table.lookup(d("12")).unwrap(), &Value::Decimal(d("1")));
    }

    #[test]
    fn test_equal_lo_ties_resolved_by_insertion_order() {
        let table = RangeTable::new(
            vec![
                (d("10"), d("30"), Value::Decimal(d("1"))),
                (d("10"), d("25"), Value::Decimal(d("2"))),
            ],
            None,
        );
        assert_eq!(table.lookup(d("12")).unwrap(), &Value::Decimal(d("1")));
        // Only the wider interval contains 28.
        assert_eq!(table.lookup(d("28")).unwrap(), &Value::Decimal(d("1")));
    }

    #[test]
    fn test_decimal_keys_are_matched_exactly() {
        let table = RangeTable::new(
            vec![(d("0.5"), d("1.5"), Value::Decimal(d("7")))],
            None,
        );
        assert_eq!(table.lookup(d("0.50")).unwrap(), &Value::Decimal(d("7")));
        assert_eq!(table.lookup(d("1.5")).unwrap(), &Value::Decimal(d("7")));
        assert_eq!(table.lookup(d("1.51")), Err(LookupError::Miss));
    }

    #[test]
    fn test_empty_table_uses_default_or_misses() {
        let empty = RangeTable::new(vec![], None);
        assert_eq!(empty.lookup(d("1")), Err(LookupError::Miss));

        let with_default = RangeTable::new(vec![], Some(Value::Decimal(d("4"))));
        assert_eq!(with_default.lookup(d("1")).unwrap(), &Value::Decimal(d("4")));
    }
}
