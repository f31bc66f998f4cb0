use std::cmp::Ordering;
use std::sync::OnceLock;

use icu_collator::{Collator, CollatorOptions, Strength};

/// A single comparable field value pulled out of a record.
///
/// `Instant` carries a linear time value (what polars stores for its
/// date/datetime/time columns). Values of one column share a scale, which is
/// all the comparator needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Number(f64),
    Instant(i64),
    Text(String),
}

impl Value {
    fn coerce_text(&self) -> String {
        match self {
            Value::Absent => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Instant(i) => i.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

// Case-insensitive collation. Secondary strength folds case but keeps
// accents apart, which matches how a human reads mixed-case columns.
fn collator() -> &'static Collator {
    static COLLATOR: OnceLock<Collator> = OnceLock::new();
    COLLATOR.get_or_init(|| {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Secondary);
        Collator::try_new(&Default::default(), options).expect("collator data is compiled in")
    })
}

pub fn collate(a: &str, b: &str) -> Ordering {
    collator().compare(a, b)
}

/// Compare two field values in ascending sense.
///
/// Absent values order after every present value; a direction switch is the
/// caller's job (`Ordering::reverse`), which also flips absent values to the
/// front under descending. Pairs of mixed type fall back to collating their
/// textual form.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    use Value::*;
    match (a, b) {
        (Absent, Absent) => Ordering::Equal,
        (Absent, _) => Ordering::Greater,
        (_, Absent) => Ordering::Less,
        (Instant(a), Instant(b)) => a.cmp(b),
        (Text(a), Text(b)) => collate(a, b),
        // NaN has no order; treat such pairs as equal like the rest of the
        // comparator treats incomparable input.
        (Number(a), Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (a, b) => collate(&a.coerce_text(), &b.coerce_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_pairs_are_equal() {
        assert_eq!(compare(&Value::Absent, &Value::Absent), Ordering::Equal);
    }

    #[test]
    fn absent_orders_after_present() {
        assert_eq!(
            compare(&Value::Absent, &Value::Number(1.0)),
            Ordering::Greater
        );
        assert_eq!(compare(&Value::Number(1.0), &Value::Absent), Ordering::Less);
        assert_eq!(
            compare(&Value::Absent, &Value::Text("x".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn instants_compare_by_linear_value() {
        assert_eq!(
            compare(&Value::Instant(1_000), &Value::Instant(2_000)),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Instant(2_000), &Value::Instant(2_000)),
            Ordering::Equal
        );
    }

    #[test]
    fn text_collates_case_insensitively() {
        assert_eq!(
            compare(&Value::Text("Apple".into()), &Value::Text("banana".into())),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Text("apple".into()), &Value::Text("Apple".into())),
            Ordering::Equal
        );
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(
            compare(&Value::Number(2.0), &Value::Number(10.0)),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Number(f64::NAN), &Value::Number(1.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn mixed_types_collate_as_text() {
        // "2" collates after "10" once both sides are text
        assert_eq!(
            compare(&Value::Number(2.0), &Value::Text("10".into())),
            Ordering::Greater
        );
        assert_eq!(
            compare(&Value::Instant(5), &Value::Text("5".into())),
            Ordering::Equal
        );
    }
}
