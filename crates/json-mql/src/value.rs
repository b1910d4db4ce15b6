//! Value model shared by expressions and predicates.
//!
//! Values are plain `serde_json::Value`s. Numbers keep their textual digits
//! (`arbitrary_precision`) and are lifted into [`Decimal`] for arithmetic and
//! ordering. Instants have no tag of their own: a string that parses as an
//! RFC 3339 timestamp is an instant wherever an instant is meaningful.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::str::FromStr;

/// A document is the top-level object every expression and predicate runs against.
pub type Document = Map<String, Value>;

// ---------------------------------------------------------------- Ordering

/// Orders two values the way the query dialect does.
///
/// The rules are keyed on the first operand and are deliberately asymmetric:
///
/// - `false` equals `false` and is less than anything else, `null` included;
/// - `null` is less than everything, itself included;
/// - anything else is greater than a `null` second operand;
/// - numbers order by decimal magnitude, strings by code point;
/// - `true` equals `true` and is greater than anything else;
/// - arrays and objects have no order and compare as equal.
///
/// Numbers and strings facing a value of another type fall back to the type
/// rank `number < string < object < array < bool`.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match a {
        Value::Bool(false) => {
            if matches!(b, Value::Bool(false)) {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        Value::Null => Ordering::Less,
        _ if b.is_null() => Ordering::Greater,
        Value::Number(x) => match b {
            Value::Number(y) => compare_numbers(x, y),
            _ => rank(a).cmp(&rank(b)),
        },
        Value::String(x) => match b {
            Value::String(y) => x.as_str().cmp(y.as_str()),
            _ => rank(a).cmp(&rank(b)),
        },
        Value::Bool(true) => {
            if matches!(b, Value::Bool(true)) {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        }
        Value::Array(_) | Value::Object(_) => Ordering::Equal,
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    match (number_to_decimal(x), number_to_decimal(y)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

/// True when both values are booleans, both numbers, or both strings.
///
/// Ordered relational operators only apply to such pairs.
pub fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_))
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
    )
}

/// Structural equality with decimal number semantics.
///
/// `1` equals `1.0`, arrays compare position by position, objects compare by
/// key set regardless of key order.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| equals(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| equals(x, y)))
        }
        _ => false,
    }
}

/// Truthiness: `false`, `null` and numeric zero (in any representation) are false-like.
///
/// Empty strings, arrays and objects are true-like.
pub fn is_false(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => match number_to_decimal(n) {
            Some(d) => d.is_zero(),
            None => n.as_f64() == Some(0.0),
        },
        _ => false,
    }
}

// ---------------------------------------------------------------- Numbers

pub fn number_to_decimal(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
        .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
}

/// Decimal view of a number; `None` for every other value.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => number_to_decimal(n),
        _ => None,
    }
}

/// Integral value of a number, `None` when it has a fractional part or does not fit.
pub fn to_i64(value: &Value) -> Option<i64> {
    to_decimal(value)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i64())
}

pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Renders a decimal as a JSON number without trailing zeros.
pub fn from_decimal(d: Decimal) -> Value {
    let text = d.normalize().to_string();
    serde_json::from_str::<Number>(&text)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// IEEE result of a transcendental function. NaN and infinities become `null`.
pub fn from_f64(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

pub fn from_i64(n: i64) -> Value {
    Value::Number(Number::from(n))
}

// ---------------------------------------------------------------- Instants

/// Parses an RFC 3339 timestamp, or a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` taken as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if text.len() < 19 || !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Like [`parse_instant`], additionally accepting a bare `YYYY-MM-DD` date as midnight UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    parse_instant(text).or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

pub fn as_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant(s),
        _ => None,
    }
}

/// Renders an instant in UTC with a `Z` suffix; fractional seconds only when present.
pub fn render_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn instant_value(instant: DateTime<Utc>) -> Value {
    Value::String(render_instant(instant))
}

// ---------------------------------------------------------------- Types

/// Type name of a value as reported by `$type`.
///
/// Integral numbers are `int` or `long` by magnitude, other numbers `double`;
/// strings holding an instant are `date`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => match to_i64(value) {
            Some(n) if i32::try_from(n).is_ok() => "int",
            Some(_) => "long",
            None => "double",
        },
        Value::String(s) => {
            if parse_instant(s).is_some() {
                "date"
            } else {
                "string"
            }
        }
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_first_is_always_less() {
        assert_eq!(compare(&json!(null), &json!(null)), Ordering::Less);
        assert_eq!(compare(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare(&json!(null), &json!(0)), Ordering::Less);
    }

    #[test]
    fn false_first_checks_its_own_branch() {
        assert_eq!(compare(&json!(false), &json!(false)), Ordering::Equal);
        assert_eq!(compare(&json!(false), &json!(null)), Ordering::Less);
        assert_eq!(compare(&json!(false), &json!(true)), Ordering::Less);
    }

    #[test]
    fn null_second_orders_below() {
        assert_eq!(compare(&json!(1), &json!(null)), Ordering::Greater);
        assert_eq!(compare(&json!("a"), &json!(null)), Ordering::Greater);
        assert_eq!(compare(&json!([1]), &json!(null)), Ordering::Greater);
        assert_eq!(compare(&json!(true), &json!(null)), Ordering::Greater);
    }

    #[test]
    fn scalars_order_within_type() {
        assert_eq!(compare(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare(&json!(1.0), &json!(1)), Ordering::Equal);
        assert_eq!(compare(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare(&json!(true), &json!(true)), Ordering::Equal);
        assert_eq!(compare(&json!(true), &json!(false)), Ordering::Greater);
        assert_eq!(compare(&json!([3]), &json!([1, 2])), Ordering::Equal);
        assert_eq!(compare(&json!(5), &json!("5")), Ordering::Less);
    }

    #[test]
    fn comparable_pairs() {
        assert!(comparable(&json!(1), &json!(2.5)));
        assert!(comparable(&json!("a"), &json!("b")));
        assert!(comparable(&json!(true), &json!(false)));
        assert!(!comparable(&json!(1), &json!("1")));
        assert!(!comparable(&json!(null), &json!(null)));
        assert!(!comparable(&json!([1]), &json!([1])));
    }

    #[test]
    fn equality_is_structural() {
        assert!(equals(&json!({"a": 1, "b": [1, 2]}), &json!({"b": [1, 2.0], "a": 1})));
        assert!(!equals(&json!([1, 2]), &json!([2, 1])));
        assert!(!equals(&json!(0), &json!(false)));
        assert!(!equals(&json!(null), &json!(0)));
    }

    #[test]
    fn truthiness() {
        assert!(is_false(&json!(false)));
        assert!(is_false(&json!(null)));
        assert!(is_false(&json!(0)));
        assert!(is_false(&json!(0.0)));
        assert!(is_false(&json!(-0.0)));
        assert!(!is_false(&json!(0.5)));
        assert!(!is_false(&json!("")));
        assert!(!is_false(&json!([])));
        assert!(!is_false(&json!({})));
        assert!(!is_false(&json!(true)));
    }

    #[test]
    fn decimals_render_without_trailing_zeros() {
        let d = to_decimal(&json!(1.50)).unwrap();
        assert_eq!(from_decimal(d), json!(1.5));
        let d = to_decimal(&json!(0.1)).unwrap() + to_decimal(&json!(0.2)).unwrap();
        assert_eq!(from_decimal(d), json!(0.3));
        assert_eq!(from_decimal(Decimal::from(1600)), json!(1600));
    }

    #[test]
    fn instants_round_trip() {
        let instant = parse_instant("2020-04-21T00:00:00Z").unwrap();
        assert_eq!(render_instant(instant), "2020-04-21T00:00:00Z");
        let instant = parse_instant("2020-04-21T02:00:00.250+02:00").unwrap();
        assert_eq!(render_instant(instant), "2020-04-21T00:00:00.250Z");
        assert!(parse_instant("2020-04-21T00:00:00").is_some());
        assert!(parse_instant("2020-04-21").is_none());
        assert!(parse_date("2020-04-21").is_some());
        assert!(parse_instant("hello").is_none());
    }

    #[test]
    fn type_names() {
        assert_eq!(type_name(&json!(1)), "int");
        assert_eq!(type_name(&json!(5_000_000_000i64)), "long");
        assert_eq!(type_name(&json!(1.5)), "double");
        assert_eq!(type_name(&json!("x")), "string");
        assert_eq!(type_name(&json!("2020-01-01T00:00:00Z")), "date");
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!([])), "array");
        assert_eq!(type_name(&json!({})), "object");
        assert_eq!(type_name(&json!(false)), "bool");
    }
}
