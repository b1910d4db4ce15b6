//! Field conditions: the value side of `{path: condition}`.

use super::compile_document;
use crate::features::Features;
use crate::operators::comparison::Relation;
use crate::operators::type_ops::has_type;
use crate::pattern;
use crate::util::any_element;
use crate::value::{self, equals, is_false};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Test over the candidates a field path resolves to; an empty slice means the
/// field is absent.
pub type FieldPredicate = Arc<dyn Fn(&[&Value]) -> bool + Send + Sync>;

type ElementTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

static NULL: Value = Value::Null;

fn field<F>(f: F) -> FieldPredicate
where
    F: Fn(&[&Value]) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

fn element<F>(f: F) -> ElementTest
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

fn negate(test: FieldPredicate) -> FieldPredicate {
    field(move |v| !test(v))
}

/// Whether `test` holds for a candidate or for an element of an array candidate.
fn any_element_of<F>(candidates: &[&Value], test: F) -> bool
where
    F: Fn(&Value) -> bool,
{
    candidates.iter().any(|candidate| any_element(candidate, &test))
}

/// Compiles a field condition: a regex value, an operator object, or a value
/// compared for equality.
pub fn compile_condition(condition: &Value, features: Option<&Features>) -> Option<FieldPredicate> {
    if pattern::is_regex_value(condition) {
        return regex_condition(pattern::from_regex_value(condition)?);
    }
    match condition {
        Value::Object(map) if map.keys().next().is_some_and(|k| k.starts_with('$')) => {
            compile_operators(map, features)
        }
        _ => Some(equality(condition.clone())),
    }
}

fn matches_regex(regex: &Regex, v: &Value) -> bool {
    matches!(v, Value::String(s) if regex.is_match(s))
}

fn regex_condition(regex: Regex) -> Option<FieldPredicate> {
    Some(field(move |v| any_element_of(v, |e| matches_regex(&regex, e))))
}

/// Equality that also lets a `null` target match an absent field.
fn equality(target: Value) -> FieldPredicate {
    field(move |v| match v {
        [] => target.is_null(),
        _ => any_element_of(v, |e| equals(e, &target)),
    })
}

/// All operators of an operator object; every one must hold.
fn compile_operators(
    map: &Map<String, Value>,
    features: Option<&Features>,
) -> Option<FieldPredicate> {
    let options = match map.get("$options") {
        None => "",
        Some(Value::String(options)) => options.as_str(),
        Some(_) => return None,
    };
    if !options.is_empty() && !map.contains_key("$regex") {
        return None;
    }
    let mut tests = Vec::with_capacity(map.len());
    for (name, arg) in map {
        match name.as_str() {
            "$options" => continue,
            "$regex" => tests.push(regex_condition(pattern::from_value(arg, options)?)?),
            _ => tests.push(compile_operator(name, arg, features)?),
        }
    }
    match tests.len() {
        0 => None,
        1 => tests.pop(),
        _ => Some(field(move |v| tests.iter().all(|test| test(v)))),
    }
}

fn compile_operator(
    name: &str,
    arg: &Value,
    features: Option<&Features>,
) -> Option<FieldPredicate> {
    if let Some(custom) = features.and_then(|f| f.query_operator(name)) {
        let test = custom(arg, features);
        return Some(field(move |v| match v {
            [] => test(&NULL),
            _ => v.iter().any(|&candidate| test(candidate)),
        }));
    }
    if let Some(relation) = Relation::from_operator(name) {
        return Some(relation_condition(relation, arg.clone()));
    }
    match name {
        "$in" => in_condition(arg),
        "$nin" => in_condition(arg).map(negate),
        "$exists" => {
            let wanted = !is_false(arg);
            Some(field(move |v| v.is_empty() != wanted))
        }
        "$type" => type_condition(arg),
        "$size" => {
            let size = usize::try_from(value::to_i64(arg)?).ok()?;
            Some(field(move |v| {
                v.iter().any(|candidate| match candidate {
                    Value::Array(items) => items.len() == size,
                    _ => false,
                })
            }))
        }
        "$all" => all_condition(arg, features),
        "$bitsAllSet" => bits_condition(arg, |bits, mask| bits & mask == mask),
        "$bitsAllClear" => bits_condition(arg, |bits, mask| bits & mask == 0),
        "$bitsAnySet" => bits_condition(arg, |bits, mask| bits & mask != 0),
        "$bitsAnyClear" => bits_condition(arg, |bits, mask| bits & mask != mask),
        "$mod" => mod_condition(arg),
        "$elemMatch" => elem_match_condition(arg, features),
        "$not" => not_condition(arg, features),
        _ => {
            debug!(operator = name, "unknown query operator");
            None
        }
    }
}

fn relation_condition(relation: Relation, target: Value) -> FieldPredicate {
    match relation {
        Relation::Eq => equality(target),
        Relation::Ne => negate(equality(target)),
        _ => field(move |v| any_element_of(v, |e| relation.test(e, &target))),
    }
}

/// An entry of an `$in`/`$nin` list: a regex value matches strings, anything
/// else matches by equality.
fn membership_test(entry: &Value) -> Option<ElementTest> {
    if pattern::is_regex_value(entry) {
        let regex = pattern::from_regex_value(entry)?;
        return Some(element(move |e| matches_regex(&regex, e)));
    }
    let target = entry.clone();
    Some(element(move |e| equals(e, &target)))
}

fn in_condition(arg: &Value) -> Option<FieldPredicate> {
    let Value::Array(entries) = arg else {
        return None;
    };
    let accepts_missing = entries.iter().any(Value::is_null);
    let tests: Vec<ElementTest> = entries.iter().map(membership_test).collect::<Option<_>>()?;
    Some(field(move |v| match v {
        [] => accepts_missing,
        _ => any_element_of(v, |e| tests.iter().any(|test| test(e))),
    }))
}

fn type_condition(arg: &Value) -> Option<FieldPredicate> {
    let aliases = match arg {
        Value::Array(aliases) if !aliases.is_empty() => aliases.clone(),
        Value::String(_) | Value::Number(_) => vec![arg.clone()],
        _ => return None,
    };
    Some(field(move |v| any_element_of(v, |e| aliases.iter().any(|alias| has_type(e, alias)))))
}

/// `$all`: every entry is present. An entry is a value (matched against the
/// field or any of its elements) or an `{$elemMatch: ..}` object.
fn all_condition(arg: &Value, features: Option<&Features>) -> Option<FieldPredicate> {
    let Value::Array(entries) = arg else {
        return None;
    };
    if entries.is_empty() {
        return Some(field(|_| false));
    }
    let mut tests = Vec::with_capacity(entries.len());
    for entry in entries {
        let test = match entry {
            Value::Object(map) if map.len() == 1 && map.contains_key("$elemMatch") => {
                elem_match_condition(map.get("$elemMatch")?, features)?
            }
            _ => {
                let target = entry.clone();
                field(move |v| any_element_of(v, |e| equals(e, &target)))
            }
        };
        tests.push(test);
    }
    Some(field(move |v| tests.iter().all(|test| test(v))))
}

/// Bit mask from a list of positions or a non-negative integer. Positions past
/// 63 fold onto the sign bit.
pub fn bit_mask(arg: &Value) -> Option<u64> {
    match arg {
        Value::Array(positions) => positions.iter().try_fold(0u64, |mask, position| {
            let position = u32::try_from(value::to_i64(position)?).ok()?;
            Some(mask | (1u64 << position.min(63)))
        }),
        Value::Number(_) => value::to_i64(arg).and_then(|n| u64::try_from(n).ok()),
        _ => None,
    }
}

fn bits_condition(arg: &Value, test: fn(u64, u64) -> bool) -> Option<FieldPredicate> {
    let mask = bit_mask(arg)?;
    Some(field(move |v| {
        any_element_of(v, |e| value::to_i64(e).is_some_and(|n| test(n as u64, mask)))
    }))
}

/// `{$mod: [divisor, remainder]}` with truncating division.
fn mod_condition(arg: &Value) -> Option<FieldPredicate> {
    let Value::Array(parts) = arg else {
        return None;
    };
    let [divisor, remainder] = parts.as_slice() else {
        return None;
    };
    let divisor = value::to_decimal(divisor)?.trunc();
    let remainder = value::to_decimal(remainder)?.trunc();
    if divisor.is_zero() {
        return None;
    }
    Some(field(move |v| {
        any_element_of(v, |e| {
            value::to_decimal(e).is_some_and(|n| n.trunc().checked_rem(divisor) == Some(remainder))
        })
    }))
}

/// `$elemMatch`: some element of an array field satisfies the embedded
/// condition. Operator-only objects apply to the element itself, anything else
/// is a query over object elements.
fn elem_match_condition(arg: &Value, features: Option<&Features>) -> Option<FieldPredicate> {
    let Value::Object(map) = arg else {
        return None;
    };
    let operator_mode = !map.is_empty()
        && map.keys().all(|k| k.starts_with('$'))
        && !map.keys().any(|k| matches!(k.as_str(), "$and" | "$or" | "$nor" | "$expr"));
    if operator_mode {
        let test = compile_operators(map, features)?;
        return Some(field(move |v| {
            v.iter().any(|candidate| match candidate {
                Value::Array(items) => items.iter().any(|item| test(std::slice::from_ref(&item))),
                _ => false,
            })
        }));
    }
    let query = compile_document(map, features)?;
    Some(field(move |v| {
        v.iter().any(|candidate| match candidate {
            Value::Array(items) => items.iter().any(|item| match item {
                Value::Object(doc) => query(doc),
                _ => false,
            }),
            _ => false,
        })
    }))
}

fn not_condition(arg: &Value, features: Option<&Features>) -> Option<FieldPredicate> {
    if pattern::is_regex_value(arg) {
        return regex_condition(pattern::from_regex_value(arg)?).map(negate);
    }
    match arg {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            compile_operators(map, features).map(negate)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_from_positions_and_integers() {
        assert_eq!(bit_mask(&json!([0, 2])), Some(0b101));
        assert_eq!(bit_mask(&json!(6)), Some(6));
        assert_eq!(bit_mask(&json!([70])), Some(1 << 63));
        assert_eq!(bit_mask(&json!(-1)), None);
        assert_eq!(bit_mask(&json!([-1])), None);
    }

    #[test]
    fn equality_matches_missing_only_for_null() {
        let missing: &[&Value] = &[];
        let is_null = equality(json!(null));
        assert!(is_null(missing));
        assert!(is_null(&[&json!([1, null])]));
        let is_one = equality(json!(1));
        assert!(!is_one(missing));
        assert!(is_one(&[&json!([0, 1.0])]));
        assert!(is_one(&[&json!([0]), &json!(1)]));
    }
}
