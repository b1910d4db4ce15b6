//! Array operators.

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{self, equals, is_false};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Element at `index`; a negative index counts from the end. Out of range is `null`.
pub fn element_at(items: &[Value], index: i64) -> Value {
    let len = items.len() as i64;
    let position = if index < 0 { len + index } else { index };
    usize::try_from(position)
        .ok()
        .and_then(|p| items.get(p))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Two-operand slice: the first `count` elements, or the last `-count` when negative.
pub fn slice_count(items: &[Value], count: i64) -> Vec<Value> {
    let len = items.len() as i64;
    let (start, end) = if count >= 0 {
        (0, count.min(len))
    } else {
        ((len + count).max(0), len)
    };
    items[start as usize..end as usize].to_vec()
}

/// Three-operand slice: elements from `position` (negative counts from the end)
/// up to, but not including, index `end`.
pub fn slice_window(items: &[Value], position: i64, end: i64) -> Option<Vec<Value>> {
    if end < 0 {
        return None;
    }
    let len = items.len() as i64;
    let start = if position < 0 { (len + position).max(0) } else { position.min(len) };
    let end = end.min(len);
    if start >= end {
        return Some(Vec::new());
    }
    Some(items[start as usize..end as usize].to_vec())
}

fn as_items(v: &Value) -> Option<&[Value]> {
    match v {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn array_elem_at_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |array, index| {
        match (as_items(array), value::to_i64(index)) {
            (Some(items), Some(index)) => element_at(items, index),
            _ => Value::Null,
        }
    })
}

fn first_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |array| {
        as_items(array).map_or(Value::Null, |items| element_at(items, 0))
    })
}

fn last_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |array| {
        as_items(array).map_or(Value::Null, |items| element_at(items, -1))
    })
}

fn slice_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| match values.as_slice() {
        [array, count] => match (as_items(array), value::to_i64(count)) {
            (Some(items), Some(count)) => Value::Array(slice_count(items, count)),
            _ => Value::Null,
        },
        [array, position, end] => {
            match (as_items(array), value::to_i64(position), value::to_i64(end)) {
                (Some(items), Some(position), Some(end)) => {
                    slice_window(items, position, end).map_or(Value::Null, Value::Array)
                }
                _ => Value::Null,
            }
        }
        _ => Value::Null,
    })
}

/// Longest array `$range` will produce; longer ranges evaluate to `null`.
pub const MAX_RANGE_LEN: u64 = 1_000_000;

/// Integers from `start` towards `end` (exclusive) in `step` increments.
/// `None` for a zero step or more than [`MAX_RANGE_LEN`] items.
pub fn range(start: i64, end: i64, step: i64) -> Option<Vec<Value>> {
    if step == 0 {
        return None;
    }
    let span = i128::from(end) - i128::from(start);
    let step = i128::from(step);
    let count = if span != 0 && (span > 0) == (step > 0) {
        (span.abs() + step.abs() - 1) / step.abs()
    } else {
        0
    };
    if count > i128::from(MAX_RANGE_LEN) {
        return None;
    }
    let items = (0..count)
        .map(|i| i64::try_from(i128::from(start) + i * step).map(value::from_i64))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(items)
}

fn range_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let ints: Option<Vec<i64>> = values.iter().map(value::to_i64).collect();
        let result = match ints.as_deref() {
            Some([start, end]) => range(*start, *end, 1),
            Some([start, end, step]) => range(*start, *end, *step),
            _ => None,
        };
        result.map_or(Value::Null, Value::Array)
    })
}

/// Transposes `inputs`. Shorter inputs truncate the result unless
/// `useLongestLength` is set; then missing cells take `defaults[row]`, or `null`.
pub fn zip(inputs: &[Vec<Value>], use_longest_length: bool, defaults: &[Value]) -> Vec<Value> {
    let lengths = inputs.iter().map(Vec::len);
    let rows = if use_longest_length {
        lengths.max().unwrap_or(0)
    } else {
        lengths.min().unwrap_or(0)
    };
    (0..rows)
        .map(|row| {
            let cells = inputs
                .iter()
                .map(|input| {
                    input
                        .get(row)
                        .or_else(|| defaults.get(row))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect();
            Value::Array(cells)
        })
        .collect()
}

fn zip_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["inputs", "useLongestLength", "defaults"]) {
        return None;
    }
    let Value::Array(inputs) = args.get("inputs")? else {
        return None;
    };
    let inputs = util::compile_all(inputs, features);
    let use_longest_length = match args.get("useLongestLength") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return None,
    };
    if args.contains_key("defaults") && !use_longest_length {
        return None;
    }
    let defaults = util::compile_named(args, "defaults", features);
    Some(implementation(move |doc, vars| {
        let mut arrays = Vec::with_capacity(inputs.len());
        for input in &inputs {
            match input(doc, vars) {
                Value::Array(items) => arrays.push(items),
                _ => return Value::Null,
            }
        }
        let defaults = match defaults.as_ref().map(|d| d(doc, vars)) {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => return Value::Null,
        };
        Value::Array(zip(&arrays, use_longest_length, &defaults))
    }))
}

fn concat_arrays_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let mut result = Vec::new();
        for v in values {
            match v {
                Value::Array(items) => result.extend(items),
                _ => return Value::Null,
            }
        }
        Value::Array(result)
    })
}

fn size_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |array| {
        as_items(array).map_or(Value::Null, |items| value::from_i64(items.len() as i64))
    })
}

fn is_array_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| Value::Bool(v.is_array()))
}

fn in_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |needle, array| {
        as_items(array).map_or(Value::Null, |items| {
            Value::Bool(items.iter().any(|item| equals(item, needle)))
        })
    })
}

fn index_of_array_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let Some((array, rest)) = values.split_first() else {
            return Value::Null;
        };
        let Some(items) = as_items(array) else {
            return Value::Null;
        };
        let Some((needle, bounds)) = rest.split_first() else {
            return Value::Null;
        };
        let mut bounds = bounds.iter().map(value::to_i64);
        let start = match bounds.next() {
            None => 0,
            Some(Some(start)) if start >= 0 => start as usize,
            Some(_) => return Value::Null,
        };
        let end = match bounds.next() {
            None => items.len(),
            Some(Some(end)) if end >= 0 => (end as usize).min(items.len()),
            Some(_) => return Value::Null,
        };
        let found = (start..end).find(|&i| equals(&items[i], needle));
        value::from_i64(found.map_or(-1, |i| i as i64))
    })
}

fn reverse_array_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |array| {
        as_items(array).map_or(Value::Null, |items| {
            Value::Array(items.iter().rev().cloned().collect())
        })
    })
}

/// Builds an object from `[key, value]` pairs or `{k, v}` documents. Later keys win.
pub fn array_to_object(items: &[Value]) -> Option<Map<String, Value>> {
    let mut result = Map::new();
    for item in items {
        let (key, v) = match item {
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(key), v] => (key, v),
                _ => return None,
            },
            Value::Object(entry) if entry.len() == 2 => match (entry.get("k"), entry.get("v")) {
                (Some(Value::String(key)), Some(v)) => (key, v),
                _ => return None,
            },
            _ => return None,
        };
        result.insert(key.clone(), v.clone());
    }
    Some(result)
}

fn array_to_object_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |array| {
        as_items(array)
            .and_then(array_to_object)
            .map_or(Value::Null, Value::Object)
    })
}

fn object_to_array_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| match v {
        Value::Object(map) => Value::Array(
            map.iter()
                .map(|(k, v)| {
                    let mut entry = Map::new();
                    entry.insert("k".to_string(), Value::String(k.clone()));
                    entry.insert("v".to_string(), v.clone());
                    Value::Object(entry)
                })
                .collect(),
        ),
        _ => Value::Null,
    })
}

fn variable_name(args: &Map<String, Value>) -> Option<String> {
    match args.get("as") {
        None => Some("this".to_string()),
        Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
        Some(_) => None,
    }
}

/// `{"$map": {"input": .., "as": "name", "in": ..}}`; `as` defaults to `this`.
fn map_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "as", "in"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let name = variable_name(args)?;
    let each = compile_expression(args.get("in")?, features);
    Some(implementation(move |doc, vars| match input(doc, vars) {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| each(doc, &vars.with(&name, item)))
                .collect(),
        ),
        _ => Value::Null,
    }))
}

/// `{"$filter": {"input": .., "as": "name", "cond": .., "limit": n}}`.
fn filter_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "as", "cond", "limit"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let name = variable_name(args)?;
    let cond = compile_expression(args.get("cond")?, features);
    let limit = util::compile_named(args, "limit", features);
    Some(implementation(move |doc, vars| {
        let Value::Array(items) = input(doc, vars) else {
            return Value::Null;
        };
        let limit = match limit.as_ref().map(|l| value::to_i64(&l(doc, vars))) {
            None => usize::MAX,
            Some(Some(n)) if n > 0 => n as usize,
            Some(_) => return Value::Null,
        };
        let kept = items
            .into_iter()
            .filter(|item| !is_false(&cond(doc, &vars.with(&name, item.clone()))))
            .take(limit)
            .collect();
        Value::Array(kept)
    }))
}

/// `{"$reduce": {"input": .., "initialValue": .., "in": ..}}` with `$$value` and `$$this`.
fn reduce_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "initialValue", "in"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let initial = compile_expression(args.get("initialValue")?, features);
    let each = compile_expression(args.get("in")?, features);
    Some(implementation(move |doc, vars| {
        let Value::Array(items) = input(doc, vars) else {
            return Value::Null;
        };
        items.into_iter().fold(initial(doc, vars), |acc, item| {
            let scope = vars.with("value", acc).with("this", item);
            each(doc, &scope)
        })
    }))
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$arrayElemAt",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: array_elem_at_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$first",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: first_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$last",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: last_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$slice",
            aliases: &[],
            arity: Arity::Range(2, Some(3)),
            build: slice_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$range",
            aliases: &[],
            arity: Arity::Range(2, Some(3)),
            build: range_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$zip",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: zip_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$concatArrays",
            aliases: &[],
            arity: Arity::Any,
            build: concat_arrays_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$size",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: size_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$isArray",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: is_array_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$in",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: in_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$indexOfArray",
            aliases: &[],
            arity: Arity::Range(2, Some(4)),
            build: index_of_array_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$reverseArray",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: reverse_array_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$arrayToObject",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: array_to_object_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$objectToArray",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: object_to_array_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$map",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: map_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$filter",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: filter_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$reduce",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: reduce_build,
        }),
    ]
}
