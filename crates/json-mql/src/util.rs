//! Helpers shared by the operator families and the predicate compiler.

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{implementation, Implementation};
use crate::value::Document;
use crate::vars::Vars;
use serde_json::{Map, Value};
use std::borrow::Cow;

// ----------------------------------------------------------------- Paths

/// Resolves a dotted path against a document.
///
/// Numeric segments index into arrays. A non-numeric segment applied to an
/// array collects that path from every object element; the result is then an
/// array of the collected values. `None` means the path is absent.
pub fn lookup_in<'a>(doc: &'a Document, path: &str) -> Option<Cow<'a, Value>> {
    let segments: Vec<&str> = path.split('.').collect();
    let (head, rest) = segments.split_first()?;
    walk(doc.get(*head)?, rest)
}

/// Resolves a dotted path below an arbitrary value. An empty path is the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<Cow<'a, Value>> {
    if path.is_empty() {
        return Some(Cow::Borrowed(value));
    }
    let segments: Vec<&str> = path.split('.').collect();
    walk(value, &segments)
}

fn walk<'a>(value: &'a Value, segments: &[&str]) -> Option<Cow<'a, Value>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Cow::Borrowed(value));
    };
    match value {
        Value::Object(map) => walk(map.get(*head)?, rest),
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                return walk(items.get(index)?, rest);
            }
            let collected: Vec<Value> = items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| walk(item, segments))
                .map(Cow::into_owned)
                .collect();
            if collected.is_empty() {
                None
            } else {
                Some(Cow::Owned(Value::Array(collected)))
            }
        }
        _ => None,
    }
}

/// Resolves a dotted path for matching. Unlike [`lookup_in`], every object
/// reached through an array contributes its own candidate, so array-valued
/// fields below an array stay separate. Empty means the path is absent.
pub fn candidates_in<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*head) {
            gather(value, rest, &mut found);
        }
    }
    found
}

fn gather<'a>(value: &'a Value, segments: &[&str], found: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*head) {
                gather(child, rest, found);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    gather(item, rest, found);
                }
                return;
            }
            for item in items.iter().filter(|item| item.is_object()) {
                gather(item, segments, found);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------- Operands

/// The operand list of an operator argument: array items, or the argument itself.
pub fn operands(arg: &Value) -> &[Value] {
    match arg {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

pub fn compile_all(exprs: &[Value], features: Option<&Features>) -> Vec<Implementation> {
    exprs
        .iter()
        .map(|expr| compile_expression(expr, features))
        .collect()
}

pub fn eval_all(implementations: &[Implementation], doc: &Document, vars: &Vars) -> Vec<Value> {
    implementations.iter().map(|imp| imp(doc, vars)).collect()
}

/// Compiles a single-operand operator whose result depends only on the operand value.
pub fn unary<F>(arg: &Value, features: Option<&Features>, f: F) -> Option<Implementation>
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let [operand] = operands(arg) else {
        return None;
    };
    let operand = compile_expression(operand, features);
    Some(implementation(move |doc, vars| f(&operand(doc, vars))))
}

/// Compiles a two-operand operator whose result depends only on the operand values.
pub fn binary<F>(arg: &Value, features: Option<&Features>, f: F) -> Option<Implementation>
where
    F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
{
    let [left, right] = operands(arg) else {
        return None;
    };
    let left = compile_expression(left, features);
    let right = compile_expression(right, features);
    Some(implementation(move |doc, vars| {
        let left = left(doc, vars);
        let right = right(doc, vars);
        f(&left, &right)
    }))
}

/// Compiles an operator over all of its operand values, evaluated left to right.
pub fn nary<F>(arg: &Value, features: Option<&Features>, f: F) -> Option<Implementation>
where
    F: Fn(Vec<Value>) -> Value + Send + Sync + 'static,
{
    let operands = compile_all(operands(arg), features);
    Some(implementation(move |doc, vars| {
        f(eval_all(&operands, doc, vars))
    }))
}

/// Named arguments of an object-form operator such as `{"$zip": {"inputs": ...}}`.
pub fn named(arg: &Value) -> Option<&Map<String, Value>> {
    match operands(arg) {
        [Value::Object(map)] => Some(map),
        _ => None,
    }
}

/// Compiles an optional named argument.
pub fn compile_named(
    args: &Map<String, Value>,
    key: &str,
    features: Option<&Features>,
) -> Option<Implementation> {
    args.get(key).map(|expr| compile_expression(expr, features))
}

/// True when every key of an object-form argument is one of `allowed`.
pub fn only_keys(args: &Map<String, Value>, allowed: &[&str]) -> bool {
    args.keys().all(|key| allowed.contains(&key.as_str()))
}

/// Evaluates a test against a value and, if it is an array, against each element.
pub fn any_element<F>(value: &Value, test: F) -> bool
where
    F: Fn(&Value) -> bool,
{
    if test(value) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(test),
        _ => false,
    }
}
