//! Expression compiler: turns a JSON expression tree into an [`Implementation`].

use crate::features::Features;
use crate::operators;
use crate::types::{assert_arity, constant, implementation, null, Implementation};
use crate::util;
use crate::vars::NOW;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

/// Compiles an expression.
///
/// - An object with a single `$`-prefixed key applies that operator to its value.
///   Operators registered in `features` shadow built-ins of the same name.
/// - A `$`-prefixed string references the document: `$a.b` is a field path,
///   `$$name.path` a variable, `$$NOW` the current instant, `$$ROOT` and
///   `$$CURRENT` the document itself.
/// - Anything else is a literal.
///
/// Unknown operators and malformed arguments compile to `null`; the returned
/// implementation never fails.
pub fn compile_expression(expr: &Value, features: Option<&Features>) -> Implementation {
    match expr {
        Value::Object(map) if map.len() == 1 => match map.iter().next() {
            Some((name, arg)) if name.starts_with('$') => compile_operator(name, arg, features),
            _ => constant(expr.clone()),
        },
        Value::String(reference) if reference.starts_with('$') => compile_reference(reference),
        other => constant(other.clone()),
    }
}

fn compile_operator(name: &str, arg: &Value, features: Option<&Features>) -> Implementation {
    if let Some(custom) = features.and_then(|f| f.operator(name)) {
        return custom(arg, features);
    }
    let Some(def) = operators::builtin().get(name) else {
        debug!(operator = name, "unknown expression operator, evaluating to null");
        return null();
    };
    if let Err(err) = assert_arity(name, &def.arity, util::operands(arg).len()) {
        debug!(operator = name, %err, "arity mismatch, evaluating to null");
        return null();
    }
    (def.build)(arg, features).unwrap_or_else(|| {
        debug!(operator = name, "malformed operator argument, evaluating to null");
        null()
    })
}

fn compile_reference(reference: &str) -> Implementation {
    let Some(variable) = reference.strip_prefix("$$") else {
        let path = reference[1..].to_string();
        return implementation(move |doc, _| {
            util::lookup_in(doc, &path).map_or(Value::Null, Cow::into_owned)
        });
    };
    let (name, path) = match variable.split_once('.') {
        Some((name, path)) => (name.to_string(), path.to_string()),
        None => (variable.to_string(), String::new()),
    };
    match name.as_str() {
        NOW => implementation(move |_, vars| vars.resolve(NOW)),
        "ROOT" | "CURRENT" => implementation(move |doc, _| {
            if path.is_empty() {
                return Value::Object(doc.clone());
            }
            util::lookup_in(doc, &path).map_or(Value::Null, Cow::into_owned)
        }),
        _ => implementation(move |_, vars| match vars.get(&name) {
            Some(value) => util::lookup(value, &path).map_or(Value::Null, Cow::into_owned),
            None => Value::Null,
        }),
    }
}
