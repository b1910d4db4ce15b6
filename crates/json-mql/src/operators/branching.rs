//! Conditional operators.

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::is_false;
use serde_json::Value;
use std::sync::Arc;

/// `{"$cond": {"if": .., "then": .., "else": ..}}` or `{"$cond": [if, then, else]}`.
fn cond_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let (condition, then, otherwise) = match arg {
        Value::Array(items) => match items.as_slice() {
            [condition, then, otherwise] => (condition, then, otherwise),
            _ => return None,
        },
        Value::Object(args) => {
            if !util::only_keys(args, &["if", "then", "else"]) {
                return None;
            }
            (args.get("if")?, args.get("then")?, args.get("else")?)
        }
        _ => return None,
    };
    let condition = compile_expression(condition, features);
    let then = compile_expression(then, features);
    let otherwise = compile_expression(otherwise, features);
    Some(implementation(move |doc, vars| {
        if is_false(&condition(doc, vars)) {
            otherwise(doc, vars)
        } else {
            then(doc, vars)
        }
    }))
}

/// Second operand substitutes the first when the first evaluates to `null`.
fn if_null_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let [value, fallback] = util::operands(arg) else {
        return None;
    };
    let value = compile_expression(value, features);
    let fallback = compile_expression(fallback, features);
    Some(implementation(move |doc, vars| match value(doc, vars) {
        Value::Null => fallback(doc, vars),
        other => other,
    }))
}

/// `{"$switch": {"branches": [{"case": .., "then": ..}, ..], "default": ..}}`.
///
/// Branches are tried in order; the first truthy `case` wins. `default` is required.
fn switch_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["branches", "default"]) {
        return None;
    }
    let Value::Array(raw_branches) = args.get("branches")? else {
        return None;
    };
    let mut branches = Vec::with_capacity(raw_branches.len());
    for branch in raw_branches {
        let Value::Object(branch) = branch else {
            return None;
        };
        if branch.len() != 2 {
            return None;
        }
        let case = compile_expression(branch.get("case")?, features);
        let then = compile_expression(branch.get("then")?, features);
        branches.push((case, then));
    }
    let default = compile_expression(args.get("default")?, features);
    Some(implementation(move |doc, vars| {
        for (case, then) in &branches {
            if !is_false(&case(doc, vars)) {
                return then(doc, vars);
            }
        }
        default(doc, vars)
    }))
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$cond",
            aliases: &[],
            arity: Arity::Any,
            build: cond_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$ifNull",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: if_null_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$switch",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: switch_build,
        }),
    ]
}
