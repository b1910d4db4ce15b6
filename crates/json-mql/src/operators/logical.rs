//! Boolean operators, folded over truthiness.

use crate::features::Features;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::is_false;
use serde_json::Value;
use std::sync::Arc;

fn and_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let operands = util::compile_all(util::operands(arg), features);
    Some(implementation(move |doc, vars| {
        Value::Bool(operands.iter().all(|op| !is_false(&op(doc, vars))))
    }))
}

fn or_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let operands = util::compile_all(util::operands(arg), features);
    Some(implementation(move |doc, vars| {
        Value::Bool(operands.iter().any(|op| !is_false(&op(doc, vars))))
    }))
}

fn not_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| Value::Bool(is_false(v)))
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$and",
            aliases: &[],
            arity: Arity::Any,
            build: and_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$or",
            aliases: &[],
            arity: Arity::Any,
            build: or_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$not",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: not_build,
        }),
    ]
}
