use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{constant, implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::vars::NOW;
use serde_json::Value;
use std::sync::Arc;

/// `{"$let": {"vars": {"name": expr, ..}, "in": expr}}`.
///
/// Bindings are evaluated in the enclosing scope, then visible to `in` as `$$name`.
fn let_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["vars", "in"]) {
        return None;
    }
    let Value::Object(bindings) = args.get("vars")? else {
        return None;
    };
    let mut compiled = Vec::with_capacity(bindings.len());
    for (name, expr) in bindings {
        if name.is_empty() || name == NOW {
            return None;
        }
        compiled.push((name.clone(), compile_expression(expr, features)));
    }
    let body = compile_expression(args.get("in")?, features);
    Some(implementation(move |doc, vars| {
        let mut scope = vars.clone();
        for (name, expr) in &compiled {
            scope.set(name, expr(doc, vars));
        }
        body(doc, &scope)
    }))
}

/// Returns its argument unevaluated.
fn literal_build(arg: &Value, _features: Option<&Features>) -> Option<Implementation> {
    Some(constant(arg.clone()))
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$let",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: let_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$literal",
            aliases: &[],
            arity: Arity::Any,
            build: literal_build,
        }),
    ]
}
