//! Caller-registered operators threaded through both compilers.

use json_mql::types::{constant, implementation, ValuePredicate};
use json_mql::{compile_expression, compile_predicate, equals, is_false, Document, Features, Vars};
use serde_json::{json, Value};
use std::sync::Arc;

fn doc(data: Value) -> Document {
    match data {
        Value::Object(map) => map,
        other => panic!("test document must be an object, got {}", other),
    }
}

/// `{"$double": expr}` evaluates `expr` and doubles a numeric result.
fn with_double(features: &Features) -> Features {
    features.with_operator("$double", |arg, features| {
        let inner = compile_expression(arg, features);
        implementation(move |doc, vars| match inner(doc, vars).as_i64() {
            Some(n) => json!(n * 2),
            None => Value::Null,
        })
    })
}

/// `{field: {"$even": bool}}` tests integer parity.
fn with_even(features: &Features) -> Features {
    features.with_query_operator("even", |arg, _| {
        let wanted = !is_false(arg);
        let test: ValuePredicate = Arc::new(move |v: &Value| {
            v.as_i64().is_some_and(|n| (n % 2 == 0) == wanted)
        });
        test
    })
}

fn eval(expression: Value, features: &Features, data: Value) -> Value {
    compile_expression(&expression, Some(features))(&doc(data), &Vars::new())
}

#[test]
fn test_custom_expression_operator() {
    let features = with_double(&Features::new());
    let result = eval(json!({"$double": "$n"}), &features, json!({"n": 21}));
    assert!(equals(&result, &json!(42)), "got {}", result);
}

#[test]
fn test_custom_operator_visible_in_nested_expressions() {
    let features = with_double(&Features::new());
    let result = eval(json!({"$add": [{"$double": 2}, 1]}), &features, json!({}));
    assert!(equals(&result, &json!(5)), "got {}", result);

    let result = eval(
        json!({"$map": {"input": [1, 2], "in": {"$double": "$$this"}}}),
        &features,
        json!({}),
    );
    assert!(equals(&result, &json!([2, 4])), "got {}", result);
}

#[test]
fn test_custom_operator_without_features_is_unknown() {
    let result = compile_expression(&json!({"$double": 2}), None)(&doc(json!({})), &Vars::new());
    assert_eq!(result, Value::Null);
}

#[test]
fn test_registered_name_shadows_builtin() {
    let features = Features::new().with_operator("$add", |_, _| constant(json!("shadowed")));
    let result = eval(json!({"$add": [1, 2]}), &features, json!({}));
    assert_eq!(result, json!("shadowed"));
}

#[test]
fn test_sigil_is_added_to_registered_names() {
    let features = Features::new().with_operator("answer", |_, _| constant(json!(42)));
    assert!(features.operator("$answer").is_some());
    let result = eval(json!({"$answer": []}), &features, json!({}));
    assert!(equals(&result, &json!(42)));
}

#[test]
fn test_with_operator_leaves_original_untouched() {
    let base = Features::new();
    let extended = with_even(&with_double(&base));
    assert!(base.operator("$double").is_none());
    assert!(base.query_operator("$even").is_none());
    assert!(extended.operator("$double").is_some());
    assert!(extended.query_operator("$even").is_some());
}

#[test]
fn test_custom_query_operator() {
    let features = with_even(&Features::new());
    let predicate = compile_predicate(&json!({"n": {"$even": true}}), Some(&features));
    assert!(predicate(&doc(json!({"n": 4}))));
    assert!(!predicate(&doc(json!({"n": 3}))));
    assert!(!predicate(&doc(json!({}))));

    let predicate = compile_predicate(&json!({"n": {"$even": false, "$gt": 2}}), Some(&features));
    assert!(predicate(&doc(json!({"n": 5}))));
    assert!(!predicate(&doc(json!({"n": 1}))));
}

#[test]
fn test_custom_query_operator_in_nested_queries() {
    let features = with_even(&Features::new());
    let predicate = compile_predicate(
        &json!({"$or": [{"items": {"$elemMatch": {"$even": true}}}, {"flag": true}]}),
        Some(&features),
    );
    assert!(predicate(&doc(json!({"items": [1, 3, 6]}))));
    assert!(!predicate(&doc(json!({"items": [1, 3]}))));

    let predicate = compile_predicate(&json!({"n": {"$not": {"$even": true}}}), Some(&features));
    assert!(predicate(&doc(json!({"n": 3}))));
}

#[test]
fn test_expression_operator_inside_expr_query() {
    let features = with_double(&Features::new());
    let predicate = compile_predicate(
        &json!({"$expr": {"$gt": [{"$double": "$n"}, 10]}}),
        Some(&features),
    );
    assert!(predicate(&doc(json!({"n": 6}))));
    assert!(!predicate(&doc(json!({"n": 5}))));
}

#[test]
fn test_resolver_handle() {
    let features = Features::new().with_resolver(String::from("loader"));
    assert_eq!(features.resolver_as::<String>().map(String::as_str), Some("loader"));
    let extended = with_double(&features);
    assert!(extended.resolver().is_some());
}
