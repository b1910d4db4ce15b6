//! Set operators. Arrays are read as unordered sets under structural equality;
//! results keep first-seen order.

use crate::features::Features;
use crate::types::{Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{equals, is_false};
use serde_json::Value;
use std::sync::Arc;

/// Removes structural duplicates, keeping the first occurrence.
pub fn dedupe(items: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !contains(&result, item) {
            result.push(item.clone());
        }
    }
    result
}

fn contains(set: &[Value], item: &Value) -> bool {
    set.iter().any(|member| equals(member, item))
}

/// All operands as arrays, or `None` if any operand is not one.
fn arrays(values: &[Value]) -> Option<Vec<&[Value]>> {
    values
        .iter()
        .map(|v| match v {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        })
        .collect()
}

pub fn union(sets: &[&[Value]]) -> Vec<Value> {
    let all: Vec<Value> = sets.iter().flat_map(|set| set.iter().cloned()).collect();
    dedupe(&all)
}

pub fn intersection(sets: &[&[Value]]) -> Vec<Value> {
    let Some((first, rest)) = sets.split_first() else {
        return Vec::new();
    };
    dedupe(first)
        .into_iter()
        .filter(|item| rest.iter().all(|set| contains(set, item)))
        .collect()
}

pub fn difference(left: &[Value], right: &[Value]) -> Vec<Value> {
    dedupe(left)
        .into_iter()
        .filter(|item| !contains(right, item))
        .collect()
}

pub fn is_subset(left: &[Value], right: &[Value]) -> bool {
    left.iter().all(|item| contains(right, item))
}

fn set_union_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        arrays(&values).map_or(Value::Null, |sets| Value::Array(union(&sets)))
    })
}

fn set_intersection_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        arrays(&values).map_or(Value::Null, |sets| Value::Array(intersection(&sets)))
    })
}

fn set_difference_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |left, right| match (left, right) {
        (Value::Array(left), Value::Array(right)) => Value::Array(difference(left, right)),
        _ => Value::Null,
    })
}

fn set_equals_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let Some(sets) = arrays(&values) else {
            return Value::Null;
        };
        let equal = sets
            .windows(2)
            .all(|pair| is_subset(pair[0], pair[1]) && is_subset(pair[1], pair[0]));
        Value::Bool(equal)
    })
}

fn set_is_subset_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |left, right| match (left, right) {
        (Value::Array(left), Value::Array(right)) => Value::Bool(is_subset(left, right)),
        _ => Value::Null,
    })
}

fn all_elements_true_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| match v {
        Value::Array(items) => Value::Bool(items.iter().all(|item| !is_false(item))),
        _ => Value::Null,
    })
}

fn any_element_true_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| match v {
        Value::Array(items) => Value::Bool(items.iter().any(|item| !is_false(item))),
        _ => Value::Null,
    })
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$setUnion",
            aliases: &[],
            arity: Arity::Any,
            build: set_union_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$setIntersection",
            aliases: &[],
            arity: Arity::Any,
            build: set_intersection_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$setDifference",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: set_difference_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$setEquals",
            aliases: &[],
            arity: Arity::Variadic,
            build: set_equals_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$setIsSubset",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: set_is_subset_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$allElementsTrue",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: all_elements_true_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$anyElementTrue",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: any_element_true_build,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arr(v: &Value) -> &[Value] {
        v.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    #[test]
    fn dedupe_uses_numeric_equality() {
        let a = json!([1, 1.0, 2, {"x": 1}, {"x": 1}]);
        assert_eq!(dedupe(arr(&a)), vec![json!(1), json!(2), json!({"x": 1})]);
    }

    #[test]
    fn intersection_and_difference() {
        let a = json!([1, 2, 3, 3]);
        let b = json!([3, 2, 5]);
        assert_eq!(intersection(&[arr(&a), arr(&b)]), vec![json!(2), json!(3)]);
        assert_eq!(difference(arr(&a), arr(&b)), vec![json!(1)]);
        assert!(is_subset(arr(&json!([2, 2])), arr(&b)));
    }
}
