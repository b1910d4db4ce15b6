//! Relational operators.
//!
//! [`Relation`] is the one comparison core: the expression operators below wrap
//! its answer in a boolean value, and the predicate compiler calls it directly.

use crate::features::Features;
use crate::types::{Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{comparable, compare, equals};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Relation {
    pub fn from_operator(name: &str) -> Option<Relation> {
        match name {
            "$eq" => Some(Relation::Eq),
            "$ne" => Some(Relation::Ne),
            "$gt" => Some(Relation::Gt),
            "$gte" => Some(Relation::Gte),
            "$lt" => Some(Relation::Lt),
            "$lte" => Some(Relation::Lte),
            _ => None,
        }
    }

    /// Equality is structural; ordered relations hold only for comparable pairs.
    pub fn test(self, left: &Value, right: &Value) -> bool {
        match self {
            Relation::Eq => equals(left, right),
            Relation::Ne => !equals(left, right),
            _ if !comparable(left, right) => false,
            Relation::Gt => compare(left, right) == Ordering::Greater,
            Relation::Gte => compare(left, right) != Ordering::Less,
            Relation::Lt => compare(left, right) == Ordering::Less,
            Relation::Lte => compare(left, right) != Ordering::Greater,
        }
    }
}

fn relation_build(
    relation: Relation,
    arg: &Value,
    features: Option<&Features>,
) -> Option<Implementation> {
    util::binary(arg, features, move |left, right| Value::Bool(relation.test(left, right)))
}

fn eq_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Eq, arg, features)
}

fn ne_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Ne, arg, features)
}

fn gt_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Gt, arg, features)
}

fn gte_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Gte, arg, features)
}

fn lt_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Lt, arg, features)
}

fn lte_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    relation_build(Relation::Lte, arg, features)
}

fn cmp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |left, right| {
        let n = match compare(left, right) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        Value::from(n)
    })
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$eq",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: eq_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$ne",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: ne_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$gt",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: gt_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$gte",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: gte_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$lt",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: lt_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$lte",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: lte_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$cmp",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: cmp_build,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ordered_relations_need_comparable_operands() {
        assert!(Relation::Gt.test(&json!(2), &json!(1)));
        assert!(Relation::Gte.test(&json!("b"), &json!("b")));
        assert!(Relation::Lt.test(&json!(false), &json!(true)));
        assert!(!Relation::Gt.test(&json!(2), &json!("1")));
        assert!(!Relation::Lt.test(&json!(null), &json!(1)));
        assert!(!Relation::Lte.test(&json!([1]), &json!([2])));
    }

    #[test]
    fn equality_relations() {
        assert!(Relation::Eq.test(&json!(null), &json!(null)));
        assert!(Relation::Eq.test(&json!(2), &json!(2.0)));
        assert!(Relation::Ne.test(&json!({"a": 1}), &json!({"a": 2})));
        assert_eq!(Relation::from_operator("$gte"), Some(Relation::Gte));
        assert_eq!(Relation::from_operator("$in"), None);
    }
}
