//! Query predicate compiler.
//!
//! A query is an object whose keys are either dotted field paths, each holding
//! a field condition, or one of the top-level operators `$and`, `$or`, `$nor`,
//! `$expr` and `$comment`. All keys must hold for a document to match.
//!
//! Malformed queries compile to a predicate that matches nothing.

mod field;

pub use field::{compile_condition, FieldPredicate};

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{always, predicate, Predicate};
use crate::util;
use crate::value::is_false;
use crate::vars::Vars;
use serde_json::{Map, Value};
use tracing::debug;

/// Compiles a query document into a [`Predicate`].
///
/// ```
/// use json_mql::compile_predicate;
/// use serde_json::json;
///
/// let adult = compile_predicate(&json!({"age": {"$gte": 18}}), None);
/// let doc = json!({"age": 21});
/// assert!(adult(doc.as_object().unwrap()));
/// ```
pub fn compile_predicate(query: &Value, features: Option<&Features>) -> Predicate {
    let Value::Object(map) = query else {
        debug!(%query, "query is not an object, matching nothing");
        return always(false);
    };
    compile_document(map, features).unwrap_or_else(|| always(false))
}

pub(crate) fn compile_document(
    map: &Map<String, Value>,
    features: Option<&Features>,
) -> Option<Predicate> {
    let mut clauses = Vec::with_capacity(map.len());
    for (key, condition) in map {
        clauses.push(compile_clause(key, condition, features)?);
    }
    match clauses.len() {
        0 => Some(always(true)),
        1 => clauses.pop(),
        _ => Some(predicate(move |doc| clauses.iter().all(|clause| clause(doc)))),
    }
}

fn compile_clause(key: &str, condition: &Value, features: Option<&Features>) -> Option<Predicate> {
    match key {
        "$and" => {
            let subs = sub_queries(condition, features)?;
            Some(predicate(move |doc| subs.iter().all(|sub| sub(doc))))
        }
        "$or" => {
            let subs = sub_queries(condition, features)?;
            Some(predicate(move |doc| subs.iter().any(|sub| sub(doc))))
        }
        "$nor" => {
            let subs = sub_queries(condition, features)?;
            Some(predicate(move |doc| !subs.iter().any(|sub| sub(doc))))
        }
        "$expr" => {
            let expr = compile_expression(condition, features);
            Some(predicate(move |doc| !is_false(&expr(doc, &Vars::new()))))
        }
        "$comment" => Some(always(true)),
        _ if key.starts_with('$') => {
            debug!(operator = key, "unknown top-level query operator");
            None
        }
        path => {
            let test = compile_condition(condition, features)?;
            let path = path.to_string();
            Some(predicate(move |doc| {
                test(&util::candidates_in(doc, &path))
            }))
        }
    }
}

/// The non-empty array of sub-queries under `$and`, `$or` and `$nor`.
fn sub_queries(condition: &Value, features: Option<&Features>) -> Option<Vec<Predicate>> {
    let Value::Array(queries) = condition else {
        debug!("logical query operator needs an array");
        return None;
    };
    if queries.is_empty() {
        return None;
    }
    queries
        .iter()
        .map(|query| match query {
            Value::Object(map) => compile_document(map, features),
            _ => None,
        })
        .collect()
}
