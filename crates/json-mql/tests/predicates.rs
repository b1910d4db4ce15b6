//! Integration tests for `compile_predicate`.

use json_mql::{compile_predicate, Document};
use serde_json::{json, Value};

fn doc(data: Value) -> Document {
    match data {
        Value::Object(map) => map,
        other => panic!("test document must be an object, got {}", other),
    }
}

fn check(query: Value, data: Value, expected: bool) {
    let predicate = compile_predicate(&query, None);
    let document = doc(data);
    assert_eq!(
        predicate(&document),
        expected,
        "query: {} against {}",
        query,
        Value::Object(document.clone())
    );
}

// ---------------------------------------------------------------- Top level

#[test]
fn test_logical_combinators() {
    let query = json!({"$and": [{"a": {"$gt": 0}}, {"b": {"$lt": 0}}]});
    check(query.clone(), json!({"a": 1, "b": -1}), true);
    check(query, json!({"a": 0, "b": -1}), false);

    let query = json!({"$or": [{"a": 1}, {"b": 1}]});
    check(query.clone(), json!({"b": 1}), true);
    check(query, json!({"a": 2, "b": 2}), false);

    let query = json!({"$nor": [{"a": 1}, {"b": 1}]});
    check(query.clone(), json!({"a": 2}), true);
    check(query, json!({"a": 1}), false);
}

#[test]
fn test_implicit_and_of_fields() {
    let query = json!({"a": 1, "b": "x"});
    check(query.clone(), json!({"a": 1, "b": "x"}), true);
    check(query, json!({"a": 1, "b": "y"}), false);
}

#[test]
fn test_expr() {
    let query = json!({"$expr": {"$gt": ["$a", "$b"]}});
    check(query.clone(), json!({"a": 2, "b": 1}), true);
    check(query, json!({"a": 1, "b": 2}), false);
    check(json!({"$expr": "$flag"}), json!({"flag": 0}), false);
    check(json!({"$expr": "$flag"}), json!({"flag": "yes"}), true);
}

#[test]
fn test_degenerate_queries() {
    check(json!({}), json!({"a": 1}), true);
    check(json!({"$comment": "anything", "a": 1}), json!({"a": 1}), true);
    check(json!([1, 2]), json!({"a": 1}), false);
    check(json!({"$where": "true"}), json!({"a": 1}), false);
    check(json!({"a": {"$near": [0, 0]}}), json!({"a": [0, 0]}), false);
    check(json!({"$and": []}), json!({}), false);
    check(json!({"$or": {"a": 1}}), json!({"a": 1}), false);
}

// ----------------------------------------------------------------- Equality

#[test]
fn test_implicit_equality() {
    check(json!({"a": 1}), json!({"a": 1.0}), true);
    check(json!({"a": 1}), json!({"a": [2, 1]}), true);
    check(json!({"a": [2, 1]}), json!({"a": [2, 1]}), true);
    check(json!({"a": {"b": 1}}), json!({"a": {"b": 1}}), true);
    check(json!({"a.b": 2}), json!({"a": [{"b": 1}, {"b": 2}]}), true);
    check(json!({"a.1": "y"}), json!({"a": ["x", "y"]}), true);
    check(json!({"a": 1}), json!({}), false);
}

#[test]
fn test_null_matches_missing() {
    check(json!({"a": null}), json!({}), true);
    check(json!({"a": null}), json!({"a": null}), true);
    check(json!({"a": null}), json!({"a": 0}), false);
    check(json!({"a": {"$eq": null}}), json!({}), true);
    check(json!({"a": {"$ne": null}}), json!({}), false);
    check(json!({"a": {"$ne": null}}), json!({"a": 1}), true);
}

#[test]
fn test_ne() {
    check(json!({"a": {"$ne": 1}}), json!({}), true);
    check(json!({"a": {"$ne": 1}}), json!({"a": 2}), true);
    check(json!({"a": {"$ne": 1}}), json!({"a": [1, 2]}), false);
}

// --------------------------------------------------------------- Comparison

#[test]
fn test_ordered_comparisons() {
    check(json!({"a": {"$gt": 5}}), json!({"a": 6}), true);
    check(json!({"a": {"$gt": 5}}), json!({"a": [1, 7]}), true);
    check(json!({"a": {"$gt": 1}}), json!({"a": "2"}), false);
    check(json!({"a": {"$gte": 5, "$lt": 10}}), json!({"a": 5}), true);
    check(json!({"a": {"$gte": 5, "$lt": 10}}), json!({"a": 10}), false);
    check(json!({"a": {"$lte": "m"}}), json!({"a": "apple"}), true);
    check(json!({"a": {"$lt": 0}}), json!({}), false);
}

// --------------------------------------------------------------- Membership

#[test]
fn test_in_and_nin() {
    check(json!({"a": {"$in": ["/t.*T/i", "/es/"]}}), json!({"a": "test"}), true);
    check(json!({"a": {"$in": [1, 2]}}), json!({"a": 2}), true);
    check(json!({"a": {"$in": [1, 2]}}), json!({"a": [5, 1]}), true);
    check(json!({"a": {"$in": [1, 2]}}), json!({"a": 3}), false);
    check(json!({"a": {"$in": [null, 1]}}), json!({}), true);
    check(json!({"a": {"$in": [1]}}), json!({}), false);
    check(json!({"a": {"$in": 1}}), json!({"a": 1}), false);
    check(json!({"a": {"$nin": [1, 2]}}), json!({"a": 3}), true);
    check(json!({"a": {"$nin": [1, 2]}}), json!({}), true);
    check(json!({"a": {"$nin": ["/^x/"]}}), json!({"a": "xy"}), false);
}

#[test]
fn test_exists() {
    check(json!({"a": {"$exists": true}}), json!({"a": null}), true);
    check(json!({"a": {"$exists": true}}), json!({}), false);
    check(json!({"a": {"$exists": false}}), json!({}), true);
    check(json!({"a.b": {"$exists": 1}}), json!({"a": {"b": 0}}), true);
}

#[test]
fn test_type() {
    check(json!({"a": {"$type": "string"}}), json!({"a": "x"}), true);
    check(json!({"a": {"$type": 2}}), json!({"a": "x"}), true);
    check(json!({"a": {"$type": [16, "string"]}}), json!({"a": 1}), true);
    check(json!({"a": {"$type": "array"}}), json!({"a": [1]}), true);
    check(json!({"a": {"$type": "int"}}), json!({"a": [1.5, 2]}), true);
    check(json!({"a": {"$type": "number"}}), json!({"a": 1.5}), true);
    check(json!({"a": {"$type": "null"}}), json!({"a": null}), true);
    check(json!({"a": {"$type": "null"}}), json!({}), false);
    check(json!({"a": {"$type": "date"}}), json!({"a": "2020-01-01T00:00:00Z"}), true);
    check(json!({"a": {"$type": "bool"}}), json!({"a": 1}), false);
}

// -------------------------------------------------------------------- Array

#[test]
fn test_size() {
    check(json!({"a": {"$size": 2}}), json!({"a": [1, 2]}), true);
    check(json!({"a": {"$size": 2}}), json!({"a": [1]}), false);
    check(json!({"a": {"$size": 1}}), json!({"a": "x"}), false);
    check(json!({"a": {"$size": -1}}), json!({"a": []}), false);
}

#[test]
fn test_all() {
    check(json!({"tags": {"$all": ["a", "b"]}}), json!({"tags": ["b", "c", "a"]}), true);
    check(json!({"tags": {"$all": ["a", "d"]}}), json!({"tags": ["b", "c", "a"]}), false);
    check(json!({"a": {"$all": [[1, 2]]}}), json!({"a": [[1, 2], 3]}), true);
    check(json!({"a": {"$all": [[1, 2]]}}), json!({"a": [1, 2]}), true);
    check(json!({"a": {"$all": []}}), json!({"a": [1]}), false);
    check(
        json!({"a": {"$all": [{"$elemMatch": {"x": 1}}, {"$elemMatch": {"y": 2}}]}}),
        json!({"a": [{"x": 1}, {"y": 2}]}),
        true,
    );
}

#[test]
fn test_elem_match() {
    let query = json!({"scores": {"$elemMatch": {"$gte": 80, "$lt": 85}}});
    check(query.clone(), json!({"scores": [70, 82]}), true);
    check(query.clone(), json!({"scores": [70, 90]}), false);
    check(query, json!({"scores": 82}), false);

    let query = json!({"items": {"$elemMatch": {"k": 2, "v": "b"}}});
    check(query.clone(), json!({"items": [{"k": 1, "v": "b"}, {"k": 2, "v": "b"}]}), true);
    check(query, json!({"items": [{"k": 1, "v": "b"}, {"k": 2, "v": "a"}]}), false);

    let query = json!({"items": {"$elemMatch": {"$or": [{"k": 1}, {"k": 3}]}}});
    check(query, json!({"items": [{"k": 3}]}), true);
}

// --------------------------------------------------------------------- Bits

#[test]
fn test_bits() {
    check(json!({"n": {"$bitsAllSet": [0, 2]}}), json!({"n": 5}), true);
    check(json!({"n": {"$bitsAllSet": [0, 1]}}), json!({"n": 5}), false);
    check(json!({"n": {"$bitsAllClear": [1]}}), json!({"n": 5}), true);
    check(json!({"n": {"$bitsAnySet": 6}}), json!({"n": 5}), true);
    check(json!({"n": {"$bitsAnyClear": 5}}), json!({"n": 5}), false);
    check(json!({"n": {"$bitsAllSet": [63]}}), json!({"n": -1}), true);
    check(json!({"n": {"$bitsAllSet": [100]}}), json!({"n": -8}), true);
    check(json!({"n": {"$bitsAllSet": 1}}), json!({"n": 1.5}), false);
    check(json!({"n": {"$bitsAllSet": 1}}), json!({"n": "1"}), false);
    check(json!({"n": {"$bitsAllSet": -1}}), json!({"n": 1}), false);
}

#[test]
fn test_mod() {
    check(json!({"n": {"$mod": [4, 1]}}), json!({"n": 9}), true);
    check(json!({"n": {"$mod": [4, 1]}}), json!({"n": 10}), false);
    check(json!({"n": {"$mod": [4, -3]}}), json!({"n": -7}), true);
    check(json!({"n": {"$mod": [4, 1]}}), json!({"n": 9.7}), true);
    check(json!({"n": {"$mod": [0, 1]}}), json!({"n": 1}), false);
    check(json!({"n": {"$mod": [4]}}), json!({"n": 1}), false);
}

// -------------------------------------------------------------------- Regex

#[test]
fn test_regex() {
    check(json!({"a": "/^ab/"}), json!({"a": "abc"}), true);
    check(json!({"a": "/^AB/i"}), json!({"a": "abc"}), true);
    check(json!({"a": "^ab"}), json!({"a": "abc"}), false);
    check(json!({"a": {"regex": "^a"}}), json!({"a": "abc"}), true);
    check(json!({"a": {"regex": "^A", "options": "i"}}), json!({"a": "abc"}), true);
    check(json!({"a": {"$regex": "^AB", "$options": "i"}}), json!({"a": "abc"}), true);
    check(json!({"a": {"$regex": "/c$/"}}), json!({"a": ["x", "abc"]}), true);
    check(json!({"a": {"$regex": "^a"}}), json!({"a": 1}), false);
    check(json!({"a": {"$regex": "("}}), json!({"a": "("}), false);
    check(json!({"a": {"$options": "i"}}), json!({"a": "x"}), false);
}

#[test]
fn test_not() {
    check(json!({"a": {"$not": {"$gt": 5}}}), json!({"a": 3}), true);
    check(json!({"a": {"$not": {"$gt": 5}}}), json!({"a": 7}), false);
    check(json!({"a": {"$not": {"$gt": 5}}}), json!({}), true);
    check(json!({"a": {"$not": "/^x/"}}), json!({"a": "abc"}), true);
    check(json!({"a": {"$not": "/^x/"}}), json!({"a": "xyz"}), false);
    check(json!({"a": {"$not": 5}}), json!({"a": 3}), false);
}

#[test]
fn test_paths_through_arrays_search_nested_arrays() {
    let data = json!({"items": [{"tags": [1, 2]}, {"tags": [3]}]});
    check(json!({"items.tags": 3}), data.clone(), true);
    check(json!({"items.tags": [3]}), data.clone(), true);
    check(json!({"items.tags": 4}), data.clone(), false);
    check(json!({"items.tags": {"$gt": 2}}), data.clone(), true);
    check(json!({"items.tags": {"$gt": 3}}), data.clone(), false);
    check(json!({"items.tags": {"$in": [5, 2]}}), data.clone(), true);
    check(json!({"items.tags": {"$ne": 3}}), data.clone(), false);
    check(json!({"items.tags": {"$nin": [7]}}), data.clone(), true);
    check(json!({"items.tags": {"$size": 1}}), data.clone(), true);
    check(json!({"items.tags": {"$elemMatch": {"$gte": 2, "$lt": 3}}}), data.clone(), true);
    check(json!({"items.tags": {"$all": [1, 3]}}), data, true);
}

#[test]
fn test_compiled_predicate_is_shareable() {
    let predicate = compile_predicate(&json!({"a": {"$gt": 1}}), None);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let predicate = predicate.clone();
            std::thread::spawn(move || predicate(&doc(json!({"a": i}))))
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![false, false, true, true]);
}
