//! String operators.
//!
//! Positions and lengths count Unicode code points. Regex operators share the
//! pattern conventions of [`crate::pattern`], so a `/pattern/flags` literal works
//! wherever a pattern is accepted.

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::pattern;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{self, Document};
use crate::vars::Vars;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

fn concat_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let mut result = String::new();
        for v in &values {
            match v {
                Value::String(s) => result.push_str(s),
                _ => return Value::Null,
            }
        }
        Value::String(result)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Both,
    Start,
    End,
}

fn is_default_trim(c: char) -> bool {
    c.is_whitespace() || c == '\0'
}

/// Trims either whitespace (and NUL) or the characters of `chars`.
pub fn trim<'a>(s: &'a str, chars: Option<&str>, side: Side) -> &'a str {
    let strip = |c: char| match chars {
        Some(set) => set.contains(c),
        None => is_default_trim(c),
    };
    match side {
        Side::Both => s.trim_matches(strip),
        Side::Start => s.trim_start_matches(strip),
        Side::End => s.trim_end_matches(strip),
    }
}

fn trim_build_with(arg: &Value, features: Option<&Features>, side: Side) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "chars"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let chars = util::compile_named(args, "chars", features);
    Some(implementation(move |doc, vars| {
        let Value::String(s) = input(doc, vars) else {
            return Value::Null;
        };
        let chars = match chars.as_ref().map(|c| c(doc, vars)) {
            None => None,
            Some(Value::String(chars)) => Some(chars),
            Some(_) => return Value::Null,
        };
        Value::String(trim(&s, chars.as_deref(), side).to_string())
    }))
}

fn trim_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    trim_build_with(arg, features, Side::Both)
}

fn ltrim_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    trim_build_with(arg, features, Side::Start)
}

fn rtrim_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    trim_build_with(arg, features, Side::End)
}

/// Code-point substring of `count` characters starting at `start`.
pub fn substr_cp(s: &str, start: usize, count: usize) -> String {
    s.chars().skip(start).take(count).collect()
}

fn substr_cp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let [input, start, count] = values.as_slice() else {
            return Value::Null;
        };
        let s = match input {
            Value::Null => return Value::String(String::new()),
            Value::String(s) => s,
            _ => return Value::Null,
        };
        match (value::to_i64(start), value::to_i64(count)) {
            (Some(start), Some(count)) if start >= 0 && count >= 0 => {
                Value::String(substr_cp(s, start as usize, count as usize))
            }
            _ => Value::Null,
        }
    })
}

/// Code-point index of the first occurrence of `needle` within `[start, end)`, or -1.
pub fn index_of_cp(haystack: &str, needle: &str, start: usize, end: Option<usize>) -> i64 {
    let chars: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let end = end.unwrap_or(chars.len()).min(chars.len());
    if start > end {
        return -1;
    }
    if needle.is_empty() {
        return start as i64;
    }
    (start..end)
        .find(|&i| i + needle.len() <= chars.len() && chars[i..i + needle.len()] == needle[..])
        .map_or(-1, |i| i as i64)
}

fn index_of_cp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| {
        let (haystack, needle) = match (values.first(), values.get(1)) {
            (Some(Value::String(h)), Some(Value::String(n))) => (h, n),
            _ => return Value::Null,
        };
        let mut bounds = values[2..].iter().map(value::to_i64);
        let start = match bounds.next() {
            None => 0,
            Some(Some(start)) if start >= 0 => start as usize,
            Some(_) => return Value::Null,
        };
        let end = match bounds.next() {
            None => None,
            Some(Some(end)) if end >= 0 => Some(end as usize),
            Some(_) => return Value::Null,
        };
        value::from_i64(index_of_cp(haystack, needle, start, end))
    })
}

fn str_len_cp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| match v {
        Value::String(s) => value::from_i64(s.chars().count() as i64),
        _ => Value::Null,
    })
}

fn split_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |input, delimiter| match (input, delimiter) {
        (Value::String(s), Value::String(d)) if !d.is_empty() => {
            Value::Array(s.split(d.as_str()).map(|part| Value::String(part.to_string())).collect())
        }
        _ => Value::Null,
    })
}

/// String form used by case conversion: `null` is the empty string, numbers print as-is.
fn case_input(v: &Value) -> Option<String> {
    match v {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_lower_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| {
        case_input(v).map_or(Value::Null, |s| Value::String(s.to_lowercase()))
    })
}

fn to_upper_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| {
        case_input(v).map_or(Value::Null, |s| Value::String(s.to_uppercase()))
    })
}

fn strcasecmp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, |a, b| match (case_input(a), case_input(b)) {
        (Some(a), Some(b)) => {
            let n = match a.to_lowercase().cmp(&b.to_lowercase()) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            };
            Value::from(n)
        }
        _ => Value::Null,
    })
}

fn replace_build_with(
    arg: &Value,
    features: Option<&Features>,
    all: bool,
) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "find", "replacement"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let find = compile_expression(args.get("find")?, features);
    let replacement = compile_expression(args.get("replacement")?, features);
    Some(implementation(move |doc, vars| {
        match (input(doc, vars), find(doc, vars), replacement(doc, vars)) {
            (Value::String(s), Value::String(find), Value::String(replacement)) => {
                if all {
                    Value::String(s.replace(&find, &replacement))
                } else {
                    Value::String(s.replacen(&find, &replacement, 1))
                }
            }
            _ => Value::Null,
        }
    }))
}

fn replace_one_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    replace_build_with(arg, features, false)
}

fn replace_all_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    replace_build_with(arg, features, true)
}

// ------------------------------------------------------------------- Regex

/// A literal expression node: neither a reference nor an operator application.
fn is_literal(expr: &Value) -> bool {
    match expr {
        Value::String(s) => !s.starts_with('$'),
        Value::Object(map) => !(map.len() == 1 && map.keys().all(|k| k.starts_with('$'))),
        _ => true,
    }
}

/// Pattern source of a regex operator, compiled once when every part is literal.
enum Source {
    Fixed(Option<Regex>),
    Dynamic {
        regex: Implementation,
        options: Option<Implementation>,
    },
}

impl Source {
    fn compile(args: &Map<String, Value>, features: Option<&Features>) -> Option<Source> {
        let regex = args.get("regex")?;
        let options = args.get("options");
        if is_literal(regex) && options.map_or(true, is_literal) {
            let options = match options {
                None => "",
                Some(Value::String(options)) => options.as_str(),
                Some(_) => return Some(Source::Fixed(None)),
            };
            return Some(Source::Fixed(pattern::from_value(regex, options)));
        }
        Some(Source::Dynamic {
            regex: compile_expression(regex, features),
            options: util::compile_named(args, "options", features),
        })
    }

    fn resolve(&self, doc: &Document, vars: &Vars) -> Option<Regex> {
        match self {
            Source::Fixed(regex) => regex.clone(),
            Source::Dynamic { regex, options } => {
                let options = match options.as_ref().map(|o| o(doc, vars)) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(options)) => options,
                    Some(_) => return None,
                };
                pattern::from_value(&regex(doc, vars), &options)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegexMode {
    Match,
    Find,
    FindAll,
}

/// `{match, idx, captures}` for one match; `idx` is a code-point offset.
pub fn match_document(subject: &str, captures: &regex::Captures<'_>) -> Value {
    let Some(whole) = captures.get(0) else {
        return Value::Null;
    };
    let idx = subject[..whole.start()].chars().count();
    let groups = captures
        .iter()
        .skip(1)
        .map(|group| group.map_or(Value::Null, |g| Value::String(g.as_str().to_string())))
        .collect();
    let mut result = Map::new();
    result.insert("match".to_string(), Value::String(whole.as_str().to_string()));
    result.insert("idx".to_string(), value::from_i64(idx as i64));
    result.insert("captures".to_string(), Value::Array(groups));
    Value::Object(result)
}

fn regex_build_with(
    arg: &Value,
    features: Option<&Features>,
    mode: RegexMode,
) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "regex", "options"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let source = Source::compile(args, features)?;
    let missing = match mode {
        RegexMode::Match => Value::Bool(false),
        RegexMode::Find => Value::Null,
        RegexMode::FindAll => Value::Array(Vec::new()),
    };
    Some(implementation(move |doc, vars| {
        let subject = match input(doc, vars) {
            Value::String(s) => s,
            Value::Null => return missing.clone(),
            _ => return Value::Null,
        };
        let Some(regex) = source.resolve(doc, vars) else {
            return Value::Null;
        };
        match mode {
            RegexMode::Match => Value::Bool(regex.is_match(&subject)),
            RegexMode::Find => regex
                .captures(&subject)
                .map_or(Value::Null, |c| match_document(&subject, &c)),
            RegexMode::FindAll => Value::Array(
                regex
                    .captures_iter(&subject)
                    .map(|c| match_document(&subject, &c))
                    .collect(),
            ),
        }
    }))
}

fn regex_match_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    regex_build_with(arg, features, RegexMode::Match)
}

fn regex_find_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    regex_build_with(arg, features, RegexMode::Find)
}

fn regex_find_all_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    regex_build_with(arg, features, RegexMode::FindAll)
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$concat",
            aliases: &[],
            arity: Arity::Any,
            build: concat_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$trim",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: trim_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$ltrim",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: ltrim_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$rtrim",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: rtrim_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$substrCP",
            aliases: &[],
            arity: Arity::Fixed(3),
            build: substr_cp_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$indexOfCP",
            aliases: &[],
            arity: Arity::Range(2, Some(4)),
            build: index_of_cp_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$strLenCP",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: str_len_cp_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$split",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: split_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toLower",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_lower_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toUpper",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_upper_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$strcasecmp",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: strcasecmp_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$replaceOne",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: replace_one_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$replaceAll",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: replace_all_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$regexMatch",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: regex_match_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$regexFind",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: regex_find_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$regexFindAll",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: regex_find_all_build,
        }),
    ]
}
