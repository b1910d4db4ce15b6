//! Regular expressions shared by the string operators and the predicate compiler.
//!
//! A pattern is written either as a plain string, as a slash literal
//! `/pattern/flags`, or as a `{regex, options}` object. Flags `i`, `m`, `s`, `x`
//! map to case-insensitive, multi-line, dot-matches-newline and extended mode.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

const FLAGS: &str = "imsx";

/// Splits a `/pattern/flags` literal. Returns `None` for any other string.
pub fn parse_literal(text: &str) -> Option<(&str, &str)> {
    let body = text.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (pattern, flags) = (&body[..end], &body[end + 1..]);
    if flags.chars().all(|flag| FLAGS.contains(flag)) {
        Some((pattern, flags))
    } else {
        None
    }
}

/// Compiles a pattern with a flags string. Unknown flags reject the pattern.
pub fn build(pattern: &str, flags: &str) -> Option<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => return None,
        };
    }
    builder.build().ok()
}

/// True for the two self-describing regex forms: a slash literal string or a
/// `{regex, options}` object.
pub fn is_regex_value(value: &Value) -> bool {
    match value {
        Value::String(s) => parse_literal(s).is_some(),
        Value::Object(map) => regex_object(map).is_some(),
        _ => false,
    }
}

fn regex_object(map: &Map<String, Value>) -> Option<(&str, &str)> {
    if !map.keys().all(|key| key == "regex" || key == "options") {
        return None;
    }
    let pattern = map.get("regex")?.as_str()?;
    let options = match map.get("options") {
        None => "",
        Some(options) => options.as_str()?,
    };
    Some((pattern, options))
}

/// Compiles a self-describing regex value (slash literal or `{regex, options}` object).
pub fn from_regex_value(value: &Value) -> Option<Regex> {
    match value {
        Value::String(s) => {
            let (pattern, flags) = parse_literal(s)?;
            build(pattern, flags)
        }
        Value::Object(map) => {
            let (pattern, options) = regex_object(map)?;
            from_pattern(pattern, options)
        }
        _ => None,
    }
}

/// Compiles a pattern argument: a slash literal, or a plain pattern string.
///
/// `options` are merged with the literal's own flags.
pub fn from_pattern(pattern: &str, options: &str) -> Option<Regex> {
    match parse_literal(pattern) {
        Some((pattern, flags)) => build(pattern, &merge_flags(flags, options)),
        None => build(pattern, options),
    }
}

/// Compiles any regex-bearing value: slash literal, plain pattern string, or
/// `{regex, options}` object.
pub fn from_value(value: &Value, options: &str) -> Option<Regex> {
    match value {
        Value::String(s) => from_pattern(s, options),
        Value::Object(map) => {
            let (pattern, own) = regex_object(map)?;
            from_pattern(pattern, &merge_flags(own, options))
        }
        _ => None,
    }
}

fn merge_flags(a: &str, b: &str) -> String {
    let mut flags = a.to_string();
    for flag in b.chars() {
        if !flags.contains(flag) {
            flags.push(flag);
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slash_literals() {
        assert_eq!(parse_literal("/t.*T/i"), Some(("t.*T", "i")));
        assert_eq!(parse_literal("/es/"), Some(("es", "")));
        assert_eq!(parse_literal("/a/b/ms"), Some(("a/b", "ms")));
        assert_eq!(parse_literal("/"), None);
        assert_eq!(parse_literal("plain"), None);
        assert_eq!(parse_literal("/path/to/file"), None);
    }

    #[test]
    fn flags_map_to_modes() {
        assert!(build("abc", "i").unwrap().is_match("ABC"));
        assert!(build("^b", "m").unwrap().is_match("a\nb"));
        assert!(build("a.b", "s").unwrap().is_match("a\nb"));
        assert!(build("a b c", "x").unwrap().is_match("abc"));
        assert!(build("abc", "q").is_none());
        assert!(build("(", "").is_none());
    }

    #[test]
    fn regex_values() {
        assert!(is_regex_value(&json!("/x/")));
        assert!(is_regex_value(&json!({"regex": "x", "options": "i"})));
        assert!(!is_regex_value(&json!({"regex": "x", "other": 1})));
        assert!(!is_regex_value(&json!("x")));
        let re = from_regex_value(&json!({"regex": "^a", "options": "i"})).unwrap();
        assert!(re.is_match("Abc"));
        let re = from_value(&json!("/^a/"), "i").unwrap();
        assert!(re.is_match("Abc"));
    }
}
