//! Date operators over instant strings, all in UTC.

use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{self, as_instant};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

pub const DEFAULT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%LZ";

/// The date operand of a date-part operator: either the expression itself or `{"date": expr}`.
fn date_operand(arg: &Value) -> Option<&Value> {
    let [operand] = util::operands(arg) else {
        return None;
    };
    match operand {
        Value::Object(map) if map.len() == 1 && map.contains_key("date") => map.get("date"),
        _ => Some(operand),
    }
}

fn part_build(
    arg: &Value,
    features: Option<&Features>,
    part: fn(DateTime<Utc>) -> i64,
) -> Option<Implementation> {
    let date = compile_expression(date_operand(arg)?, features);
    Some(implementation(move |doc, vars| {
        as_instant(&date(doc, vars)).map_or(Value::Null, |instant| value::from_i64(part(instant)))
    }))
}

fn year_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.year()))
}

fn month_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.month()))
}

fn day_of_month_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.day()))
}

fn hour_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.hour()))
}

fn minute_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.minute()))
}

fn second_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.second()))
}

fn millisecond_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.timestamp_subsec_millis()))
}

// 1 is Sunday.
fn day_of_week_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.weekday().number_from_sunday()))
}

fn day_of_year_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    part_build(arg, features, |d| i64::from(d.ordinal()))
}

/// Renders an instant with `%Y %m %d %H %M %S %L %j %u %%`. Unknown directives yield `None`.
pub fn format_instant(instant: DateTime<Utc>, format: &str) -> Option<String> {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let written = match chars.next()? {
            'Y' => write!(out, "{:04}", instant.year()),
            'm' => write!(out, "{:02}", instant.month()),
            'd' => write!(out, "{:02}", instant.day()),
            'H' => write!(out, "{:02}", instant.hour()),
            'M' => write!(out, "{:02}", instant.minute()),
            'S' => write!(out, "{:02}", instant.second()),
            'L' => write!(out, "{:03}", instant.timestamp_subsec_millis()),
            'j' => write!(out, "{:03}", instant.ordinal()),
            'u' => write!(out, "{}", instant.weekday().number_from_monday()),
            '%' => write!(out, "%"),
            _ => return None,
        };
        written.ok()?;
    }
    Some(out)
}

/// `{"$dateToString": {"date": .., "format": .., "onNull": ..}}`.
fn date_to_string_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["date", "format", "onNull"]) {
        return None;
    }
    let date = compile_expression(args.get("date")?, features);
    let format = util::compile_named(args, "format", features);
    let on_null = util::compile_named(args, "onNull", features);
    Some(implementation(move |doc, vars| {
        let date = date(doc, vars);
        if date.is_null() {
            return on_null.as_ref().map_or(Value::Null, |f| f(doc, vars));
        }
        let Some(instant) = as_instant(&date) else {
            return Value::Null;
        };
        let format = match format.as_ref().map(|f| f(doc, vars)) {
            None => DEFAULT_FORMAT.to_string(),
            Some(Value::String(format)) => format,
            Some(_) => return Value::Null,
        };
        format_instant(instant, &format).map_or(Value::Null, Value::String)
    }))
}

/// `{"$dateFromString": {"dateString": .., "onError": .., "onNull": ..}}`.
fn date_from_string_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["dateString", "onError", "onNull"]) {
        return None;
    }
    let date_string = compile_expression(args.get("dateString")?, features);
    let on_error = util::compile_named(args, "onError", features);
    let on_null = util::compile_named(args, "onNull", features);
    Some(implementation(move |doc, vars| {
        let parsed = match date_string(doc, vars) {
            Value::Null => return on_null.as_ref().map_or(Value::Null, |f| f(doc, vars)),
            Value::String(s) => value::parse_date(&s),
            _ => None,
        };
        match parsed {
            Some(instant) => value::instant_value(instant),
            None => on_error.as_ref().map_or(Value::Null, |f| f(doc, vars)),
        }
    }))
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$year",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: year_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$month",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: month_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$dayOfMonth",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: day_of_month_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$hour",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: hour_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$minute",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: minute_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$second",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: second_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$millisecond",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: millisecond_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$dayOfWeek",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: day_of_week_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$dayOfYear",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: day_of_year_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$dateToString",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: date_to_string_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$dateFromString",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: date_from_string_build,
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_directives() {
        let instant = value::parse_instant("2024-03-05T07:08:09.012Z").unwrap();
        assert_eq!(
            format_instant(instant, DEFAULT_FORMAT).as_deref(),
            Some("2024-03-05T07:08:09.012Z")
        );
        assert_eq!(format_instant(instant, "%j|%u|%%").as_deref(), Some("065|2|%"));
        assert_eq!(format_instant(instant, "%Q"), None);
        assert_eq!(format_instant(instant, "trailing %"), None);
    }
}
