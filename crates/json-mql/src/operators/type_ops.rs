//! Type inspection and conversion operators.
//!
//! All conversions go through [`convert`], keyed by a [`Target`] named either by
//! type name or by legacy numeric type code. It is the one place in the engine
//! that reports failure as an error; `$convert` catches it and substitutes its
//! `onError` value, the `$to*` shorthands substitute `null`.

use crate::error::ConvertError;
use crate::evaluate::compile_expression;
use crate::features::Features;
use crate::pattern;
use crate::types::{implementation, Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{self, type_name};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Double,
    String,
    Bool,
    Date,
    Int,
    Long,
    Decimal,
}

impl Target {
    pub fn from_name(name: &str) -> Option<Target> {
        match name {
            "double" => Some(Target::Double),
            "string" => Some(Target::String),
            "bool" => Some(Target::Bool),
            "date" => Some(Target::Date),
            "int" => Some(Target::Int),
            "long" => Some(Target::Long),
            "decimal" => Some(Target::Decimal),
            _ => None,
        }
    }

    pub fn from_code(code: i64) -> Option<Target> {
        match code {
            1 => Some(Target::Double),
            2 => Some(Target::String),
            8 => Some(Target::Bool),
            9 => Some(Target::Date),
            16 => Some(Target::Int),
            18 => Some(Target::Long),
            19 => Some(Target::Decimal),
            _ => None,
        }
    }

    /// Reads a target given as a type name or a numeric type code.
    pub fn from_value(v: &Value) -> Result<Target, ConvertError> {
        let target = match v {
            Value::String(name) => Target::from_name(name),
            Value::Number(_) => value::to_i64(v).and_then(Target::from_code),
            _ => None,
        };
        target.ok_or_else(|| ConvertError::UnsupportedTarget(v.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Target::Double => "double",
            Target::String => "string",
            Target::Bool => "bool",
            Target::Date => "date",
            Target::Int => "int",
            Target::Long => "long",
            Target::Decimal => "decimal",
        }
    }
}

fn unconvertible(target: Target, v: &Value) -> ConvertError {
    ConvertError::Unconvertible {
        target: target.name(),
        value: v.to_string(),
    }
}

fn epoch_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn bool_number(b: bool) -> Value {
    value::from_i64(i64::from(b))
}

fn to_integer(v: &Value, target: Target) -> Result<i64, ConvertError> {
    let n = match v {
        Value::Bool(b) => i64::from(*b),
        Value::Number(_) => {
            let d = value::to_decimal(v).ok_or_else(|| unconvertible(target, v))?;
            d.trunc()
                .to_i64()
                .ok_or(ConvertError::OutOfRange { target: target.name() })?
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => n,
            Err(_) if target == Target::Long => {
                value::parse_instant(s).map(epoch_millis).ok_or_else(|| unconvertible(target, v))?
            }
            Err(_) => return Err(unconvertible(target, v)),
        },
        _ => return Err(unconvertible(target, v)),
    };
    if target == Target::Int && i32::try_from(n).is_err() {
        return Err(ConvertError::OutOfRange { target: target.name() });
    }
    Ok(n)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// Converts a non-null value to `target`.
pub fn convert(v: &Value, target: Target) -> Result<Value, ConvertError> {
    match target {
        Target::Bool => match v {
            Value::Bool(_) => Ok(v.clone()),
            Value::Number(_) => Ok(Value::Bool(!value::is_false(v))),
            Value::String(_) => Ok(Value::Bool(true)),
            _ => Err(unconvertible(target, v)),
        },
        Target::Int | Target::Long => to_integer(v, target).map(value::from_i64),
        Target::Double => match v {
            Value::Bool(b) => Ok(bool_number(*b)),
            Value::Number(_) => value::to_f64(v)
                .map(value::from_f64)
                .filter(|n| !n.is_null())
                .ok_or_else(|| unconvertible(target, v)),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(value::from_f64(f)),
                _ => value::parse_instant(s)
                    .map(|instant| value::from_i64(epoch_millis(instant)))
                    .ok_or_else(|| unconvertible(target, v)),
            },
            _ => Err(unconvertible(target, v)),
        },
        Target::Decimal => match v {
            Value::Bool(b) => Ok(bool_number(*b)),
            Value::Number(_) => value::to_decimal(v)
                .map(value::from_decimal)
                .ok_or_else(|| unconvertible(target, v)),
            Value::String(s) => parse_decimal(s)
                .map(value::from_decimal)
                .ok_or_else(|| unconvertible(target, v)),
            _ => Err(unconvertible(target, v)),
        },
        Target::String => match v {
            Value::String(_) => Ok(v.clone()),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(unconvertible(target, v)),
        },
        Target::Date => match v {
            Value::Number(_) => {
                let millis = value::to_decimal(v)
                    .and_then(|d| d.trunc().to_i64())
                    .ok_or(ConvertError::OutOfRange { target: target.name() })?;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .map(value::instant_value)
                    .ok_or(ConvertError::OutOfRange { target: target.name() })
            }
            Value::String(s) => value::parse_date(s)
                .map(value::instant_value)
                .ok_or_else(|| unconvertible(target, v)),
            _ => Err(unconvertible(target, v)),
        },
    }
}

/// `{"$convert": {"input": .., "to": .., "onError": .., "onNull": ..}}`.
fn convert_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    let args = util::named(arg)?;
    if !util::only_keys(args, &["input", "to", "onError", "onNull"]) {
        return None;
    }
    let input = compile_expression(args.get("input")?, features);
    let to = compile_expression(args.get("to")?, features);
    let on_error = util::compile_named(args, "onError", features);
    let on_null = util::compile_named(args, "onNull", features);
    Some(implementation(move |doc, vars| {
        let v = input(doc, vars);
        if v.is_null() {
            return on_null.as_ref().map_or(Value::Null, |f| f(doc, vars));
        }
        let converted = Target::from_value(&to(doc, vars)).and_then(|target| convert(&v, target));
        match converted {
            Ok(result) => result,
            Err(err) => {
                trace!(%err, "conversion failed, substituting onError");
                on_error.as_ref().map_or(Value::Null, |f| f(doc, vars))
            }
        }
    }))
}

fn shorthand(arg: &Value, features: Option<&Features>, target: Target) -> Option<Implementation> {
    util::unary(arg, features, move |v| {
        if v.is_null() {
            return Value::Null;
        }
        convert(v, target).unwrap_or_else(|err| {
            trace!(%err, "conversion failed");
            Value::Null
        })
    })
}

fn to_bool_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Bool)
}

fn to_int_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Int)
}

fn to_long_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Long)
}

fn to_double_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Double)
}

fn to_decimal_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Decimal)
}

fn to_string_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::String)
}

fn to_date_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    shorthand(arg, features, Target::Date)
}

fn is_number_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| Value::Bool(v.is_number()))
}

fn type_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| Value::String(type_name(v).to_string()))
}

/// Whether `v` has the type named by `alias`: a type name, `"number"`, or a
/// legacy numeric type code.
pub fn has_type(v: &Value, alias: &Value) -> bool {
    let name = match alias {
        Value::String(name) => name.as_str(),
        Value::Number(_) => match value::to_i64(alias) {
            Some(1) => "double",
            Some(2) => "string",
            Some(3) => "object",
            Some(4) => "array",
            Some(8) => "bool",
            Some(9) => "date",
            Some(10) => "null",
            Some(11) => "regex",
            Some(16) => "int",
            Some(18) => "long",
            Some(19) => "decimal",
            _ => return false,
        },
        _ => return false,
    };
    match name {
        "number" => v.is_number(),
        "string" => v.is_string(),
        "regex" => pattern::is_regex_value(v),
        "decimal" => type_name(v) == "double",
        other => type_name(v) == other,
    }
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$type",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: type_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$convert",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: convert_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toBool",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_bool_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toInt",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_int_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toLong",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_long_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toDouble",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_double_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toDecimal",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_decimal_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toString",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_string_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$toDate",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: to_date_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$isNumber",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: is_number_build,
        }),
    ]
}
