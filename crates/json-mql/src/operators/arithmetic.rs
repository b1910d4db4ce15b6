//! Arithmetic operators. Everything here is exact decimal arithmetic.

use crate::features::Features;
use crate::types::{Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value::{self, compare};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Sums numbers. With exactly one instant among the operands, the numbers are a
/// millisecond offset applied to that instant instead.
pub fn add(values: &[Value]) -> Value {
    let mut total = Decimal::ZERO;
    let mut instant = None;
    for v in values {
        if let Some(d) = value::to_decimal(v) {
            match total.checked_add(d) {
                Some(sum) => total = sum,
                None => return Value::Null,
            }
            continue;
        }
        match value::as_instant(v) {
            Some(dt) if instant.is_none() => instant = Some(dt),
            _ => return Value::Null,
        }
    }
    match instant {
        Some(dt) => offset_instant(dt, total),
        None => value::from_decimal(total),
    }
}

pub(crate) fn offset_instant(instant: DateTime<Utc>, millis: Decimal) -> Value {
    let Some(delta) = millis.round().to_i64().and_then(TimeDelta::try_milliseconds) else {
        return Value::Null;
    };
    instant
        .checked_add_signed(delta)
        .map_or(Value::Null, value::instant_value)
}

pub fn subtract(a: &Value, b: &Value) -> Value {
    if let (Some(x), Some(y)) = (value::to_decimal(a), value::to_decimal(b)) {
        return x.checked_sub(y).map_or(Value::Null, value::from_decimal);
    }
    let Some(start) = value::as_instant(a) else {
        return Value::Null;
    };
    if let Some(end) = value::as_instant(b) {
        return value::from_i64((start - end).num_milliseconds());
    }
    match value::to_decimal(b) {
        Some(millis) => offset_instant(start, -millis),
        None => Value::Null,
    }
}

pub fn multiply(values: &[Value]) -> Value {
    let mut product = Decimal::ONE;
    for v in values {
        let Some(d) = value::to_decimal(v) else {
            return Value::Null;
        };
        match product.checked_mul(d) {
            Some(p) => product = p,
            None => return Value::Null,
        }
    }
    value::from_decimal(product)
}

pub fn divide(a: &Value, b: &Value) -> Value {
    match (value::to_decimal(a), value::to_decimal(b)) {
        (Some(x), Some(y)) if !y.is_zero() => {
            x.checked_div(y).map_or(Value::Null, value::from_decimal)
        }
        _ => Value::Null,
    }
}

/// Remainder with the sign of the dividend.
pub fn modulo(a: &Value, b: &Value) -> Value {
    match (value::to_decimal(a), value::to_decimal(b)) {
        (Some(x), Some(y)) if !y.is_zero() => {
            x.checked_rem(y).map_or(Value::Null, value::from_decimal)
        }
        _ => Value::Null,
    }
}

/// Integral exponents stay exact (negative ones through the reciprocal); other
/// exponents fall back to floating point.
pub fn pow(base: &Value, exponent: &Value) -> Value {
    let (Some(b), Some(e)) = (value::to_decimal(base), value::to_decimal(exponent)) else {
        return Value::Null;
    };
    if let Some(n) = Some(e).filter(|e| e.fract().is_zero()).and_then(|e| e.to_i64()) {
        let Some(magnitude) = checked_powi(b, n.unsigned_abs()) else {
            return Value::Null;
        };
        if n >= 0 {
            return value::from_decimal(magnitude);
        }
        if magnitude.is_zero() {
            return Value::Null;
        }
        return Decimal::ONE
            .checked_div(magnitude)
            .map_or(Value::Null, value::from_decimal);
    }
    match (b.to_f64(), e.to_f64()) {
        (Some(b), Some(e)) => value::from_f64(b.powf(e)),
        _ => Value::Null,
    }
}

fn checked_powi(base: Decimal, mut exponent: u64) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.checked_mul(square)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(result)
}

fn decimal_unary(v: &Value, f: fn(Decimal) -> Decimal) -> Value {
    value::to_decimal(v).map_or(Value::Null, |d| value::from_decimal(f(d)))
}

/// Rounds or truncates to `place` decimal places. A negative place works on the
/// integer part: `round(1555.1111, -2)` is `1600`.
pub fn round_to(d: Decimal, place: i64, strategy: RoundingStrategy) -> Option<Decimal> {
    if place >= 0 {
        let dp = u32::try_from(place).unwrap_or(u32::MAX);
        if dp >= d.scale() {
            return Some(d);
        }
        return Some(d.round_dp_with_strategy(dp, strategy));
    }
    let shift = u32::try_from(place.unsigned_abs()).ok().and_then(pow10);
    let Some(shift) = shift else {
        return Some(Decimal::ZERO);
    };
    d.checked_div(shift)?
        .round_dp_with_strategy(0, strategy)
        .checked_mul(shift)
}

fn pow10(exponent: u32) -> Option<Decimal> {
    if exponent > 28 {
        return None;
    }
    checked_powi(Decimal::TEN, u64::from(exponent))
}

fn build_rounding(
    arg: &Value,
    features: Option<&Features>,
    strategy: RoundingStrategy,
) -> Option<Implementation> {
    let operands = util::operands(arg);
    match operands.len() {
        1 => util::unary(arg, features, move |v| {
            value::to_decimal(v)
                .and_then(|d| round_to(d, 0, strategy))
                .map_or(Value::Null, value::from_decimal)
        }),
        _ => util::binary(arg, features, move |v, place| {
            match (value::to_decimal(v), value::to_i64(place)) {
                (Some(d), Some(place)) => {
                    round_to(d, place, strategy).map_or(Value::Null, value::from_decimal)
                }
                _ => Value::Null,
            }
        }),
    }
}

/// Operand values for `$min`/`$max`/`$avg`: a single array operand is expanded.
fn spread(values: Vec<Value>) -> Vec<Value> {
    match <[Value; 1]>::try_from(values) {
        Ok([Value::Array(items)]) => items,
        Ok(single) => single.into(),
        Err(values) => values,
    }
}

fn extreme(values: Vec<Value>, wanted: Ordering) -> Value {
    spread(values)
        .into_iter()
        .filter(|v| !v.is_null())
        .reduce(|best, v| if compare(&v, &best) == wanted { v } else { best })
        .unwrap_or(Value::Null)
}

fn average(values: Vec<Value>) -> Value {
    let numbers: Vec<Decimal> = spread(values).iter().filter_map(value::to_decimal).collect();
    if numbers.is_empty() {
        return Value::Null;
    }
    let total = numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(*d));
    total
        .and_then(|total| total.checked_div(Decimal::from(numbers.len())))
        .map_or(Value::Null, value::from_decimal)
}

fn add_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| add(&values))
}

fn multiply_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| multiply(&values))
}

fn subtract_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, subtract)
}

fn divide_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, divide)
}

fn mod_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, modulo)
}

fn pow_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::binary(arg, features, pow)
}

fn abs_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| decimal_unary(v, |d| d.abs()))
}

fn ceil_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| decimal_unary(v, |d| d.ceil()))
}

fn floor_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::unary(arg, features, |v| decimal_unary(v, |d| d.floor()))
}

fn round_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    build_rounding(arg, features, RoundingStrategy::MidpointAwayFromZero)
}

fn trunc_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    build_rounding(arg, features, RoundingStrategy::ToZero)
}

fn min_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| extreme(values, Ordering::Less))
}

fn max_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, |values| extreme(values, Ordering::Greater))
}

fn avg_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    util::nary(arg, features, average)
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$add",
            aliases: &[],
            arity: Arity::Any,
            build: add_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$multiply",
            aliases: &[],
            arity: Arity::Any,
            build: multiply_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$subtract",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: subtract_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$divide",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: divide_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$mod",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: mod_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$pow",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: pow_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$abs",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: abs_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$ceil",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: ceil_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$floor",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: floor_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$round",
            aliases: &[],
            arity: Arity::Range(1, Some(2)),
            build: round_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$trunc",
            aliases: &[],
            arity: Arity::Range(1, Some(2)),
            build: trunc_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$min",
            aliases: &[],
            arity: Arity::Any,
            build: min_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$max",
            aliases: &[],
            arity: Arity::Any,
            build: max_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$avg",
            aliases: &[],
            arity: Arity::Any,
            build: avg_build,
        }),
    ]
}
