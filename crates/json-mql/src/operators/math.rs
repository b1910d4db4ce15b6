//! Transcendental and trigonometric operators.
//!
//! These run on `f64` and return the IEEE result unchanged; a NaN or infinite
//! result becomes `null`.

use crate::features::Features;
use crate::types::{Arity, Implementation, OperatorDefinition};
use crate::util;
use crate::value;
use serde_json::Value;
use std::sync::Arc;

fn float_unary(
    arg: &Value,
    features: Option<&Features>,
    f: fn(f64) -> f64,
) -> Option<Implementation> {
    util::unary(arg, features, move |v| {
        value::to_f64(v).map_or(Value::Null, |x| value::from_f64(f(x)))
    })
}

fn float_binary(
    arg: &Value,
    features: Option<&Features>,
    f: fn(f64, f64) -> f64,
) -> Option<Implementation> {
    util::binary(arg, features, move |a, b| match (value::to_f64(a), value::to_f64(b)) {
        (Some(x), Some(y)) => value::from_f64(f(x, y)),
        _ => Value::Null,
    })
}

/// Logarithm of `n` in `base`.
pub fn log(n: f64, base: f64) -> f64 {
    if n <= 0.0 || base <= 0.0 || base == 1.0 {
        return f64::NAN;
    }
    n.ln() / base.ln()
}

fn sqrt_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::sqrt)
}

fn exp_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::exp)
}

fn ln_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, |x| if x > 0.0 { x.ln() } else { f64::NAN })
}

fn log10_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, |x| if x > 0.0 { x.log10() } else { f64::NAN })
}

fn log_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_binary(arg, features, log)
}

fn sin_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::sin)
}

fn cos_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::cos)
}

fn tan_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::tan)
}

fn asin_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::asin)
}

fn acos_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::acos)
}

fn atan_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::atan)
}

fn atan2_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_binary(arg, features, f64::atan2)
}

fn sinh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::sinh)
}

fn cosh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::cosh)
}

fn tanh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::tanh)
}

fn asinh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::asinh)
}

fn acosh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::acosh)
}

fn atanh_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::atanh)
}

fn degrees_to_radians_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::to_radians)
}

fn radians_to_degrees_build(arg: &Value, features: Option<&Features>) -> Option<Implementation> {
    float_unary(arg, features, f64::to_degrees)
}

pub fn operators() -> Vec<Arc<OperatorDefinition>> {
    vec![
        Arc::new(OperatorDefinition {
            name: "$sqrt",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: sqrt_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$exp",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: exp_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$ln",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: ln_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$log10",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: log10_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$log",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: log_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$sin",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: sin_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$cos",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: cos_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$tan",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: tan_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$asin",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: asin_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$acos",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: acos_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$atan",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: atan_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$atan2",
            aliases: &[],
            arity: Arity::Fixed(2),
            build: atan2_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$sinh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: sinh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$cosh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: cosh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$tanh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: tanh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$asinh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: asinh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$acosh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: acosh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$atanh",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: atanh_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$degreesToRadians",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: degrees_to_radians_build,
        }),
        Arc::new(OperatorDefinition {
            name: "$radiansToDegrees",
            aliases: &[],
            arity: Arity::Fixed(1),
            build: radians_to_degrees_build,
        }),
    ]
}
