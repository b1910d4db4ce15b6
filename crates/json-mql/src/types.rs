use crate::error::ArityError;
use crate::features::Features;
use crate::value::Document;
use crate::vars::Vars;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A compiled expression: a pure function of the document and the variables.
///
/// Built once, then safe to call any number of times from any number of threads.
pub type Implementation = Arc<dyn Fn(&Document, &Vars) -> Value + Send + Sync>;

/// A compiled query: a pure document test.
pub type Predicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Test produced by a caller-registered query operator, applied to a field value.
pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Caller-registered expression operator: turns the operator argument into an [`Implementation`].
///
/// The `Features` in effect is passed along so the constructor can compile nested
/// sub-expressions with the same extensions.
pub type Operator = Arc<dyn Fn(&Value, Option<&Features>) -> Implementation + Send + Sync>;

/// Caller-registered query operator: turns the operator argument into a [`ValuePredicate`].
pub type QueryOperator = Arc<dyn Fn(&Value, Option<&Features>) -> ValuePredicate + Send + Sync>;

/// Operator arity, counted over the normalised operand list.
///
/// A non-array argument counts as a single operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    /// Skip the arity check; the builder inspects the argument itself.
    Any,
    /// Exactly `n` operands.
    Fixed(usize),
    /// At least two operands.
    Variadic,
    /// Between `min` and `max` operands. `None` for max = unlimited.
    Range(usize, Option<usize>),
}

/// Builds an implementation from the raw operator argument.
///
/// `None` means the argument is malformed; the dispatcher then compiles the
/// operator to a constant `null`.
pub type BuildFn = fn(&Value, Option<&Features>) -> Option<Implementation>;

/// A built-in operator.
pub struct OperatorDefinition {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    pub build: BuildFn,
}

/// Map of operator name/alias -> definition.
pub type OperatorMap = HashMap<&'static str, Arc<OperatorDefinition>>;

/// Checks an operand count against an operator's arity.
pub fn assert_arity(operator: &str, arity: &Arity, actual: usize) -> Result<(), ArityError> {
    let (min, max) = match arity {
        Arity::Any => return Ok(()),
        Arity::Fixed(n) => {
            if actual != *n {
                return Err(ArityError::Fixed {
                    operator: operator.to_string(),
                    expected: *n,
                    actual,
                });
            }
            return Ok(());
        }
        Arity::Variadic => (2, None),
        Arity::Range(min, max) => (*min, *max),
    };
    if actual < min {
        return Err(ArityError::TooFew {
            operator: operator.to_string(),
            min,
            actual,
        });
    }
    match max {
        Some(max) if actual > max => Err(ArityError::TooMany {
            operator: operator.to_string(),
            max,
            actual,
        }),
        _ => Ok(()),
    }
}

/// Builds an `OperatorMap` from a list of operator definitions.
pub fn operators_to_map(operators: Vec<Arc<OperatorDefinition>>) -> OperatorMap {
    let mut map = HashMap::new();
    for op in operators {
        map.insert(op.name, Arc::clone(&op));
        for alias in op.aliases {
            map.insert(*alias, Arc::clone(&op));
        }
    }
    map
}

/// Wraps a closure as an [`Implementation`].
pub fn implementation<F>(f: F) -> Implementation
where
    F: Fn(&Document, &Vars) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Document) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An implementation that ignores its inputs.
pub fn constant(value: Value) -> Implementation {
    implementation(move |_, _| value.clone())
}

/// The implementation every inapplicable expression compiles to.
pub fn null() -> Implementation {
    constant(Value::Null)
}

/// A predicate with a fixed answer.
pub fn always(answer: bool) -> Predicate {
    predicate(move |_| answer)
}
