//! Built-in expression operators, one module per family.

pub mod arithmetic;
pub mod array;
pub mod branching;
pub mod comparison;
pub mod date;
pub mod logical;
pub mod math;
pub mod set;
pub mod string;
pub mod type_ops;
pub mod variable;

use crate::types::{operators_to_map, OperatorDefinition, OperatorMap};
use std::sync::{Arc, OnceLock};

/// All built-in operators.
pub fn all_operators() -> Vec<Arc<OperatorDefinition>> {
    let mut ops = Vec::new();
    ops.extend(arithmetic::operators());
    ops.extend(math::operators());
    ops.extend(comparison::operators());
    ops.extend(logical::operators());
    ops.extend(branching::operators());
    ops.extend(array::operators());
    ops.extend(set::operators());
    ops.extend(string::operators());
    ops.extend(type_ops::operators());
    ops.extend(date::operators());
    ops.extend(variable::operators());
    ops
}

/// Builds a fresh operator map from all built-in operators.
pub fn operators_map() -> OperatorMap {
    operators_to_map(all_operators())
}

/// The shared, immutable built-in table consulted by the expression compiler.
pub fn builtin() -> &'static OperatorMap {
    static BUILTIN: OnceLock<OperatorMap> = OnceLock::new();
    BUILTIN.get_or_init(operators_map)
}
