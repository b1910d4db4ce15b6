//! Document-database style expressions and query predicates over JSON.
//!
//! # Overview
//!
//! Two compilers turn JSON into reusable closures:
//!
//! - [`compile_expression`] compiles an aggregation-style expression such as
//!   `{"$add": ["$price", 1]}` into an [`Implementation`], a pure function of a
//!   document and a variable environment.
//! - [`compile_predicate`] compiles a query such as `{"qty": {"$gt": 5}}` into a
//!   [`Predicate`], a pure document test.
//!
//! Compilation is done once; the compiled closures are immutable, `Send + Sync`
//! and never panic or fail. Inapplicable input evaluates to `null` (expressions)
//! or `false` (predicates). Extra operators are plugged in through [`Features`].
//!
//! # Example
//!
//! ```
//! use json_mql::{compile_expression, Vars};
//! use serde_json::json;
//!
//! let total = compile_expression(&json!({"$multiply": ["$price", "$qty"]}), None);
//! let doc = json!({"price": 2.5, "qty": 4});
//! let result = total(doc.as_object().unwrap(), &Vars::new());
//!
//! assert_eq!(result, json!(10));
//! ```

pub mod error;
pub mod evaluate;
pub mod features;
pub mod operators;
pub mod pattern;
pub mod query;
pub mod types;
pub mod util;
pub mod value;
pub mod vars;

pub use error::{ArityError, ConvertError};
pub use evaluate::compile_expression;
pub use features::Features;
pub use operators::operators_map;
pub use query::compile_predicate;
pub use types::{Arity, Implementation, OperatorDefinition, OperatorMap, Predicate, ValuePredicate};
pub use value::{comparable, compare, equals, is_false, Document};
pub use vars::Vars;
