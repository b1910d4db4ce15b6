//! Caller extensions: extra expression and query operators.

use crate::types::{Implementation, Operator, QueryOperator, ValuePredicate};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Immutable bundle of caller-registered operators.
///
/// Every `with_*` call returns a new bundle; the receiver is left untouched, so a
/// `Features` can be shared freely between threads and compilations. The same
/// value is threaded down to every nested sub-expression and sub-query.
///
/// A registered name shadows a built-in operator of the same name. Names carry
/// the `$` sigil; it is added when missing.
#[derive(Clone, Default)]
pub struct Features {
    operators: Arc<HashMap<String, Operator>>,
    query_operators: Arc<HashMap<String, QueryOperator>>,
    resolver: Option<Arc<dyn Any + Send + Sync>>,
}

impl Features {
    pub fn new() -> Self {
        Features::default()
    }

    /// Registers an expression operator.
    #[must_use]
    pub fn with_operator<F>(&self, name: &str, constructor: F) -> Features
    where
        F: Fn(&Value, Option<&Features>) -> Implementation + Send + Sync + 'static,
    {
        let mut operators = (*self.operators).clone();
        operators.insert(sigil(name), Arc::new(constructor));
        Features {
            operators: Arc::new(operators),
            ..self.clone()
        }
    }

    /// Registers a per-field query operator.
    #[must_use]
    pub fn with_query_operator<F>(&self, name: &str, constructor: F) -> Features
    where
        F: Fn(&Value, Option<&Features>) -> ValuePredicate + Send + Sync + 'static,
    {
        let mut query_operators = (*self.query_operators).clone();
        query_operators.insert(sigil(name), Arc::new(constructor));
        Features {
            query_operators: Arc::new(query_operators),
            ..self.clone()
        }
    }

    /// Attaches an opaque resolver handle for document loaders built on top
    /// of this crate. The compilers never look at it.
    #[must_use]
    pub fn with_resolver<R: Any + Send + Sync>(&self, resolver: R) -> Features {
        Features {
            resolver: Some(Arc::new(resolver)),
            ..self.clone()
        }
    }

    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn query_operator(&self, name: &str) -> Option<&QueryOperator> {
        self.query_operators.get(name)
    }

    pub fn resolver(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.resolver.as_deref()
    }

    /// The resolver handle, if one is attached and has type `R`.
    pub fn resolver_as<R: Any>(&self) -> Option<&R> {
        self.resolver()?.downcast_ref::<R>()
    }
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operators: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        operators.sort_unstable();
        let mut query_operators: Vec<&str> =
            self.query_operators.keys().map(String::as_str).collect();
        query_operators.sort_unstable();
        f.debug_struct("Features")
            .field("operators", &operators)
            .field("query_operators", &query_operators)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

fn sigil(name: &str) -> String {
    if name.starts_with('$') {
        name.to_string()
    } else {
        format!("${name}")
    }
}
