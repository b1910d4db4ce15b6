use crate::value;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

/// Name of the reserved current-instant variable, referenced as `$$NOW`.
pub const NOW: &str = "NOW";

/// Variable environment handed to a compiled expression, referenced as `$$name`.
///
/// `NOW` is reserved: it is never stored and resolves to the wall clock at each
/// reference, rendered the same way instants are rendered everywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vars {
    vars: HashMap<String, Value>,
}

impl Vars {
    pub fn new() -> Self {
        Vars::default()
    }

    /// Resolves a variable name. Unknown names resolve to `null`.
    pub fn resolve(&self, name: &str) -> Value {
        if name == NOW {
            return value::instant_value(Utc::now());
        }
        self.vars.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Returns a stored binding, if any. The reserved `NOW` is never stored.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Binds a variable. Binding the reserved `NOW` is ignored.
    pub fn set(&mut self, name: &str, value: Value) {
        if name == NOW {
            return;
        }
        self.vars.insert(name.to_string(), value);
    }

    /// Returns a copy of this environment with one more binding.
    #[must_use]
    pub fn with(&self, name: &str, value: Value) -> Vars {
        let mut vars = self.clone();
        vars.set(name, value);
        vars
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut vars = Vars::new();
        for (name, value) in iter {
            vars.set(&name.into(), value);
        }
        vars
    }
}

impl From<HashMap<String, Value>> for Vars {
    fn from(vars: HashMap<String, Value>) -> Self {
        vars.into_iter().collect()
    }
}
