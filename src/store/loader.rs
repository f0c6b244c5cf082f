//! Bindings files - seed a ScopedStore from YAML
//!
//! ```yaml
//! global:
//!   base url: https://example.org
//! search page:
//!   search field/locator: css selector
//!   search field/locator/css selector: input[name=q]
//! ```
//!
//! `global` fills the persistent scope; every other top-level key is pushed as
//! a scope in file order, so the last one is the active scope.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{Result, WebStepError};

use super::scope::{ScopedStore, GLOBAL_SCOPE};

impl ScopedStore {
    /// Build a store from bindings YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse_bindings(yaml, "<inline>")
    }

    /// Build a store from a bindings file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        Self::parse_bindings(&yaml, &path.display().to_string())
    }

    fn parse_bindings(yaml: &str, origin: &str) -> Result<Self> {
        let invalid = |reason: String| WebStepError::BindingsFile {
            path: origin.to_string(),
            reason,
        };

        let root: Mapping = if yaml.trim().is_empty() {
            Mapping::new()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?
        };

        let store = ScopedStore::new();
        for (scope_name, entries) in &root {
            let scope_name = scalar_to_string(scope_name)
                .ok_or_else(|| invalid("scope names must be strings".to_string()))?;
            let entries = match entries {
                Value::Mapping(m) => m.clone(),
                Value::Null => Mapping::new(),
                _ => {
                    return Err(invalid(format!(
                        "scope '{}' must be a mapping of key: value",
                        scope_name
                    )))
                }
            };

            let is_global = scope_name == GLOBAL_SCOPE;
            if !is_global {
                store.push_scope(scope_name.clone());
            }
            for (key, value) in &entries {
                let key = scalar_to_string(key).ok_or_else(|| {
                    invalid(format!("non-scalar key in scope '{}'", scope_name))
                })?;
                let value = scalar_to_string(value).ok_or_else(|| {
                    invalid(format!("value of '{}' must be a scalar", key))
                })?;
                if is_global {
                    store.set_global(key.as_str(), value);
                } else {
                    store.set(key.as_str(), value);
                }
            }
        }
        Ok(store)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
