//! ScopedStore - a stack of named key/value scopes
//!
//! The bottom scope (`global`) is persistent and never popped. Lookups search
//! the top scope first, then the global scope. Writes always land in the top
//! scope (which is the global scope when nothing has been pushed).
//!
//! All methods take `&self`; the stack sits behind a `parking_lot::RwLock` and
//! no guard outlives a single call.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{Result, WebStepError};

use super::key::BindingKey;

/// Name of the persistent bottom scope
pub const GLOBAL_SCOPE: &str = "global";

/// One frame of the store: a named set of bindings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    name: String,
    entries: BTreeMap<String, String>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Stack of scopes with the global scope at the bottom
#[derive(Debug)]
pub struct ScopedStore {
    scopes: RwLock<Vec<Scope>>,
}

impl Default for ScopedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedStore {
    /// Create a store holding only the global scope
    pub fn new() -> Self {
        Self {
            scopes: RwLock::new(vec![Scope::new(GLOBAL_SCOPE)]),
        }
    }

    /// Open a new scope on top of the stack
    pub fn push_scope(&self, name: impl Into<String>) {
        let name = name.into();
        trace!(scope = %name, "push scope");
        self.scopes.write().push(Scope::new(name));
    }

    /// Close the top scope. The global scope is never popped.
    pub fn pop_scope(&self) -> Option<Scope> {
        let mut scopes = self.scopes.write();
        if scopes.len() <= 1 {
            return None;
        }
        let scope = scopes.pop();
        if let Some(s) = &scope {
            trace!(scope = %s.name(), "pop scope");
        }
        scope
    }

    /// Name of the scope writes currently land in
    pub fn current_scope_name(&self) -> String {
        self.scopes
            .read()
            .last()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| GLOBAL_SCOPE.to_string())
    }

    /// Number of scopes, global included
    pub fn depth(&self) -> usize {
        self.scopes.read().len()
    }

    /// Required lookup: top scope, then global
    pub fn get(&self, key: impl Into<BindingKey>) -> Result<String> {
        let key = key.into().to_string();
        self.lookup(&key)
            .ok_or(WebStepError::UnboundAttribute { name: key })
    }

    /// Optional lookup: top scope, then global
    pub fn get_optional(&self, key: impl Into<BindingKey>) -> Option<String> {
        self.lookup(&key.into().to_string())
    }

    /// Optional lookup that treats an empty value as absent
    pub fn get_non_empty(&self, key: impl Into<BindingKey>) -> Option<String> {
        self.get_optional(key).filter(|v| !v.is_empty())
    }

    /// Whether the key is visible from the current scope
    pub fn contains(&self, key: impl Into<BindingKey>) -> bool {
        self.get_optional(key).is_some()
    }

    /// Bind a value in the current scope, overwriting any previous value
    pub fn set(&self, key: impl Into<BindingKey>, value: impl Into<String>) {
        let key = key.into().to_string();
        let value = value.into();
        trace!(key = %key, value = %value, "bind");
        let mut scopes = self.scopes.write();
        if let Some(top) = scopes.last_mut() {
            top.set(key, value);
        }
    }

    /// Bind a value in the persistent global scope
    pub fn set_global(&self, key: impl Into<BindingKey>, value: impl Into<String>) {
        let mut scopes = self.scopes.write();
        if let Some(global) = scopes.first_mut() {
            global.set(key.into().to_string(), value.into());
        }
    }

    /// All keys visible from the current scope (top overriding global), sorted
    pub fn visible_entries(&self) -> Vec<(String, String)> {
        let scopes = self.scopes.read();
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        if let Some(global) = scopes.first() {
            for (k, v) in global.iter() {
                merged.insert(k.to_string(), v.to_string());
            }
        }
        if scopes.len() > 1 {
            if let Some(top) = scopes.last() {
                for (k, v) in top.iter() {
                    merged.insert(k.to_string(), v.to_string());
                }
            }
        }
        merged.into_iter().collect()
    }

    /// Human-readable dump of every scope, bottom first.
    ///
    /// Attached to failed steps as diagnostic context.
    pub fn dump(&self) -> String {
        let scopes = self.scopes.read();
        let mut out = String::new();
        for scope in scopes.iter() {
            let _ = writeln!(out, "scope: {}", scope.name());
            for (k, v) in scope.iter() {
                let _ = writeln!(out, "  {} : {}", k, v);
            }
        }
        out
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let scopes = self.scopes.read();
        if let Some(top) = scopes.last() {
            if let Some(v) = top.get(key) {
                return Some(v.to_string());
            }
        }
        scopes
            .first()
            .and_then(|global| global.get(key))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_is_unbound() {
        let store = ScopedStore::new();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, WebStepError::UnboundAttribute { name } if name == "missing"));
        assert_eq!(store.get_optional("missing"), None);
    }

    #[test]
    fn set_overwrites() {
        let store = ScopedStore::new();
        store.set("a", "1");
        store.set("a", "2");
        assert_eq!(store.get("a").unwrap(), "2");
    }

    #[test]
    fn top_scope_shadows_global() {
        let store = ScopedStore::new();
        store.set("a", "global");
        store.push_scope("page");
        assert_eq!(store.get("a").unwrap(), "global");

        store.set("a", "page");
        assert_eq!(store.get("a").unwrap(), "page");

        store.pop_scope();
        assert_eq!(store.get("a").unwrap(), "global");
    }

    #[test]
    fn intermediate_scopes_are_not_searched() {
        let store = ScopedStore::new();
        store.push_scope("outer");
        store.set("x", "outer");
        store.push_scope("inner");
        assert_eq!(store.get_optional("x"), None);
    }

    #[test]
    fn global_scope_is_never_popped() {
        let store = ScopedStore::new();
        assert!(store.pop_scope().is_none());
        assert_eq!(store.depth(), 1);
        assert_eq!(store.current_scope_name(), GLOBAL_SCOPE);
    }

    #[test]
    fn set_global_survives_pop() {
        let store = ScopedStore::new();
        store.push_scope("page");
        store.set_global("session", "abc");
        store.pop_scope();
        assert_eq!(store.get("session").unwrap(), "abc");
    }

    #[test]
    fn structured_keys_render_external_names() {
        let store = ScopedStore::new();
        store.set(BindingKey::locator_lookup("q", "css"), "input[name=q]");
        assert_eq!(store.get("q/locator/css").unwrap(), "input[name=q]");
    }

    #[test]
    fn get_non_empty_skips_blank() {
        let store = ScopedStore::new();
        store.set("blank", "");
        assert_eq!(store.get_non_empty("blank"), None);
        assert_eq!(store.get_optional("blank"), Some(String::new()));
    }

    #[test]
    fn dump_lists_scopes_bottom_first() {
        let store = ScopedStore::new();
        store.set("a", "1");
        store.push_scope("login page");
        store.set("b", "2");

        let dump = store.dump();
        let global_at = dump.find("scope: global").unwrap();
        let page_at = dump.find("scope: login page").unwrap();
        assert!(global_at < page_at);
        assert!(dump.contains("  b : 2"));
    }

    #[test]
    fn visible_entries_merge_top_over_global() {
        let store = ScopedStore::new();
        store.set("a", "g");
        store.set("b", "g");
        store.push_scope("page");
        store.set("b", "p");

        let entries = store.visible_entries();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "g".to_string()),
                ("b".to_string(), "p".to_string())
            ]
        );
    }
}
