//! Binding kinds and their probing order
//!
//! A name's kind is decided by which keys exist for it:
//!
//! | Kind    | Keys                                                          |
//! |---------|---------------------------------------------------------------|
//! | Literal | `name` (non-empty)                                            |
//! | Text    | `name/text` (non-empty)                                       |
//! | Script  | `name/javascript`                                             |
//! | XPath   | `name/xpath/expression`, `name/xpath/source`, `name/xpath/targetType` |
//! | Regex   | `name/regex/expression`, `name/regex/source`                  |
//!
//! Probing follows `PROBE_ORDER`; the first kind present wins.

use crate::store::{BindingKey, ScopedStore};

/// The ways a name can be bound at the resolution layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Literal(String),
    Text(String),
    Script(String),
    XPath {
        expression: String,
        source: String,
        target: String,
    },
    Regex {
        expression: String,
        source: String,
    },
}

/// Discriminant used to express the probing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Literal,
    Text,
    Script,
    XPath,
    Regex,
}

/// Resolution priority, highest first
pub const PROBE_ORDER: [Probe; 5] = [
    Probe::Literal,
    Probe::Text,
    Probe::Script,
    Probe::XPath,
    Probe::Regex,
];

impl Probe {
    fn detect(self, store: &ScopedStore, name: &str) -> Option<BindingKind> {
        match self {
            Probe::Literal => store.get_non_empty(BindingKey::new(name)).map(BindingKind::Literal),
            Probe::Text => store.get_non_empty(sub_key(name, &["text"])).map(BindingKind::Text),
            Probe::Script => store
                .get_optional(sub_key(name, &["javascript"]))
                .map(BindingKind::Script),
            Probe::XPath => {
                let expression = store.get_optional(sub_key(name, &["xpath", "expression"]))?;
                let source = store.get_optional(sub_key(name, &["xpath", "source"]))?;
                let target = store.get_optional(sub_key(name, &["xpath", "targetType"]))?;
                Some(BindingKind::XPath {
                    expression,
                    source,
                    target,
                })
            }
            Probe::Regex => {
                let expression = store.get_optional(sub_key(name, &["regex", "expression"]))?;
                let source = store.get_optional(sub_key(name, &["regex", "source"]))?;
                Some(BindingKind::Regex { expression, source })
            }
        }
    }
}

fn sub_key(name: &str, segments: &[&str]) -> BindingKey {
    segments
        .iter()
        .fold(BindingKey::new(name), |k, s| k.child(*s))
}

impl BindingKind {
    /// Probe the store for `name`, in `PROBE_ORDER`
    pub fn probe(store: &ScopedStore, name: &str) -> Option<BindingKind> {
        PROBE_ORDER.iter().find_map(|p| p.detect(store, name))
    }

    pub fn label(&self) -> &'static str {
        match self {
            BindingKind::Literal(_) => "literal",
            BindingKind::Text(_) => "text",
            BindingKind::Script(_) => "javascript",
            BindingKind::XPath { .. } => "xpath",
            BindingKind::Regex { .. } => "regex",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_bound() {
        let store = ScopedStore::new();
        assert_eq!(BindingKind::probe(&store, "x"), None);
    }

    #[test]
    fn literal_beats_everything() {
        let store = ScopedStore::new();
        store.set("x", "lit");
        store.set("x/text", "txt");
        store.set("x/javascript", "1");
        assert_eq!(
            BindingKind::probe(&store, "x"),
            Some(BindingKind::Literal("lit".into()))
        );
    }

    #[test]
    fn empty_literal_falls_to_text() {
        let store = ScopedStore::new();
        store.set("x", "");
        store.set("x/text", "txt");
        assert_eq!(
            BindingKind::probe(&store, "x"),
            Some(BindingKind::Text("txt".into()))
        );
    }

    #[test]
    fn text_beats_script() {
        let store = ScopedStore::new();
        store.set("x/javascript", "document.title");
        store.set("x/text", "cached");
        assert_eq!(BindingKind::probe(&store, "x").unwrap().label(), "text");
    }

    #[test]
    fn xpath_needs_all_three_keys() {
        let store = ScopedStore::new();
        store.set("x/xpath/expression", "//a");
        store.set("x/xpath/source", "doc");
        assert_eq!(BindingKind::probe(&store, "x"), None);

        store.set("x/xpath/targetType", "text");
        assert_eq!(BindingKind::probe(&store, "x").unwrap().label(), "xpath");
    }

    #[test]
    fn xpath_beats_regex() {
        let store = ScopedStore::new();
        store.set("x/regex/expression", "\\d+");
        store.set("x/regex/source", "doc");
        assert_eq!(BindingKind::probe(&store, "x").unwrap().label(), "regex");

        store.set("x/xpath/expression", "//a");
        store.set("x/xpath/source", "doc");
        store.set("x/xpath/targetType", "text");
        assert_eq!(BindingKind::probe(&store, "x").unwrap().label(), "xpath");
    }

    #[test]
    fn probe_order_is_fixed() {
        assert_eq!(
            PROBE_ORDER,
            [Probe::Literal, Probe::Text, Probe::Script, Probe::XPath, Probe::Regex]
        );
    }
}
