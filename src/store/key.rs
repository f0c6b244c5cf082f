//! Structured binding keys
//!
//! Composite keys are rendered as `base/segment/segment` so anything reading
//! the store from outside sees the same key text (`q/locator/css`).

use std::fmt;

/// Separator between key segments in the rendered key
pub const KEY_SEPARATOR: char = '/';

/// A composite store key: a base name plus ordered segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    base: String,
    segments: Vec<String>,
}

impl BindingKey {
    /// Key for a bare name (`username`)
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            segments: Vec::new(),
        }
    }

    /// Parse a rendered key, splitting on `/`.
    ///
    /// The first segment is the base; empty trailing segments are kept so the
    /// rendered text round-trips exactly.
    pub fn parse(key: &str) -> Self {
        let mut parts = key.split(KEY_SEPARATOR);
        let base = parts.next().unwrap_or_default().to_string();
        Self {
            base,
            segments: parts.map(str::to_string).collect(),
        }
    }

    /// Append a segment (`q` -> `q/locator`)
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, or the base for a bare key
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or(&self.base)
    }

    /// `<name>/locator`
    pub fn locator(name: &str) -> Self {
        Self::new(name).child("locator")
    }

    /// `<name>/locator/<strategy>`
    pub fn locator_lookup(name: &str, strategy: &str) -> Self {
        Self::locator(name).child(strategy)
    }

    /// `<name>/<action>`, the key an element action binds its result under
    pub fn action(name: &str, action: &str) -> Self {
        Self::new(name).child(action)
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for segment in &self.segments {
            write!(f, "{}{}", KEY_SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl From<&str> for BindingKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl From<String> for BindingKey {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<&String> for BindingKey {
    fn from(key: &String) -> Self {
        Self::parse(key)
    }
}

impl From<&BindingKey> for BindingKey {
    fn from(key: &BindingKey) -> Self {
        key.clone()
    }
}
