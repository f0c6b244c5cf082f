//! External capabilities consumed during resolution
//!
//! - `XPathEvaluator`: evaluate an XPath expression over source text
//! - `RegexExtractor`: extract a fragment of source text
//! - `Settings`: process-wide configuration, the last resolution fallback
//! - `ScreenshotCapture`: side-effect screenshots after element actions

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

/// Failure of a capability call. Resolution turns these into placeholders.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct CapabilityError(pub String);

/// What an XPath evaluation should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathTarget {
    /// String value of the first match
    Text,
    /// First matching node, serialized
    Node,
    /// Every matching node, serialized
    NodeSet,
}

impl XPathTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            XPathTarget::Text => "text",
            XPathTarget::Node => "node",
            XPathTarget::NodeSet => "nodeset",
        }
    }
}

impl fmt::Display for XPathTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XPathTarget {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "text" | "string" => Ok(XPathTarget::Text),
            "node" => Ok(XPathTarget::Node),
            "nodeset" | "nodelist" => Ok(XPathTarget::NodeSet),
            other => Err(CapabilityError(format!("unknown XPath target type '{}'", other))),
        }
    }
}

/// XPath evaluation over a source document
pub trait XPathEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        source: &str,
        target: XPathTarget,
    ) -> Result<String, CapabilityError>;
}

/// Evaluator used when no XPath engine is plugged in; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoXPath;

impl XPathEvaluator for NoXPath {
    fn evaluate(
        &self,
        expression: &str,
        _source: &str,
        _target: XPathTarget,
    ) -> Result<String, CapabilityError> {
        Err(CapabilityError(format!(
            "no XPath evaluator configured for '{}'",
            expression
        )))
    }
}

/// Regex extraction over source text
pub trait RegexExtractor: Send + Sync {
    fn extract(&self, pattern: &str, source: &str) -> Result<String, CapabilityError>;
}

/// `regex`-backed extractor: first capture group, else the whole match.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl RegexExtractor for PatternExtractor {
    fn extract(&self, pattern: &str, source: &str) -> Result<String, CapabilityError> {
        let re = Regex::new(pattern)
            .map_err(|e| CapabilityError(format!("invalid regex '{}': {}", pattern, e)))?;
        let caps = re
            .captures(source)
            .ok_or_else(|| CapabilityError(format!("'{}' did not match", pattern)))?;
        let m = caps.get(1).or_else(|| caps.get(0));
        Ok(m.map(|m| m.as_str().to_string()).unwrap_or_default())
    }
}

/// Process-wide settings lookup
pub trait Settings: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Settings from the `[settings]` config table, then the environment.
///
/// Environment lookup tries the name as given, then upper-cased with `.`,
/// `-` and spaces mapped to `_` (`base.url` -> `BASE_URL`).
#[derive(Debug, Default, Clone)]
pub struct ConfigSettings {
    values: BTreeMap<String, String>,
}

impl ConfigSettings {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl Settings for ConfigSettings {
    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(v) = self.values.get(name) {
            return Some(v.clone());
        }
        if let Ok(v) = std::env::var(name) {
            return Some(v);
        }
        let env_name: String = name
            .chars()
            .map(|c| match c {
                '.' | '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        std::env::var(env_name).ok()
    }
}

/// Screenshot capture for report augmentation
#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    /// Capture the current page; returns an artifact handle (path, id, ...)
    async fn capture(&self, label: &str) -> Result<String, CapabilityError>;
}
