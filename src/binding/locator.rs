//! Locator bindings - element name to driver strategy and expression
//!
//! ```yaml
//! search field/locator: css selector
//! search field/locator/css selector: input[name=q]
//! ```
//!
//! Re-derived on every call, so binding changes between steps apply at once.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::context::WebContext;
use crate::error::{Result, WebStepError};
use crate::store::{BindingKey, ScopedStore};

/// How the driver finds an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStrategy {
    Id,
    Name,
    Css,
    XPath,
    ClassName,
    TagName,
    LinkText,
    PartialLinkText,
    JavaScript,
}

impl LocatorStrategy {
    /// Canonical external name (W3C WebDriver spelling where one exists)
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Name => "name",
            LocatorStrategy::Css => "css selector",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::ClassName => "class name",
            LocatorStrategy::TagName => "tag name",
            LocatorStrategy::LinkText => "link text",
            LocatorStrategy::PartialLinkText => "partial link text",
            LocatorStrategy::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocatorStrategy {
    type Err = String;

    /// Case-insensitive; spaces, dashes and underscores are ignored
    /// (`css selector`, `CSS`, `class_name`, `partial-link-text`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "id" => Ok(LocatorStrategy::Id),
            "name" => Ok(LocatorStrategy::Name),
            "css" | "cssselector" => Ok(LocatorStrategy::Css),
            "xpath" => Ok(LocatorStrategy::XPath),
            "class" | "classname" => Ok(LocatorStrategy::ClassName),
            "tag" | "tagname" => Ok(LocatorStrategy::TagName),
            "linktext" => Ok(LocatorStrategy::LinkText),
            "partiallinktext" => Ok(LocatorStrategy::PartialLinkText),
            "javascript" | "js" => Ok(LocatorStrategy::JavaScript),
            _ => Err(s.to_string()),
        }
    }
}

/// A resolved element locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorBinding {
    pub element_name: String,
    pub strategy: LocatorStrategy,
    pub expression: String,
}

impl LocatorBinding {
    pub fn new(
        element_name: impl Into<String>,
        strategy: LocatorStrategy,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            element_name: element_name.into(),
            strategy,
            expression: expression.into(),
        }
    }
}

impl fmt::Display for LocatorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}: {}]", self.element_name, self.strategy, self.expression)
    }
}

/// Read the raw strategy and lookup for `name` without interpolating.
///
/// Returns the parsed strategy and the un-interpolated lookup expression.
pub(crate) fn read_locator(store: &ScopedStore, name: &str) -> Result<(LocatorStrategy, String)> {
    let strategy_text = store
        .get_non_empty(BindingKey::locator(name))
        .ok_or_else(|| WebStepError::LocatorBindingNotFound {
            name: name.to_string(),
        })?;
    let strategy_text = strategy_text.trim();

    let strategy: LocatorStrategy =
        strategy_text
            .parse()
            .map_err(|_| WebStepError::InvalidLocatorStrategy {
                name: name.to_string(),
                strategy: strategy_text.to_string(),
            })?;

    let lookup = store
        .get_non_empty(BindingKey::locator_lookup(name, strategy_text))
        .ok_or_else(|| WebStepError::LocatorLookupNotFound {
            name: name.to_string(),
            strategy: strategy_text.to_string(),
        })?;

    Ok((strategy, lookup))
}

/// Check every `<name>/locator` binding visible in the store.
///
/// Returns one entry per element name, in key order.
pub fn check_locator_bindings(store: &ScopedStore) -> Vec<(String, Result<LocatorStrategy>)> {
    store
        .visible_entries()
        .into_iter()
        .filter_map(|(key, _)| {
            let key = BindingKey::parse(&key);
            (key.segments().len() == 1 && key.leaf() == "locator").then(|| key.base().to_string())
        })
        .map(|name| {
            let checked = read_locator(store, &name).map(|(strategy, _)| strategy);
            (name, checked)
        })
        .collect()
}

impl WebContext {
    /// Resolve an element name to its locator binding.
    ///
    /// The lookup expression is interpolated, so it may reference other
    /// bound values.
    pub async fn resolve_locator_binding(&self, name: &str) -> Result<LocatorBinding> {
        let (strategy, lookup) = read_locator(self.store(), name)?;
        let expression = self.interpolate(&lookup).await?;
        debug!(element = name, strategy = %strategy, expression = %expression, "locator binding");
        Ok(LocatorBinding::new(name, strategy, expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::OfflineDriver;
    use std::sync::Arc;

    fn context(store: ScopedStore) -> WebContext {
        WebContext::builder(Arc::new(OfflineDriver))
            .store(Arc::new(store))
            .build()
    }

    #[test]
    fn strategy_aliases() {
        assert_eq!("css".parse::<LocatorStrategy>().unwrap(), LocatorStrategy::Css);
        assert_eq!("CSS Selector".parse::<LocatorStrategy>().unwrap(), LocatorStrategy::Css);
        assert_eq!("class_name".parse::<LocatorStrategy>().unwrap(), LocatorStrategy::ClassName);
        assert_eq!(
            "partial-link-text".parse::<LocatorStrategy>().unwrap(),
            LocatorStrategy::PartialLinkText
        );
        assert!("shadow".parse::<LocatorStrategy>().is_err());
    }

    #[test]
    fn strategy_display_is_external_name() {
        assert_eq!(LocatorStrategy::LinkText.to_string(), "link text");
    }

    #[tokio::test]
    async fn missing_locator_key() {
        let ctx = context(ScopedStore::new());
        let err = ctx.resolve_locator_binding("q").await.unwrap_err();
        assert!(matches!(err, WebStepError::LocatorBindingNotFound { name } if name == "q"));
    }

    #[tokio::test]
    async fn missing_lookup_key() {
        let store = ScopedStore::new();
        store.set("q/locator", "css");
        let ctx = context(store);

        let err = ctx.resolve_locator_binding("q").await.unwrap_err();
        assert!(matches!(
            err,
            WebStepError::LocatorLookupNotFound { ref name, ref strategy } if name == "q" && strategy == "css"
        ));
    }

    #[tokio::test]
    async fn unknown_strategy() {
        let store = ScopedStore::new();
        store.set("q/locator", "shadow");
        store.set("q/locator/shadow", "x");
        let ctx = context(store);

        let err = ctx.resolve_locator_binding("q").await.unwrap_err();
        assert_eq!(err.code(), "WEB-012");
    }

    #[tokio::test]
    async fn css_binding() {
        let store = ScopedStore::new();
        store.set("q/locator", "css");
        store.set("q/locator/css", "input[name=q]");
        let ctx = context(store);

        let binding = ctx.resolve_locator_binding("q").await.unwrap();
        assert_eq!(binding, LocatorBinding::new("q", LocatorStrategy::Css, "input[name=q]"));
    }

    #[tokio::test]
    async fn lookup_expression_is_interpolated() {
        let store = ScopedStore::new();
        store.set("row", "3");
        store.set("cell/locator", "xpath");
        store.set("cell/locator/xpath", "//tr[${row}]/td[1]");
        let ctx = context(store);

        let binding = ctx.resolve_locator_binding("cell").await.unwrap();
        assert_eq!(binding.expression, "//tr[3]/td[1]");
    }

    #[tokio::test]
    async fn lookup_referring_to_itself_is_a_cycle() {
        let store = ScopedStore::new();
        store.set("loop/locator", "id");
        store.set("loop/locator/id", "x-${loop}");
        let ctx = context(store);

        let err = ctx.resolve_locator_binding("loop").await.unwrap_err();
        assert!(matches!(err, WebStepError::CircularReference { .. }));
    }

    #[test]
    fn check_reports_each_element() {
        let store = ScopedStore::new();
        store.set("ok/locator", "id");
        store.set("ok/locator/id", "ok");
        store.set("bad/locator", "id");
        store.set("ok/click/wait", "1");

        let report = check_locator_bindings(&store);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].0, "bad");
        assert!(report[0].1.is_err());
        assert_eq!(report[1].0, "ok");
        assert_eq!(report[1].1.as_ref().ok(), Some(&LocatorStrategy::Id));
    }
}
