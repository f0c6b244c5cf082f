//! Attribute resolution - the name to value cascade
//!
//! `resolve_attribute` probes the binding kinds in `PROBE_ORDER`. Script,
//! XPath and regex bindings never fail: an evaluation error degrades to a
//! visible placeholder (`$[javascript:<expr>]`, ...). Only a name with no
//! binding at all is an error.
//!
//! `resolve_bound_value` is the cascade used by interpolation: live element
//! text first, then `resolve_attribute`, then settings.

use std::fmt;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::kind::BindingKind;
use crate::capability::XPathTarget;
use crate::context::WebContext;
use crate::error::{Result, WebStepError};
use crate::store::BindingKey;

/// Diagnostic text standing in for a dynamic value that failed to compute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: &'static str,
    pub expression: String,
}

impl Placeholder {
    fn new(kind: &'static str, expression: &str) -> Self {
        Self {
            kind,
            expression: expression.to_string(),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$[{}:{}]", self.kind, self.expression)
    }
}

/// A computed value, or the placeholder left by a failed evaluation
pub(crate) type Dynamic = std::result::Result<String, Placeholder>;

impl WebContext {
    /// Resolve `name` through the binding cascade.
    ///
    /// Fails with `UnboundAttribute` when no binding kind, literal or
    /// locator exists for the name.
    pub async fn resolve_attribute(&self, name: &str) -> Result<String> {
        let value = self.resolve_dynamic(name).await?;
        Ok(value.unwrap_or_else(|p| p.to_string()))
    }

    /// `resolve_attribute`, keeping a failed evaluation as a `Placeholder`
    async fn resolve_dynamic(&self, name: &str) -> Result<Dynamic> {
        let Some(kind) = BindingKind::probe(self.store(), name) else {
            return self.resolve_fallback(name).await.map(Ok);
        };
        debug!(name, kind = kind.label(), "resolving attribute");

        let value = match kind {
            BindingKind::Literal(value) | BindingKind::Text(value) => Ok(value),
            BindingKind::Script(expression) => self.evaluate_script(&expression).await,
            BindingKind::XPath {
                expression,
                source,
                target,
            } => self.evaluate_xpath(&expression, &source, &target).await,
            BindingKind::Regex { expression, source } => {
                self.evaluate_regex(&expression, &source).await
            }
        };
        Ok(value)
    }

    /// Literal of any value (empty included), then the locator lookup itself
    async fn resolve_fallback(&self, name: &str) -> Result<String> {
        if let Some(value) = self.store().get_optional(BindingKey::new(name)) {
            return Ok(value);
        }

        match self.resolve_locator_binding(name).await {
            Ok(binding) => {
                trace!(name, "resolved to locator expression");
                Ok(binding.expression)
            }
            Err(
                WebStepError::LocatorBindingNotFound { name: missing }
                | WebStepError::LocatorLookupNotFound { name: missing, .. },
            ) if missing == name => Err(WebStepError::UnboundAttribute {
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Resolve `name` for substitution into step text.
    ///
    /// Tries live element text, then `resolve_attribute`, then settings.
    /// Re-entering a name already being resolved fails with
    /// `CircularReference`.
    pub fn resolve_bound_value<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            let _guard = self.enter_expansion(name)?;
            let value = self.lookup_bound_value(name).await?;
            Ok(value.unwrap_or_else(|p| p.to_string()))
        }
        .boxed()
    }

    pub(crate) async fn lookup_bound_value(&self, name: &str) -> Result<Dynamic> {
        match self.resolve_locator_binding(name).await {
            Ok(binding) => match self.read_text(&binding).await {
                Ok(text) => return Ok(Ok(text)),
                Err(e @ WebStepError::CircularReference { .. }) => return Err(e),
                Err(e) => debug!(name, error = %e, "live read failed, falling back"),
            },
            Err(e @ WebStepError::CircularReference { .. }) => return Err(e),
            Err(e) => trace!(name, error = %e, "no usable locator"),
        }

        match self.resolve_dynamic(name).await {
            Ok(value) => Ok(value),
            Err(WebStepError::UnboundAttribute { name: missing }) if missing == name => {
                match self.settings().lookup(name) {
                    Some(value) => {
                        debug!(name, "resolved from settings");
                        Ok(Ok(value))
                    }
                    None => Err(WebStepError::UnboundAttribute { name: missing }),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Run a script expression and stringify its result.
    pub(crate) async fn evaluate_script(&self, expression: &str) -> Dynamic {
        let placeholder = || Placeholder::new("javascript", expression);

        let script = match self.interpolate(expression).await {
            Ok(script) => script,
            Err(e) => {
                warn!(expression, error = %e, "script binding could not be interpolated");
                return Err(placeholder());
            }
        };

        match self.driver().execute_script(&as_return_script(&script), None).await {
            Ok(value) => Ok(stringify_value(&value)),
            Err(e) => {
                warn!(expression, error = %e, "script binding failed");
                Err(placeholder())
            }
        }
    }

    async fn evaluate_xpath(&self, expression: &str, source: &str, target: &str) -> Dynamic {
        let placeholder = || Placeholder::new("xpath", expression);

        let inputs = async {
            let expr = self.interpolate(expression).await?;
            let source_text = self.source_text(source).await?;
            Ok::<_, WebStepError>((expr, source_text))
        };
        let (expr, source_text) = match inputs.await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(expression, error = %e, "xpath binding inputs unavailable");
                return Err(placeholder());
            }
        };

        let evaluated = target
            .parse::<XPathTarget>()
            .and_then(|target| self.xpath().evaluate(&expr, &source_text, target));
        evaluated.map_err(|e| {
            warn!(expression, error = %e, "xpath binding failed");
            placeholder()
        })
    }

    async fn evaluate_regex(&self, expression: &str, source: &str) -> Dynamic {
        let placeholder = || Placeholder::new("regex", expression);

        let inputs = async {
            let pattern = self.interpolate(expression).await?;
            let source_text = self.source_text(source).await?;
            Ok::<_, WebStepError>((pattern, source_text))
        };
        let (pattern, source_text) = match inputs.await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(expression, error = %e, "regex binding inputs unavailable");
                return Err(placeholder());
            }
        };

        self.regex().extract(&pattern, &source_text).map_err(|e| {
            warn!(expression, error = %e, "regex binding failed");
            placeholder()
        })
    }

    /// `source` names another binding; its value is the text to search.
    async fn source_text(&self, source: &str) -> Result<String> {
        let source_name = self.interpolate(source).await?;
        self.resolve_bound_value(source_name.trim()).await
    }
}

/// Scripts are evaluated for their value
pub(crate) fn as_return_script(script: &str) -> String {
    let script = script.trim();
    if script.starts_with("return ") {
        script.to_string()
    } else {
        format!("return {}", script)
    }
}

/// Strings verbatim, null empty, everything else as compact JSON
pub(crate) fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `true`, or a string spelling true in any case
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::LocatorStrategy;
    use crate::driver::mock::{MockDriver, MockElement};
    use crate::driver::OfflineDriver;
    use crate::store::ScopedStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn offline(store: ScopedStore) -> WebContext {
        WebContext::builder(Arc::new(OfflineDriver))
            .store(Arc::new(store))
            .build()
    }

    #[test]
    fn placeholder_text() {
        let p = Placeholder::new("javascript", "document.title");
        assert_eq!(p.to_string(), "$[javascript:document.title]");
    }

    #[test]
    fn return_wrapping() {
        assert_eq!(as_return_script("1 + 1"), "return 1 + 1");
        assert_eq!(as_return_script("  return x;"), "return x;");
    }

    #[test]
    fn value_stringification() {
        assert_eq!(stringify_value(&json!("abc")), "abc");
        assert_eq!(stringify_value(&Value::Null), "");
        assert_eq!(stringify_value(&json!(42)), "42");
        assert_eq!(stringify_value(&json!(true)), "true");
        assert_eq!(stringify_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("TRUE")));
        assert!(!is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(1)));
        assert!(!is_truthy(&Value::Null));
    }

    #[tokio::test]
    async fn literal_wins_without_touching_the_driver() {
        let store = ScopedStore::new();
        store.set("user", "alice");
        store.set("user/javascript", "window.user");
        let driver = Arc::new(MockDriver::new());
        let ctx = WebContext::builder(driver.clone())
            .store(Arc::new(store))
            .build();

        assert_eq!(ctx.resolve_attribute("user").await.unwrap(), "alice");
        assert!(driver.executed_scripts().is_empty());
    }

    #[tokio::test]
    async fn script_result_is_stringified() {
        let store = ScopedStore::new();
        store.set("count/javascript", "items.length");
        let driver = Arc::new(MockDriver::new());
        driver.set_script("items.length", json!(3));
        let ctx = WebContext::builder(driver)
            .store(Arc::new(store))
            .build();

        assert_eq!(ctx.resolve_attribute("count").await.unwrap(), "3");
    }

    #[tokio::test]
    async fn script_expression_is_interpolated_first() {
        let store = ScopedStore::new();
        store.set("field", "email");
        store.set("value/javascript", "form.$field");
        let driver = Arc::new(MockDriver::new());
        driver.set_script("form.email", json!("a@b.c"));
        let ctx = WebContext::builder(driver)
            .store(Arc::new(store))
            .build();

        assert_eq!(ctx.resolve_attribute("value").await.unwrap(), "a@b.c");
    }

    #[tokio::test]
    async fn failing_script_degrades_to_placeholder() {
        let store = ScopedStore::new();
        store.set("title/javascript", "document.title");
        let ctx = offline(store);

        assert_eq!(
            ctx.resolve_attribute("title").await.unwrap(),
            "$[javascript:document.title]"
        );
    }

    #[tokio::test]
    async fn unresolvable_script_input_keeps_raw_expression() {
        let store = ScopedStore::new();
        store.set("x/javascript", "lookup($missing)");
        let ctx = offline(store);

        assert_eq!(
            ctx.resolve_attribute("x").await.unwrap(),
            "$[javascript:lookup($missing)]"
        );
    }

    #[tokio::test]
    async fn regex_reads_source_binding() {
        let store = ScopedStore::new();
        store.set("banner", "Order #4521 confirmed");
        store.set("order/regex/expression", r"#(\d+)");
        store.set("order/regex/source", "banner");
        let ctx = offline(store);

        assert_eq!(ctx.resolve_attribute("order").await.unwrap(), "4521");
    }

    #[tokio::test]
    async fn regex_without_match_degrades_to_placeholder() {
        let store = ScopedStore::new();
        store.set("banner", "nothing here");
        store.set("order/regex/expression", r"#(\d+)");
        store.set("order/regex/source", "banner");
        let ctx = offline(store);

        assert_eq!(
            ctx.resolve_attribute("order").await.unwrap(),
            r"$[regex:#(\d+)]"
        );
    }

    #[tokio::test]
    async fn xpath_without_evaluator_degrades_to_placeholder() {
        let store = ScopedStore::new();
        store.set("page", "<a>1</a>");
        store.set("link/xpath/expression", "//a");
        store.set("link/xpath/source", "page");
        store.set("link/xpath/targetType", "text");
        let ctx = offline(store);

        assert_eq!(ctx.resolve_attribute("link").await.unwrap(), "$[xpath://a]");
    }

    #[tokio::test]
    async fn fallback_to_empty_literal() {
        let store = ScopedStore::new();
        store.set("blank", "");
        let ctx = offline(store);

        assert_eq!(ctx.resolve_attribute("blank").await.unwrap(), "");
    }

    #[tokio::test]
    async fn fallback_to_locator_expression() {
        let store = ScopedStore::new();
        store.set("q/locator", "css");
        store.set("q/locator/css", "input[name=q]");
        let ctx = offline(store);

        assert_eq!(ctx.resolve_attribute("q").await.unwrap(), "input[name=q]");
    }

    #[tokio::test]
    async fn nothing_bound_is_unbound() {
        let ctx = offline(ScopedStore::new());
        let err = ctx.resolve_attribute("ghost").await.unwrap_err();
        assert!(matches!(err, WebStepError::UnboundAttribute { name } if name == "ghost"));
    }

    #[tokio::test]
    async fn unbound_name_inside_locator_is_reported() {
        let store = ScopedStore::new();
        store.set("q/locator", "css");
        store.set("q/locator/css", "#$missing");
        let ctx = offline(store);

        let err = ctx.resolve_attribute("q").await.unwrap_err();
        assert!(matches!(err, WebStepError::UnboundAttribute { name } if name == "missing"));

        let err = ctx.resolve_bound_value("q").await.unwrap_err();
        assert!(matches!(err, WebStepError::UnboundAttribute { name } if name == "missing"));
    }

    #[tokio::test]
    async fn bound_value_falls_back_to_settings() {
        let mut config = crate::config::WebConfig::default();
        config
            .settings
            .insert("base.url".to_string(), "https://example.org".to_string());
        let ctx = WebContext::builder(Arc::new(OfflineDriver))
            .config(config)
            .build();

        assert_eq!(
            ctx.resolve_bound_value("base.url").await.unwrap(),
            "https://example.org"
        );
    }

    #[tokio::test]
    async fn bound_value_prefers_live_text() {
        let store = ScopedStore::new();
        store.set("greeting/locator", "id");
        store.set("greeting/locator/id", "hello");
        let driver = Arc::new(MockDriver::new());
        driver.add_element(
            LocatorStrategy::Id,
            "hello",
            MockElement::new().with_text("Hi there"),
        );
        let store = Arc::new(store);
        let ctx = WebContext::builder(driver)
            .store(Arc::clone(&store))
            .build();

        assert_eq!(ctx.resolve_bound_value("greeting").await.unwrap(), "Hi there");
        assert_eq!(store.get("greeting/text").unwrap(), "Hi there");
    }
}
