//! Resilient element actuator
//!
//! Every live interaction goes through `with_element`: locate, act, and on an
//! interaction fault (stale, not interactable, intercepted) locate again and
//! retry once. After the action, `bind_and_wait` records
//! `<element>/<action> = value` and honours any configured
//! `<element>/<action>/wait` sleep or `<element>/<action>/condition` script.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::binding::resolve::{as_return_script, is_truthy};
use crate::binding::LocatorBinding;
use crate::context::WebContext;
use crate::driver::{DriverError, WebElement, ENTER_KEY};
use crate::error::{Result, WebStepError};
use crate::store::BindingKey;
use crate::wait::WaitSpec;

/// Locate + act attempts: the first try and one retry
const ATTEMPTS: usize = 2;

/// Element actions that bind `<element>/<action> = true`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    DoubleClick,
    Submit,
    Check,
    Uncheck,
}

impl ElementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementAction::Click => "click",
            ElementAction::DoubleClick => "doubleClick",
            ElementAction::Submit => "submit",
            ElementAction::Check => "check",
            ElementAction::Uncheck => "uncheck",
        }
    }
}

/// How a dropdown option is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectBy {
    Text(String),
    Value(String),
    Index(usize),
}

/// Which edge of the viewport an element is scrolled to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEdge {
    Top,
    Bottom,
}

impl ScrollEdge {
    fn script(&self) -> &'static str {
        match self {
            ScrollEdge::Top => "arguments[0].scrollIntoView(true);",
            ScrollEdge::Bottom => "arguments[0].scrollIntoView(false);",
        }
    }
}

impl WebContext {
    /// Locate the element for `binding` and run `action` on it.
    ///
    /// An interaction fault from locating or acting triggers exactly one
    /// re-locate and retry. Any failure of the retry is
    /// `ElementInteractionFailed`.
    pub async fn with_element<T, F>(
        &self,
        label: Option<&str>,
        binding: &LocatorBinding,
        action: F,
    ) -> Result<T>
    where
        T: Send,
        F: for<'e> Fn(&'e dyn WebElement) -> BoxFuture<'e, std::result::Result<T, DriverError>>
            + Send
            + Sync,
    {
        let name = binding.element_name.as_str();
        let label = label.unwrap_or(name);
        let mut last_fault = None;

        for attempt in 1..=ATTEMPTS {
            let outcome = match self
                .driver()
                .locate(binding.strategy, &binding.expression)
                .await
            {
                Ok(element) => action(element.as_ref()).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    debug!(element = name, action = label, attempt, "element action done");
                    self.capture_screenshot(label).await;
                    return Ok(value);
                }
                Err(fault) if last_fault.is_some() => {
                    warn!(element = name, action = label, attempt, error = %fault, "retry failed");
                    last_fault = Some(fault);
                    break;
                }
                Err(fault) if fault.is_interaction_fault() => {
                    warn!(element = name, action = label, attempt, error = %fault, "interaction fault");
                    last_fault = Some(fault);
                }
                Err(DriverError::NotFound(reason)) => {
                    return Err(WebStepError::ElementNotFound {
                        name: name.to_string(),
                        reason,
                    })
                }
                Err(e) => {
                    return Err(WebStepError::Driver {
                        reason: e.to_string(),
                    })
                }
            }
        }

        Err(WebStepError::ElementInteractionFailed {
            name: name.to_string(),
            reason: last_fault.map(|f| f.to_string()).unwrap_or_default(),
        })
    }

    /// Read the element's text and bind it to `<element>/text`.
    ///
    /// Visible text, else the `text` attribute, else `value`.
    pub async fn read_text(&self, binding: &LocatorBinding) -> Result<String> {
        let text = self
            .with_element(Some("read"), binding, |el| element_text(el).boxed())
            .await?;
        self.bind_and_wait(&binding.element_name, "text", &text).await?;
        Ok(text)
    }

    pub async fn type_text(
        &self,
        binding: &LocatorBinding,
        value: &str,
        clear_first: bool,
        send_enter: bool,
    ) -> Result<()> {
        let keys = value.to_string();
        self.with_element(Some("type"), binding, move |el| {
            let keys = keys.clone();
            async move {
                if clear_first {
                    el.clear().await?;
                }
                el.send_keys(&keys).await
            }
            .boxed()
        })
        .await?;
        self.bind_and_wait(&binding.element_name, "type", value).await?;

        if send_enter {
            self.with_element(Some("enter"), binding, |el| el.send_keys(ENTER_KEY))
                .await?;
            self.bind_and_wait(&binding.element_name, "enter", "true").await?;
        }
        Ok(())
    }

    pub async fn clear(&self, binding: &LocatorBinding) -> Result<()> {
        self.with_element(Some("clear"), binding, |el| el.clear()).await?;
        self.bind_and_wait(&binding.element_name, "clear", "true").await
    }

    /// Select a dropdown option; returns and binds the selected visible text.
    pub async fn select(&self, binding: &LocatorBinding, by: SelectBy) -> Result<String> {
        let selected = self
            .with_element(Some("select"), binding, move |el| {
                let by = by.clone();
                async move {
                    match &by {
                        SelectBy::Text(text) => el.select_by_text(text).await?,
                        SelectBy::Value(value) => el.select_by_value(value).await?,
                        SelectBy::Index(index) => el.select_by_index(*index).await?,
                    }
                    el.selected_text().await
                }
                .boxed()
            })
            .await?;
        self.bind_and_wait(&binding.element_name, "select", &selected).await?;
        Ok(selected)
    }

    /// Click, double-click, submit, check or uncheck.
    ///
    /// Check and uncheck leave an element already in the target state alone.
    pub async fn perform_action(&self, action: ElementAction, binding: &LocatorBinding) -> Result<()> {
        self.with_element(Some(action.as_str()), binding, move |el| {
            apply_action(el, action).boxed()
        })
        .await?;
        self.bind_and_wait(&binding.element_name, action.as_str(), "true").await
    }

    /// Whether the element currently reads as non-empty text
    pub async fn wait_for_non_empty_text(&self, binding: &LocatorBinding) -> Result<bool> {
        Ok(!self.read_text(binding).await?.is_empty())
    }

    /// Wait until the element shows non-empty text.
    ///
    /// Uses the configured default timeout when `timeout` is `None`. A missing
    /// or stale element counts as "not yet".
    pub async fn wait_for_text(
        &self,
        binding: &LocatorBinding,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let spec = WaitSpec::new(timeout.unwrap_or_else(|| self.config().wait_timeout()))
            .with_reason(format!("text in {}", binding.element_name));

        self.waits()
            .wait_until(&spec, move || async move {
                match self.wait_for_non_empty_text(binding).await {
                    Ok(ready) => Ok(ready),
                    Err(
                        WebStepError::ElementNotFound { .. }
                        | WebStepError::ElementInteractionFailed { .. },
                    ) => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await
    }

    pub async fn scroll_into_view(&self, binding: &LocatorBinding, edge: ScrollEdge) -> Result<()> {
        let driver = Arc::clone(self.driver());
        let script = edge.script();
        self.with_element(Some("scroll"), binding, move |el| {
            let driver = Arc::clone(&driver);
            async move { driver.execute_script(script, Some(el)).await.map(|_| ()) }.boxed()
        })
        .await
    }

    /// Bind `<element>/<action> = value`, then apply its wait and condition.
    pub async fn bind_and_wait(&self, element: &str, action: &str, value: &str) -> Result<()> {
        let key = BindingKey::action(element, action);
        self.store().set(&key, value);

        let wait_key = key.clone().child("wait");
        if let Some(wait) = self.store().get_optional(&wait_key) {
            let pause = wait
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| WebStepError::InvalidBindingValue {
                    key: wait_key.to_string(),
                    value: wait.clone(),
                })?;
            debug!(key = %key, pause_ms = pause.as_millis() as u64, "post-action wait");
            sleep(pause).await;
        }

        if let Some(condition) = self.store().get_optional(key.child("condition")) {
            let reason = format!("{} {} condition: {}", element, action, condition);
            self.wait_for_condition(&condition, reason).await?;
        }
        Ok(())
    }

    /// Block until `<condition>/javascript` evaluates truthy.
    ///
    /// Script errors while polling count as "not yet".
    async fn wait_for_condition(&self, condition: &str, reason: String) -> Result<()> {
        let script = self
            .store()
            .get(BindingKey::new(condition).child("javascript"))?;
        let script = as_return_script(&self.interpolate(&script).await?);
        let driver = Arc::clone(self.driver());
        let spec = WaitSpec::new(self.config().wait_timeout()).with_reason(reason);

        info!(condition, "waiting for condition");
        self.waits()
            .wait_until(&spec, || {
                let driver = Arc::clone(&driver);
                let script = script.clone();
                async move {
                    match driver.execute_script(&script, None).await {
                        Ok(value) => Ok(is_truthy(&value)),
                        Err(e) => {
                            debug!(error = %e, "condition script failed, retrying");
                            Ok(false)
                        }
                    }
                }
            })
            .await
    }
}

async fn element_text(el: &dyn WebElement) -> std::result::Result<String, DriverError> {
    let text = el.text().await?;
    if !text.is_empty() {
        return Ok(text);
    }
    if let Some(text) = el.attribute("text").await?.filter(|t| !t.is_empty()) {
        return Ok(text);
    }
    Ok(el.attribute("value").await?.unwrap_or_default())
}

async fn apply_action(
    el: &dyn WebElement,
    action: ElementAction,
) -> std::result::Result<(), DriverError> {
    match action {
        ElementAction::Click => el.click().await,
        ElementAction::DoubleClick => el.double_click().await,
        ElementAction::Submit => el.submit().await,
        ElementAction::Check | ElementAction::Uncheck => {
            let want = action == ElementAction::Check;
            if el.is_selected().await? != want {
                el.click().await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::LocatorStrategy;
    use crate::driver::mock::{MockDriver, MockElement};
    use crate::store::ScopedStore;
    use serde_json::json;
    use std::time::Instant;

    fn setup() -> (Arc<MockDriver>, Arc<ScopedStore>, WebContext) {
        let driver = Arc::new(MockDriver::new());
        let store = Arc::new(ScopedStore::new());
        let ctx = WebContext::builder(driver.clone())
            .store(Arc::clone(&store))
            .build();
        (driver, store, ctx)
    }

    fn button() -> LocatorBinding {
        LocatorBinding::new("btn", LocatorStrategy::Id, "go")
    }

    #[test]
    fn action_names() {
        assert_eq!(ElementAction::DoubleClick.as_str(), "doubleClick");
        assert_eq!(ElementAction::Uncheck.as_str(), "uncheck");
    }

    #[tokio::test]
    async fn stale_action_retries_once() {
        let (driver, store, ctx) = setup();
        let el = MockElement::new();
        el.fail_next(DriverError::Stale("detached".into()));
        driver.add_element(LocatorStrategy::Id, "go", el.clone());

        ctx.perform_action(ElementAction::Click, &button()).await.unwrap();

        assert_eq!(driver.locate_count(LocatorStrategy::Id, "go"), 2);
        assert_eq!(el.clicks(), 1);
        assert_eq!(store.get("btn/click").unwrap(), "true");
    }

    #[tokio::test]
    async fn second_fault_fails() {
        let (driver, _store, ctx) = setup();
        let el = MockElement::new();
        el.fail_next(DriverError::Stale("detached".into()));
        el.fail_next(DriverError::NotInteractable("covered".into()));
        driver.add_element(LocatorStrategy::Id, "go", el);

        let err = ctx
            .perform_action(ElementAction::Click, &button())
            .await
            .unwrap_err();
        assert!(matches!(err, WebStepError::ElementInteractionFailed { ref name, .. } if name == "btn"));
        assert_eq!(driver.locate_count(LocatorStrategy::Id, "go"), 2);
    }

    #[tokio::test]
    async fn stale_locate_retries() {
        let (driver, _store, ctx) = setup();
        driver.add_element(LocatorStrategy::Id, "go", MockElement::new().with_text("Go"));
        driver.fail_next_locate(LocatorStrategy::Id, "go", DriverError::Stale("reload".into()));

        assert_eq!(ctx.read_text(&button()).await.unwrap(), "Go");
    }

    #[tokio::test]
    async fn missing_element_is_not_retried() {
        let (driver, _store, ctx) = setup();
        let err = ctx.clear(&button()).await.unwrap_err();
        assert_eq!(err.code(), "WEB-020");
        assert_eq!(driver.locate_count(LocatorStrategy::Id, "go"), 1);
    }

    #[tokio::test]
    async fn read_text_falls_back_to_value() {
        let (driver, store, ctx) = setup();
        driver.add_element(
            LocatorStrategy::Id,
            "go",
            MockElement::new().with_attribute("value", "typed"),
        );

        assert_eq!(ctx.read_text(&button()).await.unwrap(), "typed");
        assert_eq!(store.get("btn/text").unwrap(), "typed");
    }

    #[tokio::test]
    async fn check_is_noop_when_checked() {
        let (driver, store, ctx) = setup();
        let el = MockElement::new().with_selected(true);
        driver.add_element(LocatorStrategy::Id, "go", el.clone());

        ctx.perform_action(ElementAction::Check, &button()).await.unwrap();
        assert_eq!(el.clicks(), 0);
        assert_eq!(store.get("btn/check").unwrap(), "true");

        ctx.perform_action(ElementAction::Uncheck, &button()).await.unwrap();
        assert_eq!(el.clicks(), 1);
        assert!(!el.selected());
    }

    #[tokio::test]
    async fn wait_binding_sleeps() {
        let (driver, store, ctx) = setup();
        driver.add_element(LocatorStrategy::Id, "go", MockElement::new());
        store.set("btn/click/wait", "0.2");

        let started = Instant::now();
        ctx.perform_action(ElementAction::Click, &button()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn bad_wait_binding() {
        let (_driver, store, ctx) = setup();
        store.set("btn/click/wait", "soon");

        let err = ctx.bind_and_wait("btn", "click", "true").await.unwrap_err();
        assert!(matches!(err, WebStepError::InvalidBindingValue { ref key, .. } if key == "btn/click/wait"));
        assert_eq!(store.get("btn/click").unwrap(), "true");
    }

    #[tokio::test]
    async fn condition_blocks_until_truthy() {
        let (driver, store, ctx) = setup();
        store.set("btn/click/condition", "page ready");
        store.set("page ready/javascript", "document.readyState == 'complete'");
        driver.script_sequence(
            "document.readyState == 'complete'",
            vec![json!(false), json!("false"), json!(true)],
        );

        ctx.bind_and_wait("btn", "click", "true").await.unwrap();

        assert_eq!(store.get("btn/click").unwrap(), "true");
        assert_eq!(driver.executed_scripts().len(), 3);
    }

    #[tokio::test]
    async fn missing_condition_script_is_unbound() {
        let (_driver, store, ctx) = setup();
        store.set("btn/click/condition", "ghost");

        let err = ctx.bind_and_wait("btn", "click", "true").await.unwrap_err();
        assert!(matches!(err, WebStepError::UnboundAttribute { ref name } if name == "ghost/javascript"));
    }
}
