//! Web step context - everything one run resolves and acts against
//!
//! `WebContext` owns the scoped store, the driver session and the pluggable
//! capabilities (XPath, regex, settings, screenshots). Resolution, the
//! actuator and waits are all methods on it, so one context equals one run:
//! parallel runs build independent contexts.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::capability::{
    ConfigSettings, NoXPath, PatternExtractor, RegexExtractor, ScreenshotCapture, Settings,
    XPathEvaluator,
};
use crate::config::WebConfig;
use crate::driver::WebDriver;
use crate::error::{Result, WebStepError};
use crate::store::ScopedStore;
use crate::wait::WaitCoordinator;

/// Maximum nesting of placeholder expansion
pub const MAX_INTERPOLATION_DEPTH: usize = 32;

/// Resolution and interaction context for one run
pub struct WebContext {
    store: Arc<ScopedStore>,
    driver: Arc<dyn WebDriver>,
    xpath: Arc<dyn XPathEvaluator>,
    regex: Arc<dyn RegexExtractor>,
    settings: Arc<dyn Settings>,
    screenshots: Option<Arc<dyn ScreenshotCapture>>,
    config: WebConfig,
    waits: WaitCoordinator,
    /// Names currently being expanded, innermost last
    expanding: Mutex<Vec<String>>,
}

impl WebContext {
    pub fn builder(driver: Arc<dyn WebDriver>) -> WebContextBuilder {
        WebContextBuilder::new(driver)
    }

    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    pub fn driver(&self) -> &Arc<dyn WebDriver> {
        &self.driver
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn waits(&self) -> &WaitCoordinator {
        &self.waits
    }

    pub(crate) fn xpath(&self) -> &dyn XPathEvaluator {
        self.xpath.as_ref()
    }

    pub(crate) fn regex(&self) -> &dyn RegexExtractor {
        self.regex.as_ref()
    }

    pub(crate) fn settings(&self) -> &dyn Settings {
        self.settings.as_ref()
    }

    /// Capture a screenshot if enabled. Failures are logged, never returned.
    pub(crate) async fn capture_screenshot(&self, label: &str) {
        if !self.config.screenshots.enabled {
            return;
        }
        let Some(capture) = &self.screenshots else {
            return;
        };
        match capture.capture(label).await {
            Ok(handle) => debug!(label, handle = %handle, "screenshot captured"),
            Err(e) => warn!(label, error = %e, "screenshot capture failed"),
        }
    }

    /// Mark `name` as being expanded until the guard drops.
    ///
    /// Fails with `CircularReference` if `name` is already on the expansion
    /// stack or the stack is `MAX_INTERPOLATION_DEPTH` deep.
    pub(crate) fn enter_expansion(&self, name: &str) -> Result<ExpansionGuard<'_>> {
        let mut expanding = self.expanding.lock();
        if expanding.len() >= MAX_INTERPOLATION_DEPTH || expanding.iter().any(|n| n == name) {
            warn!(name, chain = %expanding.join(" -> "), "circular reference");
            return Err(WebStepError::CircularReference {
                name: name.to_string(),
            });
        }
        expanding.push(name.to_string());
        Ok(ExpansionGuard { ctx: self })
    }
}

/// Pops the innermost expanding name on drop
pub(crate) struct ExpansionGuard<'a> {
    ctx: &'a WebContext,
}

impl Drop for ExpansionGuard<'_> {
    fn drop(&mut self) {
        self.ctx.expanding.lock().pop();
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Fluent builder for `WebContext`
pub struct WebContextBuilder {
    driver: Arc<dyn WebDriver>,
    store: Option<Arc<ScopedStore>>,
    config: WebConfig,
    xpath: Option<Arc<dyn XPathEvaluator>>,
    regex: Option<Arc<dyn RegexExtractor>>,
    settings: Option<Arc<dyn Settings>>,
    screenshots: Option<Arc<dyn ScreenshotCapture>>,
}

impl WebContextBuilder {
    pub fn new(driver: Arc<dyn WebDriver>) -> Self {
        Self {
            driver,
            store: None,
            config: WebConfig::default(),
            xpath: None,
            regex: None,
            settings: None,
            screenshots: None,
        }
    }

    /// Share an existing store (default: a fresh one)
    pub fn store(mut self, store: Arc<ScopedStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: WebConfig) -> Self {
        self.config = config;
        self
    }

    pub fn xpath(mut self, xpath: Arc<dyn XPathEvaluator>) -> Self {
        self.xpath = Some(xpath);
        self
    }

    pub fn regex(mut self, regex: Arc<dyn RegexExtractor>) -> Self {
        self.regex = Some(regex);
        self
    }

    /// Replace the settings source (default: `[settings]` then environment)
    pub fn settings(mut self, settings: Arc<dyn Settings>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn screenshots(mut self, capture: Arc<dyn ScreenshotCapture>) -> Self {
        self.screenshots = Some(capture);
        self
    }

    pub fn build(self) -> WebContext {
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(ConfigSettings::new(self.config.settings.clone())));
        WebContext {
            store: self.store.unwrap_or_default(),
            driver: self.driver,
            xpath: self.xpath.unwrap_or_else(|| Arc::new(NoXPath)),
            regex: self.regex.unwrap_or_else(|| Arc::new(PatternExtractor)),
            settings,
            screenshots: self.screenshots,
            waits: WaitCoordinator::new(self.config.poll_interval()),
            config: self.config,
            expanding: Mutex::new(Vec::new()),
        }
    }
}
