//! Offline driver - no browser session attached
//!
//! Used by the CLI to resolve bindings that need no live page. Every locate
//! fails with `NotFound` and every script fails, so dynamic bindings degrade to
//! their placeholders.

use async_trait::async_trait;
use serde_json::Value;

use crate::binding::LocatorStrategy;

use super::{DriverError, WebDriver, WebElement};

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineDriver;

#[async_trait]
impl WebDriver for OfflineDriver {
    async fn locate(
        &self,
        strategy: LocatorStrategy,
        expression: &str,
    ) -> Result<Box<dyn WebElement>, DriverError> {
        Err(DriverError::NotFound(format!(
            "no browser session ({} = {})",
            strategy, expression
        )))
    }

    async fn execute_script(
        &self,
        _script: &str,
        _element: Option<&dyn WebElement>,
    ) -> Result<Value, DriverError> {
        Err(DriverError::Script("no browser session".to_string()))
    }
}
