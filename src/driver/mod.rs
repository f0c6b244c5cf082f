//! Driver Module - browser automation seams
//!
//! The crate never talks to a browser directly. Everything live goes through
//! two object-safe traits:
//! - `WebDriver`: locate elements, execute scripts
//! - `WebElement`: read and act on one located element
//!
//! Implementations raise `DriverError`; the actuator only needs to tell an
//! interaction fault (stale, not interactable, intercepted) from the rest.

#[cfg(any(test, feature = "test-fixtures"))]
pub mod mock;
mod offline;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::binding::LocatorStrategy;

pub use offline::OfflineDriver;

/// WebDriver key code for Enter
pub const ENTER_KEY: &str = "\u{E007}";

/// Errors reported by a driver implementation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// Element reference is no longer attached to the DOM
    #[error("stale element reference: {0}")]
    Stale(String),

    /// Element exists but cannot receive the interaction
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// Another element would receive the click
    #[error("element click intercepted: {0}")]
    Intercepted(String),

    /// No element matched the locator
    #[error("no such element: {0}")]
    NotFound(String),

    /// Script raised or returned something unusable
    #[error("script error: {0}")]
    Script(String),

    /// Session or transport failure
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Faults worth one re-locate and retry
    pub fn is_interaction_fault(&self) -> bool {
        matches!(
            self,
            DriverError::Stale(_) | DriverError::NotInteractable(_) | DriverError::Intercepted(_)
        )
    }
}

/// A live browser session
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Find one element by strategy and expression
    async fn locate(
        &self,
        strategy: LocatorStrategy,
        expression: &str,
    ) -> Result<Box<dyn WebElement>, DriverError>;

    /// Execute a script in the page.
    ///
    /// When `element` is given it is passed to the script as `arguments[0]`.
    async fn execute_script(
        &self,
        script: &str,
        element: Option<&dyn WebElement>,
    ) -> Result<Value, DriverError>;
}

/// A located page element
#[async_trait]
pub trait WebElement: Send + Sync {
    /// Visible text
    async fn text(&self) -> Result<String, DriverError>;

    /// Attribute or property value, `None` when unset
    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError>;

    async fn click(&self) -> Result<(), DriverError>;

    async fn double_click(&self) -> Result<(), DriverError>;

    async fn submit(&self) -> Result<(), DriverError>;

    async fn send_keys(&self, keys: &str) -> Result<(), DriverError>;

    async fn clear(&self) -> Result<(), DriverError>;

    async fn is_selected(&self) -> Result<bool, DriverError>;

    /// Select the dropdown option whose visible text matches
    async fn select_by_text(&self, text: &str) -> Result<(), DriverError>;

    /// Select the dropdown option whose value attribute matches
    async fn select_by_value(&self, value: &str) -> Result<(), DriverError>;

    /// Select the dropdown option at a zero-based index
    async fn select_by_index(&self, index: usize) -> Result<(), DriverError>;

    /// Visible text of the first selected option
    async fn selected_text(&self) -> Result<String, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_faults() {
        assert!(DriverError::Stale("x".into()).is_interaction_fault());
        assert!(DriverError::NotInteractable("x".into()).is_interaction_fault());
        assert!(DriverError::Intercepted("x".into()).is_interaction_fault());
        assert!(!DriverError::NotFound("x".into()).is_interaction_fault());
        assert!(!DriverError::Script("x".into()).is_interaction_fault());
    }

    #[test]
    fn enter_key_is_webdriver_code_point() {
        assert_eq!(ENTER_KEY.chars().next(), Some('\u{E007}'));
    }
}
