//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - WEB-000-009: Attribute resolution errors
//! - WEB-010-019: Locator binding errors
//! - WEB-020-029: Element interaction errors
//! - WEB-030-039: Wait errors
//! - WEB-040-049: Interpolation/binding value errors
//! - WEB-050-059: Configuration and bindings file errors
//! - WEB-090-099: IO errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebStepError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum WebStepError {
    // ═══════════════════════════════════════════
    // RESOLUTION ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[WEB-001] Unbound attribute: '{name}'")]
    UnboundAttribute { name: String },

    // ═══════════════════════════════════════════
    // LOCATOR ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[WEB-010] Locator binding not found: '{name}/locator'")]
    LocatorBindingNotFound { name: String },

    #[error("[WEB-011] Locator lookup not found: '{name}/locator/{strategy}'")]
    LocatorLookupNotFound { name: String, strategy: String },

    #[error("[WEB-012] Unsupported locator strategy '{strategy}' for element '{name}'")]
    InvalidLocatorStrategy { name: String, strategy: String },

    // ═══════════════════════════════════════════
    // ELEMENT ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[WEB-020] Element '{name}' not found: {reason}")]
    ElementNotFound { name: String, reason: String },

    #[error("[WEB-021] Could not interact with element '{name}': {reason}")]
    ElementInteractionFailed { name: String, reason: String },

    #[error("[WEB-022] Driver error: {reason}")]
    Driver { reason: String },

    // ═══════════════════════════════════════════
    // WAIT ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[WEB-030] Timed out waiting for {reason}")]
    WaitTimeout { reason: String },

    #[error("[WEB-031] Invalid wait: {reason}")]
    InvalidWait { reason: String },

    // ═══════════════════════════════════════════
    // INTERPOLATION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[WEB-040] Circular reference while interpolating '{name}'")]
    CircularReference { name: String },

    #[error("[WEB-041] Invalid value '{value}' bound to '{key}'")]
    InvalidBindingValue { key: String, value: String },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[WEB-050] Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("[WEB-051] Invalid bindings file '{path}': {reason}")]
    BindingsFile { path: String, reason: String },

    // ═══════════════════════════════════════════
    // IO ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[WEB-090] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebStepError {
    /// Error code without brackets (e.g. `WEB-001`)
    pub fn code(&self) -> &'static str {
        match self {
            WebStepError::UnboundAttribute { .. } => "WEB-001",
            WebStepError::LocatorBindingNotFound { .. } => "WEB-010",
            WebStepError::LocatorLookupNotFound { .. } => "WEB-011",
            WebStepError::InvalidLocatorStrategy { .. } => "WEB-012",
            WebStepError::ElementNotFound { .. } => "WEB-020",
            WebStepError::ElementInteractionFailed { .. } => "WEB-021",
            WebStepError::Driver { .. } => "WEB-022",
            WebStepError::WaitTimeout { .. } => "WEB-030",
            WebStepError::InvalidWait { .. } => "WEB-031",
            WebStepError::CircularReference { .. } => "WEB-040",
            WebStepError::InvalidBindingValue { .. } => "WEB-041",
            WebStepError::ConfigError { .. } => "WEB-050",
            WebStepError::BindingsFile { .. } => "WEB-051",
            WebStepError::Io(_) => "WEB-090",
        }
    }
}

impl FixSuggestion for WebStepError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            WebStepError::UnboundAttribute { .. } => {
                Some("Bind the name first, or define it under [settings] in config.toml")
            }
            WebStepError::LocatorBindingNotFound { .. } => {
                Some("Add '<name>/locator: <strategy>' to the bindings")
            }
            WebStepError::LocatorLookupNotFound { .. } => {
                Some("Add '<name>/locator/<strategy>: <expression>' matching the declared strategy")
            }
            WebStepError::InvalidLocatorStrategy { .. } => Some(
                "Use one of: id, name, css selector, xpath, class name, tag name, link text, partial link text, javascript",
            ),
            WebStepError::ElementNotFound { .. } => {
                Some("Check the locator expression against the current page")
            }
            WebStepError::ElementInteractionFailed { .. } => {
                Some("The element kept going stale; add a '<name>/<action>/condition' wait before acting")
            }
            WebStepError::Driver { .. } => Some("Check the browser session is still alive"),
            WebStepError::WaitTimeout { .. } => {
                Some("Increase wait.timeout_secs or check the condition script")
            }
            WebStepError::InvalidWait { .. } => Some("Use a timeout greater than zero"),
            WebStepError::CircularReference { .. } => {
                Some("A binding refers back to itself through its placeholders")
            }
            WebStepError::InvalidBindingValue { .. } => {
                Some("Wait bindings take a number of seconds, e.g. 2 or 0.5")
            }
            WebStepError::ConfigError { .. } => Some("Check config.toml syntax"),
            WebStepError::BindingsFile { .. } => {
                Some("Bindings files map scope names to flat 'key: value' tables")
            }
            WebStepError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
