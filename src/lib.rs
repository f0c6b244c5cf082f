//! webstep - name resolution and resilient element actions for web test steps
//!
//! Layers, leaves first:
//! - `store`: scoped key/value bindings (`name/locator`, `name/text`, ...)
//! - `binding`: locator bindings, binding kinds, resolution and interpolation
//! - `actuator`: locate-act-retry element actions with post-action waits
//! - `wait`: poll-until-true with a typed timeout
//!
//! The browser and every other external capability sit behind traits
//! (`driver`, `capability`); `WebContext` ties one run together.

pub mod actuator;
pub mod binding;
pub mod capability;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod store;
pub mod wait;

pub use actuator::{ElementAction, ScrollEdge, SelectBy};
pub use binding::{BindingKind, LocatorBinding, LocatorStrategy, Placeholder};
pub use config::WebConfig;
pub use context::{WebContext, WebContextBuilder, MAX_INTERPOLATION_DEPTH};
pub use driver::{DriverError, OfflineDriver, WebDriver, WebElement};
pub use error::{FixSuggestion, Result, WebStepError};
pub use store::{BindingKey, ScopedStore};
pub use wait::{WaitCoordinator, WaitSpec};
