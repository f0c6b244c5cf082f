//! Binding Module - names to values
//!
//! Handles everything a step needs to turn a bound name into a value:
//! - `locator`: element name to strategy + expression
//! - `kind`: which binding kind a name has, probed in fixed order
//! - `resolve`: the resolution cascade with placeholder soft-fail
//! - `template`: `$name` / `${name}` / `$[javascript:...]` interpolation
//!
//! Key layout:
//! ```yaml
//! search field/locator: css selector
//! search field/locator/css selector: input[name=q]
//! title/javascript: document.title
//! order/regex/expression: "#(\\d+)"
//! order/regex/source: banner
//! ```
//!
//! Data flow:
//! ```text
//! step text → interpolate (template)
//!                  ↓
//!          resolve_bound_value ──→ live text (actuator)
//!                  ↓
//!          resolve_attribute (kind probing)
//!                  ↓
//!               settings
//! ```

mod kind;
mod locator;
pub(crate) mod resolve;
mod template;

// Re-export public types
pub use kind::{BindingKind, Probe, PROBE_ORDER};
pub use locator::{check_locator_bindings, LocatorBinding, LocatorStrategy};
pub use resolve::Placeholder;
pub use template::{tokenize, TemplateCache, Token, TEMPLATE_CACHE, TEMPLATE_CACHE_CAPACITY};
