//! Store Module - scoped binding storage
//!
//! Key types:
//! - `ScopedStore`: stack of scopes, global at the bottom
//! - `Scope`: one named frame of key/value bindings
//! - `BindingKey`: structured `base/segment/...` key

mod key;
mod loader;
mod scope;

// Re-export all public types
pub use key::{BindingKey, KEY_SEPARATOR};
pub use scope::{Scope, ScopedStore, GLOBAL_SCOPE};
