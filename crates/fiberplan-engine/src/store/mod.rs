//! Diagram persistence: remote API, local fallback cache, debounced autosave.

mod api;
mod cache;
mod debounce;
mod diagram_store;
mod error;

pub use api::*;
pub use cache::*;
pub use debounce::*;
pub use diagram_store::*;
pub use error::*;
