//! Engine and size presets for managed database instances.
//!
//! The catalog is an immutable value built once per run, either from the
//! builtin tables or from a TOML file, and passed to the generator.

mod builtin;
mod types;

pub use types::{Catalog, CatalogError, EngineProfile, SizeProfile};
