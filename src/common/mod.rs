//! Common types and utilities shared across components.
//!
//! Errors, deterministic identifiers, EMU unit conversion and XML escaping
//! live here so the token, patch and packaging layers agree on them.

// Submodule declarations
pub mod error;
pub mod id;
pub mod unit;
pub mod xml;

// Re-exports for convenience
pub use error::{Component, Error, Result};
pub use id::guid_for;
