//! Unified error types for StyleStack.
//!
//! A single error enum covers token resolution, patching, generation,
//! packaging and validation so callers see one consistent API.

// Submodule declarations
pub mod types;

// Re-exports
pub use types::{Component, Error, Result};
