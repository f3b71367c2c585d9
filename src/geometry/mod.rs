//! Aspect ratios and per-ratio token selection.

pub mod ratio;
pub mod resolver;

pub use ratio::{AspectRatioSpec, Orientation, detect_aspect_ratio, normalize_ratio_id};
pub use resolver::{AspectRatioResolver, MissingRatioPolicy};
