//! Baseline template patching.
//!
//! A [`PatchPlan`] maps package parts to ordered patch operations whose
//! strings may reference tokens. [`TemplateBuilder`] interpolates the plan,
//! runs it through the patch engine part by part and writes the package
//! back with every original member.

pub mod builder;
pub mod plan;

pub use builder::{PackageKind, TemplateBuilder, TemplateReport};
pub use plan::{PatchPlan, interpolate};
