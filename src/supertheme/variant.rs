//! Theme variants and the outcome of generating them.

use crate::geometry::AspectRatioSpec;
use serde::{Deserialize, Serialize};

/// What to do when one `(design, ratio)` variant fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantRecovery {
    /// Abort on the first failed variant in variant-id order
    #[default]
    FailFast,
    /// Drop failed variants and record them as omissions
    Continue,
}

/// One design at one slide size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeVariant {
    /// `design_index * ratio_count + ratio_index + 1`
    pub variant_id: u32,
    pub design_name: String,
    pub aspect_ratio_id: String,
    /// Design-group GUID, shared by every ratio of the design
    pub guid: String,
    pub dimensions: AspectRatioSpec,
    #[serde(skip)]
    pub theme_xml: String,
    #[serde(skip)]
    pub presentation_xml: String,
}

/// A variant dropped under [`VariantRecovery::Continue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantOmission {
    pub variant_id: u32,
    pub design: String,
    pub ratio: String,
    pub reason: String,
}

/// Positional variant id for a `(design, ratio)` pair.
#[inline]
pub fn variant_id(design_index: usize, ratio_index: usize, ratio_count: usize) -> u32 {
    (design_index * ratio_count + ratio_index + 1) as u32
}
