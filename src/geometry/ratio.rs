//! Slide geometry: the standard aspect-ratio table and custom `W:H` ratios.

use crate::common::unit::{relative_difference, scale_emu};
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Height used to derive the width of a custom `W:H` ratio (7.5in).
pub const CUSTOM_RATIO_BASE_HEIGHT_EMU: u64 = 6_858_000;

/// Relative tolerance for [`detect_aspect_ratio`].
pub const DETECTION_TOLERANCE: f64 = 0.01;

/// `p:sldSz/@type` for sizes with no named PowerPoint preset.
pub const SLIDE_SIZE_CUSTOM: &str = "custom";

struct StandardRatio {
    id: &'static str,
    width_emu: u64,
    height_emu: u64,
    slide_size_type: &'static str,
}

static STANDARD_RATIOS: &[StandardRatio] = &[
    StandardRatio {
        id: "16:9",
        width_emu: 12_192_000,
        height_emu: 6_858_000,
        slide_size_type: SLIDE_SIZE_CUSTOM,
    },
    StandardRatio {
        id: "4:3",
        width_emu: 9_144_000,
        height_emu: 6_858_000,
        slide_size_type: "screen4x3",
    },
    StandardRatio {
        id: "16:10",
        width_emu: 9_144_000,
        height_emu: 5_715_000,
        slide_size_type: "screen16x10",
    },
    StandardRatio {
        id: "a4-landscape",
        width_emu: 10_692_000,
        height_emu: 7_560_000,
        slide_size_type: "A4",
    },
    StandardRatio {
        id: "letter-landscape",
        width_emu: 10_058_400,
        height_emu: 7_772_400,
        slide_size_type: SLIDE_SIZE_CUSTOM,
    },
];

/// Ids of the built-in ratios, in table order.
pub fn standard_ratio_ids() -> impl Iterator<Item = &'static str> {
    STANDARD_RATIOS.iter().map(|r| r.id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    fn of(width: u64, height: u64) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self::Landscape,
            std::cmp::Ordering::Less => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Square,
        }
    }
}

/// Slide dimensions for one aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatioSpec {
    pub id: String,
    pub width_emu: u64,
    pub height_emu: u64,
    pub orientation: Orientation,
    pub slide_size_type: String,
}

impl AspectRatioSpec {
    /// A ratio with explicit dimensions. Both must be non-zero.
    pub fn new(id: impl Into<String>, width_emu: u64, height_emu: u64) -> Result<Self> {
        let id = id.into();
        if width_emu == 0 || height_emu == 0 {
            return Err(Error::InvalidAspectRatio(format!(
                "{} has zero dimension ({}x{})",
                id, width_emu, height_emu
            )));
        }
        Ok(Self {
            id,
            width_emu,
            height_emu,
            orientation: Orientation::of(width_emu, height_emu),
            slide_size_type: SLIDE_SIZE_CUSTOM.to_string(),
        })
    }

    /// Look up a built-in ratio; the id is normalized first.
    pub fn standard(id: &str) -> Option<Self> {
        let id = normalize_ratio_id(id);
        STANDARD_RATIOS.iter().find(|r| r.id == id).map(|r| Self {
            id: r.id.to_string(),
            width_emu: r.width_emu,
            height_emu: r.height_emu,
            orientation: Orientation::of(r.width_emu, r.height_emu),
            slide_size_type: r.slide_size_type.to_string(),
        })
    }

    /// Parse a custom `W:H` ratio against the fixed height baseline.
    pub fn custom(id: &str) -> Result<Self> {
        let normalized = normalize_ratio_id(id);
        let (w, h) = normalized
            .split_once(':')
            .ok_or_else(|| Error::UnknownAspectRatio(id.to_string()))?;

        let width = match (parse_u64(w), parse_u64(h)) {
            (Some(w), Some(h)) if w > 0 && h > 0 => scale_emu(CUSTOM_RATIO_BASE_HEIGHT_EMU, w, h),
            (Some(_), Some(_)) => None,
            _ => {
                let w: f64 = w.parse().map_err(|_| Error::UnknownAspectRatio(id.to_string()))?;
                let h: f64 = h.parse().map_err(|_| Error::UnknownAspectRatio(id.to_string()))?;
                if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() {
                    Some((CUSTOM_RATIO_BASE_HEIGHT_EMU as f64 * w / h).round() as u64)
                } else {
                    None
                }
            },
        };
        let width = width.ok_or_else(|| Error::InvalidAspectRatio(id.to_string()))?;
        Self::new(normalized, width, CUSTOM_RATIO_BASE_HEIGHT_EMU)
    }

    /// Standard table first, then a custom `W:H`.
    pub fn lookup(id: &str) -> Result<Self> {
        match Self::standard(id) {
            Some(spec) => Ok(spec),
            None => Self::custom(id),
        }
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        self.width_emu as f64 / self.height_emu as f64
    }
}

#[inline]
fn parse_u64(s: &str) -> Option<u64> {
    atoi_simd::parse::<u64, false, false>(s.as_bytes()).ok()
}

/// Canonical form of a ratio id: lowercase, trimmed, with spaces and
/// underscores folded to `-` (`"A4 landscape"` becomes `a4-landscape`).
pub fn normalize_ratio_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut pending_dash = false;
    for c in id.trim().chars() {
        match c {
            ' ' | '_' | '-' | '\t' => pending_dash = true,
            c => {
                if pending_dash && !out.is_empty() && !out.ends_with(':') && c != ':' {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            },
        }
    }
    out
}

/// Match slide dimensions to a standard ratio id.
///
/// The closest ratio within [`DETECTION_TOLERANCE`] wins.
pub fn detect_aspect_ratio(width_emu: u64, height_emu: u64) -> Option<&'static str> {
    if width_emu == 0 || height_emu == 0 {
        return None;
    }
    let actual = width_emu as f64 / height_emu as f64;

    STANDARD_RATIOS
        .iter()
        .map(|r| (r.id, relative_difference(actual, r.width_emu as f64 / r.height_emu as f64)))
        .filter(|(_, diff)| *diff <= DETECTION_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
