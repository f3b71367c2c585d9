//! Unit conversion utilities.
//!
//! Office geometry is expressed in EMUs (English Metric Units). Slide sizes,
//! paper sizes and custom ratios are all computed here so every component
//! rounds the same way.

pub const EMUS_PER_INCH: u64 = 914_400;
pub const EMUS_PER_CM: u64 = 360_000;
pub const EMUS_PER_MM: u64 = 36_000;
pub const EMUS_PER_PT: u64 = 12_700;

#[inline]
pub fn inches_to_emu(inches: f64) -> u64 {
    (inches * EMUS_PER_INCH as f64).round() as u64
}

#[inline]
pub fn mm_to_emu(mm: f64) -> u64 {
    (mm * EMUS_PER_MM as f64).round() as u64
}

#[inline]
pub fn pt_to_emu(pt: f64) -> u64 {
    (pt * EMUS_PER_PT as f64).round() as u64
}

#[inline]
pub fn emu_to_inches(emu: u64) -> f64 {
    emu as f64 / EMUS_PER_INCH as f64
}

#[inline]
pub fn emu_to_mm(emu: u64) -> f64 {
    emu as f64 / EMUS_PER_MM as f64
}

/// Scale `base` by `numerator / denominator`, rounding to the nearest EMU.
///
/// Integer arithmetic in `u128` so large slide sizes never lose precision.
#[inline]
pub fn scale_emu(base: u64, numerator: u64, denominator: u64) -> Option<u64> {
    if denominator == 0 {
        return None;
    }
    let scaled = (base as u128 * numerator as u128 + denominator as u128 / 2) / denominator as u128;
    u64::try_from(scaled).ok()
}

/// Relative difference `|a - b| / b`.
#[inline]
pub fn relative_difference(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return f64::INFINITY;
    }
    ((a - b) / b).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_and_mm_conversions() {
        assert_eq!(inches_to_emu(13.333_333_333), 12_192_000);
        assert_eq!(inches_to_emu(7.5), 6_858_000);
        assert_eq!(mm_to_emu(297.0), 10_692_000);
        assert_eq!(mm_to_emu(210.0), 7_560_000);
        assert_eq!(pt_to_emu(1.0), 12_700);
        assert!((emu_to_inches(914_400) - 1.0).abs() < f64::EPSILON);
        assert!((emu_to_mm(36_000) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scale_emu() {
        assert_eq!(scale_emu(6_858_000, 16, 9), Some(12_192_000));
        assert_eq!(scale_emu(6_858_000, 4, 3), Some(9_144_000));
        assert_eq!(scale_emu(6_858_000, 1, 0), None);
    }

    #[test]
    fn test_relative_difference() {
        assert!(relative_difference(1.0, 1.0) < 1e-12);
        assert!((relative_difference(1.01, 1.0) - 0.01).abs() < 1e-9);
        assert!(relative_difference(1.0, 0.0).is_infinite());
    }
}
