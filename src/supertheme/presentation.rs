//! Presentation part generation for theme variants.
//!
//! A variant's `presentation.xml` only has to carry the slide size; the
//! notes size is fixed at portrait letter.

use crate::common::Result;
use crate::geometry::AspectRatioSpec;
use crate::ooxml::opc::constants::namespace;
use std::fmt::Write as FmtWrite;

/// Notes page size in EMUs (7.5" x 10").
pub const NOTES_WIDTH_EMU: u64 = 6_858_000;
pub const NOTES_HEIGHT_EMU: u64 = 9_144_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationBuilder {
    slide_width: u64,
    slide_height: u64,
    slide_size_type: String,
}

impl PresentationBuilder {
    /// Presentation sized for `spec`.
    pub fn for_ratio(spec: &AspectRatioSpec) -> Self {
        Self {
            slide_width: spec.width_emu,
            slide_height: spec.height_emu,
            slide_size_type: spec.slide_size_type.clone(),
        }
    }

    #[inline]
    pub fn slide_width(&self) -> u64 {
        self.slide_width
    }

    #[inline]
    pub fn slide_height(&self) -> u64 {
        self.slide_height
    }

    /// Generate presentation.xml content.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            xml,
            r#"<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">"#,
            namespace::DML_MAIN,
            namespace::OFC_RELATIONSHIPS,
            namespace::PML_MAIN
        )?;
        write!(
            xml,
            r#"<p:sldSz cx="{}" cy="{}" type="{}"/>"#,
            self.slide_width, self.slide_height, self.slide_size_type
        )?;
        write!(xml, r#"<p:notesSz cx="{}" cy="{}"/>"#, NOTES_WIDTH_EMU, NOTES_HEIGHT_EMU)?;
        xml.push_str("</p:presentation>");
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_size() {
        let spec = AspectRatioSpec::lookup("16:9").unwrap();
        let xml = PresentationBuilder::for_ratio(&spec).to_xml().unwrap();
        assert!(xml.contains(r#"<p:sldSz cx="12192000" cy="6858000""#));
        assert!(xml.contains(r#"<p:notesSz cx="6858000" cy="9144000"/>"#));
        assert!(xml.contains(&format!(r#"type="{}""#, spec.slide_size_type)));
    }

    #[test]
    fn test_custom_ratio() {
        let spec = AspectRatioSpec::lookup("21:9").unwrap();
        let builder = PresentationBuilder::for_ratio(&spec);
        assert_eq!(builder.slide_height(), 6_858_000);
        assert_eq!(builder.slide_width(), 16_002_000);
        assert!(builder.to_xml().unwrap().contains(r#"type="custom""#));
    }
}
