//! The SuperTheme variant manager part.
//!
//! `themeVariantManager.xml` lists every variant with its design GUID and
//! slide size; its `r:id`s resolve through
//! `themeVariants/_rels/themeVariantManager.xml.rels` to the variant themes.

use crate::common::Result;
use crate::common::xml::escape_xml;
use crate::ooxml::opc::constants::namespace;
use crate::supertheme::layout::variant_r_id;
use crate::supertheme::variant::ThemeVariant;
use std::fmt::Write as FmtWrite;

/// Generate `themeVariantManager.xml` for `variants`.
pub fn variant_manager_xml(variants: &[ThemeVariant]) -> Result<String> {
    let mut xml = String::with_capacity(256 + variants.len() * 192);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<t:themeVariantManager xmlns:t="{}" xmlns:r="{}">"#,
        namespace::THEMEML_2012,
        namespace::OFC_RELATIONSHIPS
    )?;
    xml.push_str("<t:themeVariantLst>");
    for variant in variants {
        write!(
            xml,
            r#"<t:themeVariant name="{}" vid="{}" cx="{}" cy="{}" r:id="{}"/>"#,
            escape_xml(&variant.design_name),
            variant.guid,
            variant.dimensions.width_emu,
            variant.dimensions.height_emu,
            variant_r_id(variant.variant_id)
        )?;
    }
    xml.push_str("</t:themeVariantLst></t:themeVariantManager>");
    Ok(xml)
}
