//! Part names of a SuperTheme package.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! theme/theme/theme1.xml
//! theme/presentation.xml
//! theme/_rels/presentation.xml.rels
//! themeVariants/themeVariantManager.xml
//! themeVariants/_rels/themeVariantManager.xml.rels
//! themeVariants/variantN/_rels/.rels
//! themeVariants/variantN/theme/theme/theme1.xml
//! themeVariants/variantN/theme/presentation.xml
//! themeVariants/variantN/theme/_rels/presentation.xml.rels
//! ```

pub const ROOT_THEME: &str = "/theme/theme/theme1.xml";
pub const ROOT_PRESENTATION: &str = "/theme/presentation.xml";
pub const VARIANT_MANAGER: &str = "/themeVariants/themeVariantManager.xml";
pub const VARIANT_MANAGER_RELS: &str = "/themeVariants/_rels/themeVariantManager.xml.rels";
pub const VARIANTS_DIR: &str = "/themeVariants";

/// Directory of one variant, e.g. `/themeVariants/variant3`.
pub fn variant_dir(variant_id: u32) -> String {
    format!("{}/variant{}", VARIANTS_DIR, variant_id)
}

pub fn variant_theme(variant_id: u32) -> String {
    format!("{}/theme/theme/theme1.xml", variant_dir(variant_id))
}

pub fn variant_presentation(variant_id: u32) -> String {
    format!("{}/theme/presentation.xml", variant_dir(variant_id))
}

/// Package-relationships part of a variant's nested package root.
pub fn variant_rels(variant_id: u32) -> String {
    format!("{}/_rels/.rels", variant_dir(variant_id))
}

pub fn variant_presentation_rels(variant_id: u32) -> String {
    format!("{}/theme/_rels/presentation.xml.rels", variant_dir(variant_id))
}

/// Relationship id of a variant in the manager's `.rels`. Tied to the
/// variant id so omitted variants leave gaps instead of shifting ids.
pub fn variant_r_id(variant_id: u32) -> String {
    format!("rId{}", variant_id)
}

/// The variant number encoded in a part name under `themeVariants/`.
pub fn variant_id_of(partname: &str) -> Option<u32> {
    let rest = partname.strip_prefix(VARIANTS_DIR)?.strip_prefix("/variant")?;
    let end = rest.find('/')?;
    atoi_simd::parse::<u32, false, false>(rest[..end].as_bytes()).ok()
}
