//! SuperTheme package assembly.

use crate::common::{Error, Result};
use crate::ooxml::opc::constants::{content_type as CT, relationship_type as RT};
use crate::ooxml::opc::{DocumentPart, OpcPackage, PackURI};
use crate::supertheme::generator::SuperThemePackage;
use crate::supertheme::layout;
use crate::supertheme::variant::ThemeVariant;

/// Lays a [`SuperThemePackage`] out as an OPC package and serializes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageAssembler;

impl PackageAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build the in-memory package. The root theme and presentation are the
    /// first surviving variant's.
    pub fn build(&self, package: &SuperThemePackage) -> Result<OpcPackage> {
        let primary = package
            .primary()
            .ok_or_else(|| Error::integrity(layout::VARIANT_MANAGER, "SuperTheme has no variants"))?;

        let mut opc = OpcPackage::new();
        let root = OpcPackage::root_uri();

        let root_theme = PackURI::new(layout::ROOT_THEME)?;
        let root_presentation = PackURI::new(layout::ROOT_PRESENTATION)?;
        add_theme_pair(&mut opc, primary, &root_theme, &root_presentation)?;
        opc.relate(&root, RT::OFFICE_DOCUMENT, &root_theme);

        let manager = PackURI::new(layout::VARIANT_MANAGER)?;
        opc.add_part(DocumentPart::xml(
            manager.clone(),
            package.manager_xml()?,
            CT::THEME_VARIANT_MANAGER,
        ))?;
        opc.relate(&root, RT::THEME_VARIANT_MANAGER, &manager);

        for variant in package.variants() {
            let theme = PackURI::new(layout::variant_theme(variant.variant_id))?;
            let presentation = PackURI::new(layout::variant_presentation(variant.variant_id))?;
            add_theme_pair(&mut opc, variant, &theme, &presentation)?;

            let variant_root = PackURI::package_root(&layout::variant_dir(variant.variant_id))?;
            opc.relate(&variant_root, RT::OFFICE_DOCUMENT, &theme);
            opc.relate_with_id(
                &manager,
                RT::THEME_VARIANT,
                &theme,
                &layout::variant_r_id(variant.variant_id),
            );
        }

        opc.check_integrity()?;
        Ok(opc)
    }

    /// Build and serialize to `.thmx` bytes.
    pub fn assemble(&self, package: &SuperThemePackage) -> Result<Vec<u8>> {
        let opc = self.build(package)?;
        let bytes = opc.to_bytes()?;
        tracing::info!(
            "assembled SuperTheme: {} variant(s), {} part(s), {} byte(s)",
            package.variants().len(),
            opc.part_count(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Add a variant's theme and presentation parts, relating the presentation
/// to its theme.
fn add_theme_pair(
    opc: &mut OpcPackage,
    variant: &ThemeVariant,
    theme: &PackURI,
    presentation: &PackURI,
) -> Result<()> {
    opc.add_part(DocumentPart::xml(theme.clone(), variant.theme_xml.clone(), CT::OFC_THEME))?;
    opc.add_part(DocumentPart::xml(
        presentation.clone(),
        variant.presentation_xml.clone(),
        CT::PML_PRESENTATION_MAIN,
    ))?;
    opc.relate(presentation, RT::THEME, theme);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supertheme::SuperThemeGenerator;
    use crate::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};

    fn generate(names: &[&str], ratios: &[&str]) -> SuperThemePackage {
        let designs: Vec<_> = names
            .iter()
            .map(|name| {
                let layer = TokenLayer::from_json_str(*name, LayerKind::Core, r##"{"colors": {"primary": "#336699"}}"##)
                    .unwrap();
                let tokens = TokenResolver::new()
                    .resolve(&[layer], &ResolutionContext::new())
                    .unwrap();
                (name.to_string(), tokens)
            })
            .collect();
        let ratios: Vec<String> = ratios.iter().map(|r| r.to_string()).collect();
        SuperThemeGenerator::default().generate(&designs, &ratios).unwrap()
    }

    #[test]
    fn test_layout() {
        let package = generate(&["Acme", "Globex"], &["16:9", "4:3"]);
        let opc = PackageAssembler::new().build(&package).unwrap();

        // root theme + presentation, manager, 4 x (theme + presentation)
        assert_eq!(opc.part_count(), 11);
        let manager = PackURI::new(layout::VARIANT_MANAGER).unwrap();
        let rels = opc.rels_for(&manager).unwrap();
        assert_eq!(rels.len(), 4);
        assert_eq!(rels.get("rId3").unwrap().target_ref(), "variant3/theme/theme/theme1.xml");

        let types = opc.content_types();
        assert_eq!(types.override_for(layout::VARIANT_MANAGER), Some(CT::THEME_VARIANT_MANAGER));
        assert_eq!(types.override_for("/themeVariants/variant4/theme/theme/theme1.xml"), Some(CT::OFC_THEME));
        assert_eq!(types.override_for(layout::ROOT_PRESENTATION), Some(CT::PML_PRESENTATION_MAIN));

        let variant_root = PackURI::package_root(&layout::variant_dir(2)).unwrap();
        assert_eq!(
            opc.rels_for(&variant_root).unwrap().get("rId1").unwrap().target_ref(),
            "theme/theme/theme1.xml"
        );
    }

    #[test]
    fn test_deterministic_bytes() {
        let first = PackageAssembler::new().assemble(&generate(&["Acme"], &["16:9", "4:3"])).unwrap();
        let second = PackageAssembler::new().assemble(&generate(&["Acme"], &["16:9", "4:3"])).unwrap();
        assert_eq!(first, second);

        let members = crate::ooxml::opc::PhysPkgReader::new(&first).unwrap().member_names();
        assert_eq!(members[0], "[Content_Types].xml");
        assert!(members.contains(&"themeVariants/variant2/_rels/.rels".to_string()));
        assert!(members.contains(&"theme/_rels/presentation.xml.rels".to_string()));
        assert!(members.contains(&"themeVariants/variant1/theme/_rels/presentation.xml.rels".to_string()));
    }
}
