//! Multi-variant SuperTheme generation.

use crate::common::{Error, Result};
use crate::geometry::{AspectRatioResolver, AspectRatioSpec, normalize_ratio_id};
use crate::supertheme::context::GenerationContext;
use crate::supertheme::manager::variant_manager_xml;
use crate::supertheme::presentation::PresentationBuilder;
use crate::supertheme::theme::ThemeBuilder;
use crate::supertheme::variant::{ThemeVariant, VariantOmission, VariantRecovery, variant_id};
use crate::tokens::ResolvedTokens;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Generated variants plus the variants that were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperThemePackage {
    variants: Vec<ThemeVariant>,
    omissions: Vec<VariantOmission>,
}

impl SuperThemePackage {
    /// Surviving variants in variant-id order.
    #[inline]
    pub fn variants(&self) -> &[ThemeVariant] {
        &self.variants
    }

    #[inline]
    pub fn omissions(&self) -> &[VariantOmission] {
        &self.omissions
    }

    pub fn variant(&self, variant_id: u32) -> Option<&ThemeVariant> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }

    /// The variant used for the package's root theme.
    pub fn primary(&self) -> Option<&ThemeVariant> {
        self.variants.first()
    }

    pub fn manager_xml(&self) -> Result<String> {
        variant_manager_xml(&self.variants)
    }
}

/// Builds every `(design, ratio)` variant.
#[derive(Debug, Clone, Default)]
pub struct SuperThemeGenerator {
    resolver: AspectRatioResolver,
    recovery: VariantRecovery,
}

impl SuperThemeGenerator {
    pub fn new(resolver: AspectRatioResolver, recovery: VariantRecovery) -> Self {
        Self { resolver, recovery }
    }

    #[inline]
    pub fn recovery(&self) -> VariantRecovery {
        self.recovery
    }

    /// Generate variants for `designs` × `ratio_ids`, designs outer.
    ///
    /// Variant ids are positional and survive omissions unchanged.
    pub fn generate(&self, designs: &[(String, ResolvedTokens)], ratio_ids: &[String]) -> Result<SuperThemePackage> {
        if designs.is_empty() {
            return Err(Error::Config("no designs to generate".to_string()));
        }
        if ratio_ids.is_empty() {
            return Err(Error::Config("no aspect ratios to generate".to_string()));
        }
        check_unique(designs.iter().map(|(name, _)| name.clone()), "design name")?;
        check_unique(ratio_ids.iter().map(|r| normalize_ratio_id(r)), "aspect ratio")?;

        let context = GenerationContext::new();
        check_guids(&context, designs)?;
        let specs = ratio_ids
            .iter()
            .map(|id| context.dimensions(&self.resolver, id))
            .collect::<Result<Vec<AspectRatioSpec>>>()?;

        let ratio_count = ratio_ids.len();
        let total = designs.len() * ratio_count;
        tracing::debug!(
            "generating {} variant(s): {} design(s) x {} ratio(s)",
            total,
            designs.len(),
            ratio_count
        );

        let outcomes: Vec<Result<ThemeVariant>> = (0..total)
            .into_par_iter()
            .map(|index| {
                let (design_index, ratio_index) = (index / ratio_count, index % ratio_count);
                self.build_variant(&context, designs, design_index, &specs[ratio_index], ratio_count, ratio_index)
            })
            .collect();

        let mut variants = Vec::with_capacity(total);
        let mut omissions = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(variant) => variants.push(variant),
                Err(e) if self.recovery == VariantRecovery::FailFast => return Err(e),
                Err(e) => {
                    let (design, ratio) = (&designs[index / ratio_count].0, &ratio_ids[index % ratio_count]);
                    tracing::warn!("omitting variant '{}' @ '{}': {}", design, ratio, e);
                    omissions.push(VariantOmission {
                        variant_id: variant_id(index / ratio_count, index % ratio_count, ratio_count),
                        design: design.clone(),
                        ratio: ratio.clone(),
                        reason: e.to_string(),
                    });
                },
            }
        }

        if variants.is_empty() {
            let first = omissions.first();
            return Err(Error::Generation {
                design: first.map(|o| o.design.clone()).unwrap_or_default(),
                ratio: first.map(|o| o.ratio.clone()).unwrap_or_default(),
                reason: format!("all {} variant(s) failed", total),
            });
        }

        tracing::info!(
            "generated {} of {} variant(s), {} omitted",
            variants.len(),
            total,
            omissions.len()
        );
        Ok(SuperThemePackage { variants, omissions })
    }

    fn build_variant(
        &self,
        context: &GenerationContext,
        designs: &[(String, ResolvedTokens)],
        design_index: usize,
        spec: &AspectRatioSpec,
        ratio_count: usize,
        ratio_index: usize,
    ) -> Result<ThemeVariant> {
        let (design_name, tokens) = &designs[design_index];
        let failed = |e: Error| Error::Generation {
            design: design_name.clone(),
            ratio: spec.id.clone(),
            reason: e.to_string(),
        };

        let token_set = context
            .token_set(&self.resolver, design_index, tokens, &spec.id)
            .map_err(failed)?;
        let theme_xml = ThemeBuilder::from_tokens(design_name, &token_set)
            .and_then(|theme| theme.to_xml())
            .map_err(failed)?;
        let presentation_xml = PresentationBuilder::for_ratio(spec).to_xml().map_err(failed)?;

        tracing::trace!("built variant '{}' @ '{}'", design_name, spec.id);
        Ok(ThemeVariant {
            variant_id: variant_id(design_index, ratio_index, ratio_count),
            design_name: design_name.clone(),
            aspect_ratio_id: spec.id.clone(),
            guid: context.guid(design_name),
            dimensions: spec.clone(),
            theme_xml,
            presentation_xml,
        })
    }
}

fn check_unique(items: impl Iterator<Item = String>, what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.clone()) {
            return Err(Error::Config(format!("duplicate {} '{}'", what, item)));
        }
    }
    Ok(())
}

/// Different design names must never share a GUID.
fn check_guids(context: &GenerationContext, designs: &[(String, ResolvedTokens)]) -> Result<()> {
    let mut owners: HashMap<String, &str> = HashMap::with_capacity(designs.len());
    for (name, _) in designs {
        let guid = context.guid(name);
        match owners.get(&guid) {
            Some(first) if *first != name.as_str() => {
                return Err(Error::GuidCollision {
                    guid,
                    first: first.to_string(),
                    second: name.clone(),
                });
            },
            _ => {
                owners.insert(guid, name);
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::is_braced_guid;
    use crate::geometry::MissingRatioPolicy;
    use crate::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};

    fn design(name: &str, json: &str) -> (String, ResolvedTokens) {
        let layer = TokenLayer::from_json_str(name, LayerKind::Core, json).unwrap();
        let tokens = TokenResolver::new()
            .resolve(&[layer], &ResolutionContext::new())
            .unwrap();
        (name.to_string(), tokens)
    }

    fn ratios(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_designs_three_ratios() {
        let designs = vec![
            design("Acme", r##"{"colors": {"primary": "#1F4E79"}}"##),
            design("Globex", r##"{"colors": {"primary": "#C00000"}}"##),
        ];
        let package = SuperThemeGenerator::default()
            .generate(&designs, &ratios(&["16:9", "4:3", "a4-landscape"]))
            .unwrap();

        let ids: Vec<u32> = package.variants().iter().map(|v| v.variant_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(package.variant(2).unwrap().aspect_ratio_id, "4:3");
        assert_eq!(package.variant(4).unwrap().design_name, "Globex");
        assert!(package.omissions().is_empty());

        // GUID is per design, shared across ratios
        let acme = package.variant(1).unwrap();
        assert!(is_braced_guid(&acme.guid));
        assert_eq!(acme.guid, package.variant(3).unwrap().guid);
        assert_ne!(acme.guid, package.variant(4).unwrap().guid);
        assert!(acme.theme_xml.contains("1F4E79"));
        assert!(package.variant(5).unwrap().theme_xml.contains("C00000"));
        assert!(package.variant(6).unwrap().presentation_xml.contains(r#"cx="10692000""#));
    }

    #[test]
    fn test_fail_fast_and_continue() {
        let designs = vec![
            design("Acme", r#"{"spacing": {"$aspectRatio": {"16:9": "10", "4:3": "8"}}}"#),
            design("Globex", r#"{"spacing": {"$aspectRatio": {"16:9": "12"}}}"#),
        ];
        let ids = ratios(&["16:9", "4:3"]);

        let err = SuperThemeGenerator::default().generate(&designs, &ids).unwrap_err();
        assert!(matches!(err, Error::Generation { ref design, ref ratio, .. } if design == "Globex" && ratio == "4:3"));

        let generator = SuperThemeGenerator::new(AspectRatioResolver::new(), VariantRecovery::Continue);
        let package = generator.generate(&designs, &ids).unwrap();
        let ids: Vec<u32> = package.variants().iter().map(|v| v.variant_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(package.omissions().len(), 1);
        assert_eq!(package.omissions()[0].variant_id, 4);
        assert!(!package.manager_xml().unwrap().contains("rId4"));

        let lenient = SuperThemeGenerator::new(
            AspectRatioResolver::with_policy(MissingRatioPolicy::FirstDefined),
            VariantRecovery::FailFast,
        );
        assert_eq!(lenient.generate(&designs, &ratios(&["16:9", "4:3"])).unwrap().variants().len(), 4);
    }

    #[test]
    fn test_all_failed() {
        let designs = vec![design("Acme", r#"{"spacing": {"$aspectRatio": {"16:9": "10"}}}"#)];
        let generator = SuperThemeGenerator::new(AspectRatioResolver::new(), VariantRecovery::Continue);
        assert!(matches!(
            generator.generate(&designs, &ratios(&["4:3"])),
            Err(Error::Generation { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let designs = vec![design("Acme", "{}"), design("Acme", "{}")];
        assert!(matches!(
            SuperThemeGenerator::default().generate(&designs, &ratios(&["16:9"])),
            Err(Error::Config(_))
        ));

        let designs = vec![design("Acme", "{}")];
        assert!(matches!(
            SuperThemeGenerator::default().generate(&designs, &ratios(&["16:9", " 16:9"])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SuperThemeGenerator::default().generate(&designs, &ratios(&["wide"])),
            Err(Error::UnknownAspectRatio(_))
        ));
        assert!(SuperThemeGenerator::default().generate(&[], &ratios(&["16:9"])).is_err());
    }
}
