//! Theme part (`a:theme`) generation from resolved tokens.
//!
//! Themes carry the 12-slot color scheme, the major/minor font pair and a
//! format scheme. Slots and fonts not named by tokens keep the Office
//! defaults.

use crate::common::xml::escape_xml;
use crate::common::{Error, Result};
use crate::ooxml::opc::constants::namespace;
use crate::tokens::{ResolvedTokenSet, Scalar};
use std::fmt::Write as FmtWrite;

/// The twelve color-scheme slots, in schema order.
pub const COLOR_SLOTS: [&str; 12] = [
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6", "hlink",
    "folHlink",
];

const OFFICE_COLORS: [&str; 12] = [
    "000000", "FFFFFF", "44546A", "E7E6E6", "4472C4", "ED7D31", "A5A5A5", "FFC000", "5B9BD5", "70AD47", "0563C1",
    "954F72",
];

const DEFAULT_MAJOR_FONT: &str = "Calibri Light";
const DEFAULT_MINOR_FONT: &str = "Calibri";

/// Semantic color token for a slot, consulted after the slot-named tokens.
fn semantic_alias(slot: &str) -> Option<&'static str> {
    match slot {
        "dk1" => Some("colors.text"),
        "lt1" => Some("colors.background"),
        "dk2" => Some("colors.textSecondary"),
        "lt2" => Some("colors.surface"),
        "accent1" => Some("colors.primary"),
        "accent2" => Some("colors.secondary"),
        "accent3" => Some("colors.tertiary"),
        "hlink" => Some("colors.link"),
        _ => None,
    }
}

/// Color scheme: the 12 slots as uppercase `RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScheme {
    name: String,
    slots: [String; 12],
}

impl ColorScheme {
    /// The Office default scheme.
    pub fn office(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: OFFICE_COLORS.map(str::to_string),
        }
    }

    /// Slot value by name (`accent1`, `folHlink`, ...).
    pub fn get(&self, slot: &str) -> Option<&str> {
        COLOR_SLOTS
            .iter()
            .position(|s| *s == slot)
            .map(|i| self.slots[i].as_str())
    }

    /// Set a slot. The value must be `#RRGGBB` or `RRGGBB`.
    pub fn set(&mut self, slot: &str, value: &str) -> Result<()> {
        let index = COLOR_SLOTS
            .iter()
            .position(|s| *s == slot)
            .ok_or_else(|| Error::InvalidToken {
                path: slot.to_string(),
                reason: "not a theme color slot".to_string(),
            })?;
        self.slots[index] = normalize_hex_color(value).ok_or_else(|| Error::InvalidToken {
            path: slot.to_string(),
            reason: format!("'{}' is not a #RRGGBB color", value),
        })?;
        Ok(())
    }

    fn write_xml(&self, xml: &mut String) -> Result<()> {
        write!(xml, r#"<a:clrScheme name="{}">"#, escape_xml(&self.name))?;
        for (slot, value) in COLOR_SLOTS.iter().zip(&self.slots) {
            write!(xml, r#"<a:{0}><a:srgbClr val="{1}"/></a:{0}>"#, slot, value)?;
        }
        xml.push_str("</a:clrScheme>");
        Ok(())
    }
}

/// `#1f4e79` / `1F4E79` to `1F4E79`.
pub fn normalize_hex_color(value: &str) -> Option<String> {
    let hex = value.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    (hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit())).then(|| hex.to_ascii_uppercase())
}

/// Builder for one `theme1.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeBuilder {
    name: String,
    major_font: String,
    minor_font: String,
    colors: ColorScheme,
}

impl ThemeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            colors: ColorScheme::office(name.clone()),
            name,
            major_font: DEFAULT_MAJOR_FONT.to_string(),
            minor_font: DEFAULT_MINOR_FONT.to_string(),
        }
    }

    /// Theme for a design from its flattened tokens.
    ///
    /// Each color slot takes the first of `theme.colors.<slot>`,
    /// `colors.<slot>` and the slot's semantic alias (`colors.primary` for
    /// `accent1`, ...). Fonts come from `theme.fonts.major|minor` or
    /// `typography.heading|body.family`; the name from `theme.name`.
    pub fn from_tokens(design_name: &str, tokens: &ResolvedTokenSet) -> Result<Self> {
        let name = tokens.get_str("theme.name").unwrap_or(design_name);
        let mut theme = Self::new(name);

        for slot in COLOR_SLOTS {
            let themed = format!("theme.colors.{}", slot);
            let plain = format!("colors.{}", slot);
            let mut candidates = vec![themed.as_str(), plain.as_str()];
            candidates.extend(semantic_alias(slot));

            if let Some((path, value)) = tokens.first_of(&candidates) {
                let text = scalar_text(path, value)?;
                theme.colors.set(slot, text).map_err(|_| Error::InvalidToken {
                    path: path.to_string(),
                    reason: format!("'{}' is not a #RRGGBB color", text),
                })?;
            }
        }

        if let Some((path, value)) = tokens.first_of(&["theme.fonts.major", "typography.heading.family"]) {
            theme.major_font = scalar_text(path, value)?.to_string();
        }
        if let Some((path, value)) = tokens.first_of(&["theme.fonts.minor", "typography.body.family"]) {
            theme.minor_font = scalar_text(path, value)?.to_string();
        }
        Ok(theme)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn major_font(&self) -> &str {
        &self.major_font
    }

    #[inline]
    pub fn minor_font(&self) -> &str {
        &self.minor_font
    }

    #[inline]
    pub fn colors(&self) -> &ColorScheme {
        &self.colors
    }

    pub fn set_major_font(&mut self, font: impl Into<String>) {
        self.major_font = font.into();
    }

    pub fn set_minor_font(&mut self, font: impl Into<String>) {
        self.minor_font = font.into();
    }

    pub fn colors_mut(&mut self) -> &mut ColorScheme {
        &mut self.colors
    }

    /// Generate `theme1.xml`.
    pub fn to_xml(&self) -> Result<String> {
        let mut xml = String::with_capacity(6144);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            xml,
            r#"<a:theme xmlns:a="{}" name="{}">"#,
            namespace::DML_MAIN,
            escape_xml(&self.name)
        )?;
        xml.push_str("<a:themeElements>");
        self.colors.write_xml(&mut xml)?;

        write!(xml, r#"<a:fontScheme name="{}">"#, escape_xml(&self.name))?;
        for (tag, font) in [("majorFont", &self.major_font), ("minorFont", &self.minor_font)] {
            write!(
                xml,
                r#"<a:{0}><a:latin typeface="{1}"/><a:ea typeface=""/><a:cs typeface=""/></a:{0}>"#,
                tag,
                escape_xml(font)
            )?;
        }
        xml.push_str("</a:fontScheme>");

        write!(xml, r#"<a:fmtScheme name="{}">"#, escape_xml(&self.name))?;
        xml.push_str(FORMAT_SCHEME_BODY);
        xml.push_str("</a:fmtScheme>");

        xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");
        Ok(xml)
    }
}

fn scalar_text<'a>(path: &str, value: &'a Scalar) -> Result<&'a str> {
    value.as_str().ok_or_else(|| Error::InvalidToken {
        path: path.to_string(),
        reason: format!("expected a string, found {}", value),
    })
}

/// Fill, line, effect and background style lists. PowerPoint requires
/// three entries in each list.
const FORMAT_SCHEME_BODY: &str = concat!(
    "<a:fillStyleLst>",
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:gradFill rotWithShape="1"><a:gsLst><a:gs pos="0"><a:schemeClr val="phClr"><a:lumMod val="110000"/><a:satMod val="105000"/><a:tint val="67000"/></a:schemeClr></a:gs><a:gs pos="50000"><a:schemeClr val="phClr"><a:lumMod val="105000"/><a:satMod val="103000"/><a:tint val="73000"/></a:schemeClr></a:gs><a:gs pos="100000"><a:schemeClr val="phClr"><a:lumMod val="105000"/><a:satMod val="109000"/><a:tint val="81000"/></a:schemeClr></a:gs></a:gsLst><a:lin ang="5400000" scaled="0"/></a:gradFill>"#,
    r#"<a:gradFill rotWithShape="1"><a:gsLst><a:gs pos="0"><a:schemeClr val="phClr"><a:satMod val="103000"/><a:lumMod val="102000"/><a:tint val="94000"/></a:schemeClr></a:gs><a:gs pos="100000"><a:schemeClr val="phClr"><a:lumMod val="99000"/><a:satMod val="120000"/><a:shade val="78000"/></a:schemeClr></a:gs></a:gsLst><a:lin ang="5400000" scaled="0"/></a:gradFill>"#,
    "</a:fillStyleLst>",
    "<a:lnStyleLst>",
    r#"<a:ln w="6350" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/><a:miter lim="800000"/></a:ln>"#,
    r#"<a:ln w="12700" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/><a:miter lim="800000"/></a:ln>"#,
    r#"<a:ln w="19050" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/><a:miter lim="800000"/></a:ln>"#,
    "</a:lnStyleLst>",
    "<a:effectStyleLst>",
    "<a:effectStyle><a:effectLst/></a:effectStyle>",
    "<a:effectStyle><a:effectLst/></a:effectStyle>",
    r#"<a:effectStyle><a:effectLst><a:outerShdw blurRad="57150" dist="19050" dir="5400000" algn="ctr" rotWithShape="0"><a:srgbClr val="000000"><a:alpha val="63000"/></a:srgbClr></a:outerShdw></a:effectLst></a:effectStyle>"#,
    "</a:effectStyleLst>",
    "<a:bgFillStyleLst>",
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:tint val="95000"/><a:satMod val="170000"/></a:schemeClr></a:solidFill>"#,
    r#"<a:gradFill rotWithShape="1"><a:gsLst><a:gs pos="0"><a:schemeClr val="phClr"><a:tint val="93000"/><a:satMod val="150000"/><a:shade val="98000"/><a:lumMod val="102000"/></a:schemeClr></a:gs><a:gs pos="100000"><a:schemeClr val="phClr"><a:shade val="63000"/><a:satMod val="120000"/></a:schemeClr></a:gs></a:gsLst><a:lin ang="5400000" scaled="0"/></a:gradFill>"#,
    "</a:bgFillStyleLst>",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_office_defaults() {
        let theme = ThemeBuilder::from_tokens("Plain", &ResolvedTokenSet::new()).unwrap();
        assert_eq!(theme.name(), "Plain");
        assert_eq!(theme.major_font(), "Calibri Light");
        assert_eq!(theme.colors().get("accent1"), Some("4472C4"));
        assert_eq!(theme.colors().get("folHlink"), Some("954F72"));
    }

    #[test]
    fn test_slot_lookup_order() {
        let mut tokens = ResolvedTokenSet::new();
        tokens.insert("colors.primary", "#1f4e79");
        tokens.insert("colors.accent2", "C00000");
        tokens.insert("colors.secondary", "00B050");
        tokens.insert("theme.colors.dk1", "#111111");
        tokens.insert("colors.text", "#222222");
        tokens.insert("theme.name", "Acme Corporate");
        tokens.insert("typography.heading.family", "Georgia");
        tokens.insert("theme.fonts.minor", "Segoe UI");

        let theme = ThemeBuilder::from_tokens("acme", &tokens).unwrap();
        assert_eq!(theme.name(), "Acme Corporate");
        assert_eq!(theme.colors().get("accent1"), Some("1F4E79"));
        assert_eq!(theme.colors().get("accent2"), Some("C00000"));
        assert_eq!(theme.colors().get("dk1"), Some("111111"));
        assert_eq!(theme.major_font(), "Georgia");
        assert_eq!(theme.minor_font(), "Segoe UI");
    }

    #[test]
    fn test_invalid_color_names_token() {
        let mut tokens = ResolvedTokenSet::new();
        tokens.insert("colors.primary", "blue");
        let err = ThemeBuilder::from_tokens("acme", &tokens).unwrap_err();
        assert!(matches!(err, Error::InvalidToken { ref path, .. } if path == "colors.primary"));

        let mut tokens = ResolvedTokenSet::new();
        tokens.insert("colors.link", 42i64);
        assert!(ThemeBuilder::from_tokens("acme", &tokens).is_err());
    }

    #[test]
    fn test_xml_generation() {
        let mut theme = ThemeBuilder::new("R&D <Blue>");
        theme.colors_mut().set("accent1", "#00ff00").unwrap();
        let xml = theme.to_xml().unwrap();
        assert!(xml.starts_with("<?xml version"));
        assert!(xml.contains(r#"name="R&amp;D &lt;Blue&gt;""#));
        assert!(xml.contains(r#"<a:accent1><a:srgbClr val="00FF00"/></a:accent1>"#));
        assert!(xml.contains("<a:fontScheme"));
        assert!(xml.contains("<a:fmtScheme"));
        assert!(crate::patch::XmlTree::parse(
            "theme1.xml",
            &xml,
            crate::patch::ParseMode::Strict,
            &Default::default()
        )
        .is_ok());
    }
}
