//! Document-type detection and per-type namespace conventions.
//!
//! The type is read from the namespace of the document's root element. Each
//! type carries the prefix table patch xpaths are compiled against and the
//! xpath that selects shape properties in that vocabulary. Unrecognized
//! documents get the fallback strategy: no prefixes, and a
//! `local-name()` xpath that matches regardless of namespace.

use crate::ooxml::opc::constants::namespace as ns;
use phf::phf_map;
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use serde::{Deserialize, Serialize};
use std::fmt;

static PRESENTATION_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "p" => ns::PML_MAIN,
    "a" => ns::DML_MAIN,
    "r" => ns::OFC_RELATIONSHIPS,
};

static WORD_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "w" => ns::WML_MAIN,
    "wp" => ns::DML_WORDPROCESSING_DRAWING,
    "a" => ns::DML_MAIN,
    "pic" => ns::DML_PICTURE,
    "r" => ns::OFC_RELATIONSHIPS,
};

static SPREADSHEET_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "x" => ns::SML_MAIN,
    "xdr" => ns::DML_SPREADSHEET_DRAWING,
    "a" => ns::DML_MAIN,
    "r" => ns::OFC_RELATIONSHIPS,
};

static DRAWINGML_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "a" => ns::DML_MAIN,
    "pic" => ns::DML_PICTURE,
    "r" => ns::OFC_RELATIONSHIPS,
};

static OPENDOCUMENT_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {
    "office" => ns::ODF_OFFICE,
    "style" => ns::ODF_STYLE,
    "draw" => ns::ODF_DRAW,
    "fo" => ns::ODF_FO,
    "svg" => ns::ODF_SVG,
    "text" => ns::ODF_TEXT,
};

static NO_NAMESPACES: phf::Map<&'static str, &'static str> = phf_map! {};

/// The vocabulary a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    PowerPoint,
    Word,
    Excel,
    /// Theme, chart and other bare DrawingML parts
    DrawingML,
    OpenDocument,
    Unknown,
}

impl DocumentType {
    /// Classify a root-element namespace URI.
    pub fn from_namespace(uri: Option<&str>) -> Self {
        let Some(uri) = uri else {
            return Self::Unknown;
        };
        // wordprocessingDrawing and spreadsheetDrawing live under drawingml/,
        // so the specific vocabularies are checked first
        if uri.contains("presentationml") {
            Self::PowerPoint
        } else if uri.contains("wordprocessingml") || uri.contains("wordprocessingDrawing") {
            Self::Word
        } else if uri.contains("spreadsheetml") || uri.contains("spreadsheetDrawing") {
            Self::Excel
        } else if uri.contains("drawingml") {
            Self::DrawingML
        } else if uri.starts_with("urn:oasis:names:tc:opendocument") {
            Self::OpenDocument
        } else {
            Self::Unknown
        }
    }

    /// Classify an XML document by its root element. Unparseable or
    /// namespace-less input is `Unknown`, never an error.
    pub fn detect(xml: &str) -> Self {
        let mut reader = NsReader::from_str(xml);
        loop {
            match reader.read_resolved_event() {
                Ok((resolved, Event::Start(_))) | Ok((resolved, Event::Empty(_))) => {
                    return match resolved {
                        ResolveResult::Bound(namespace) => {
                            let uri = std::str::from_utf8(namespace.as_ref()).ok();
                            Self::from_namespace(uri)
                        },
                        _ => Self::Unknown,
                    };
                },
                Ok((_, Event::Eof)) | Err(_) => return Self::Unknown,
                Ok(_) => {},
            }
        }
    }

    /// Prefix → namespace URI table for this type.
    pub fn namespaces(self) -> &'static phf::Map<&'static str, &'static str> {
        match self {
            Self::PowerPoint => &PRESENTATION_NAMESPACES,
            Self::Word => &WORD_NAMESPACES,
            Self::Excel => &SPREADSHEET_NAMESPACES,
            Self::DrawingML => &DRAWINGML_NAMESPACES,
            Self::OpenDocument => &OPENDOCUMENT_NAMESPACES,
            Self::Unknown => &NO_NAMESPACES,
        }
    }

    /// XPath selecting shape-property elements.
    pub fn shape_properties_xpath(self) -> &'static str {
        match self {
            Self::PowerPoint => "//p:spPr",
            Self::Word => "//pic:spPr",
            Self::Excel => "//xdr:spPr",
            Self::DrawingML => "//a:spPr",
            Self::OpenDocument => "//style:graphic-properties",
            Self::Unknown => "//*[local-name()='spPr']",
        }
    }

    #[inline]
    pub fn is_fallback(self) -> bool {
        self == Self::Unknown
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PowerPoint => "PowerPoint",
            Self::Word => "Word",
            Self::Excel => "Excel",
            Self::DrawingML => "DrawingML",
            Self::OpenDocument => "OpenDocument",
            Self::Unknown => "Unknown",
        })
    }
}

/// Namespace and xpath conventions for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStrategy {
    document_type: DocumentType,
}

impl DocumentStrategy {
    pub fn for_type(document_type: DocumentType) -> Self {
        Self { document_type }
    }

    /// Strategy for an XML document, by its root namespace.
    pub fn detect(xml: &str) -> Self {
        let document_type = DocumentType::detect(xml);
        tracing::trace!("detected document type {}", document_type);
        Self::for_type(document_type)
    }

    /// The namespace-agnostic strategy.
    pub fn fallback() -> Self {
        Self::for_type(DocumentType::Unknown)
    }

    #[inline]
    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.document_type.namespaces().entries().map(|(k, v)| (*k, *v))
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&'static str> {
        self.document_type.namespaces().get(prefix).copied()
    }

    #[inline]
    pub fn shape_properties_xpath(&self) -> &'static str {
        self.document_type.shape_properties_xpath()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_root_namespace() {
        let slide = r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"/>"#;
        assert_eq!(DocumentType::detect(slide), DocumentType::PowerPoint);

        let doc = r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body/></w:document>"#;
        assert_eq!(DocumentType::detect(doc), DocumentType::Word);

        let drawing = r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing"/>"#;
        assert_eq!(DocumentType::detect(drawing), DocumentType::Excel);

        let theme = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="x"/>"#;
        assert_eq!(DocumentType::detect(theme), DocumentType::DrawingML);

        let odf = r#"<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"/>"#;
        assert_eq!(DocumentType::detect(odf), DocumentType::OpenDocument);
    }

    #[test]
    fn test_unknown_is_not_an_error() {
        assert_eq!(DocumentType::detect("<root/>"), DocumentType::Unknown);
        assert_eq!(DocumentType::detect(r#"<x xmlns="urn:example"/>"#), DocumentType::Unknown);
        assert_eq!(DocumentType::detect("not xml <<<"), DocumentType::Unknown);
        assert_eq!(DocumentType::detect(""), DocumentType::Unknown);
    }

    #[test]
    fn test_strategy_tables() {
        let pptx = DocumentStrategy::for_type(DocumentType::PowerPoint);
        assert_eq!(pptx.shape_properties_xpath(), "//p:spPr");
        assert_eq!(pptx.namespace_uri("p"), Some(ns::PML_MAIN));

        let word = DocumentStrategy::for_type(DocumentType::Word);
        assert_eq!(word.shape_properties_xpath(), "//pic:spPr");
        assert_eq!(word.namespace_uri("pic"), Some(ns::DML_PICTURE));

        let fallback = DocumentStrategy::fallback();
        assert_eq!(fallback.namespaces().count(), 0);
        assert_eq!(fallback.shape_properties_xpath(), "//*[local-name()='spPr']");
    }
}
