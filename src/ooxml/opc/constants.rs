//! Constant values related to the Open Packaging Convention.
//!
//! Content type URIs, XML namespaces and relationship types used by theme,
//! SuperTheme and template packages.

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    /// Office theme part
    pub const OFC_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    /// SuperTheme variant manager part
    pub const THEME_VARIANT_MANAGER: &str = "application/vnd.ms-office.themeVariantManager+xml";

    // OPC
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

    // PresentationML content types
    pub const PML_PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";

    // Generic XML
    pub const XML: &str = "application/xml";
}

/// XML namespace URIs
pub mod namespace {
    /// DrawingML main namespace (themes, shape properties)
    pub const DML_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// DrawingML picture namespace
    pub const DML_PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

    /// DrawingML wordprocessing drawing namespace
    pub const DML_WORDPROCESSING_DRAWING: &str =
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";

    /// DrawingML spreadsheet drawing namespace
    pub const DML_SPREADSHEET_DRAWING: &str =
        "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

    /// PresentationML main namespace
    pub const PML_MAIN: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// WordprocessingML main namespace
    pub const WML_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    /// SpreadsheetML main namespace
    pub const SML_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    /// Office relationships namespace (`r:id` attributes)
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// OPC relationships namespace
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// SuperTheme (thememl 2012) namespace
    pub const THEMEML_2012: &str = "http://schemas.microsoft.com/office/thememl/2012/main";

    /// ODF namespaces
    pub const ODF_OFFICE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
    pub const ODF_STYLE: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
    pub const ODF_DRAW: &str = "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0";
    pub const ODF_FO: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";
    pub const ODF_SVG: &str = "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0";
    pub const ODF_TEXT: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Relationship type URIs
pub mod relationship_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

    /// Package root to the SuperTheme variant manager
    pub const THEME_VARIANT_MANAGER: &str =
        "http://schemas.microsoft.com/office/thememl/2012/relationships/themeVariantManager";

    /// Variant manager to one variant's theme
    pub const THEME_VARIANT: &str =
        "http://schemas.microsoft.com/office/thememl/2012/relationships/themeVariant";
}

/// Well-known part names
pub mod part_name {
    pub const CONTENT_TYPES: &str = "/[Content_Types].xml";
    pub const PACKAGE_RELS: &str = "/_rels/.rels";
    /// ODF packages must store this entry first and uncompressed
    pub const ODF_MIMETYPE: &str = "/mimetype";
}
