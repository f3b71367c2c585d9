//! Package URIs: part names inside an OPC package.
//!
//! A PackURI always begins with a forward slash and uses forward slashes as
//! separators. The ZIP member name is the URI without its leading slash.

use crate::common::{Error, Result};

/// Characters that break archive extraction on at least one platform.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// A part name within an OPC package, e.g. `/theme/theme/theme1.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    uri: String,
}

impl PackURI {
    /// Create a PackURI. The URI must begin with a slash and be portable
    /// (see [`portability_issue`]).
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(Error::integrity(uri, "part name must begin with '/'"));
        }
        if uri != "/" {
            if let Some(reason) = portability_issue(&uri[1..]) {
                return Err(Error::integrity(uri, reason));
            }
        }
        Ok(PackURI { uri })
    }

    /// The package pseudo-partname `/`.
    pub fn package() -> Self {
        PackURI {
            uri: PACKAGE_URI.to_string(),
        }
    }

    /// The root of a package nested in a directory, e.g.
    /// `/themeVariants/variant1/`. Relationships held by a nested root live
    /// in `<dir>/_rels/.rels`. `"/"` gives the package itself.
    pub fn package_root(dir: &str) -> Result<Self> {
        let dir = dir.trim_end_matches('/');
        if dir.is_empty() {
            return Ok(Self::package());
        }
        let uri = Self::new(dir)?;
        Ok(PackURI {
            uri: format!("{}/", uri.uri),
        })
    }

    /// Whether this names a package root (`/` or a nested `/dir/`).
    #[inline]
    pub fn is_package_root(&self) -> bool {
        self.uri.ends_with('/')
    }

    /// PackURI for a ZIP member name (`theme/theme/theme1.xml`).
    pub fn from_member_name(name: &str) -> Result<Self> {
        Self::new(format!("/{}", name))
    }

    /// Resolve a relationship target against the directory of its source.
    ///
    /// `("/themeVariants", "variant1/theme/theme/theme1.xml")` resolves to
    /// `/themeVariants/variant1/theme/theme/theme1.xml`. A target that climbs
    /// above the package root is an integrity error.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };

        let mut parts: Vec<&str> = Vec::new();
        for part in joined.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    if parts.pop().is_none() {
                        return Err(Error::integrity(
                            joined.clone(),
                            "relationship target escapes the package root",
                        ));
                    }
                },
                _ => parts.push(part),
            }
        }
        Self::new(format!("/{}", parts.join("/")))
    }

    /// Directory portion, e.g. `/ppt/slides` for `/ppt/slides/slide1.xml`.
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// File name, e.g. `slide1.xml`.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Extension without the leading period.
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// The ZIP member name (URI with the leading slash stripped).
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Relative reference from `base_uri` to this part.
    ///
    /// PackURI("/ppt/slideLayouts/slideLayout1.xml") gives
    /// "../slideLayouts/slideLayout1.xml" from "/ppt/slides".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = "../".repeat(from_parts.len() - common);
        result.push_str(&to_parts[common..].join("/"));
        result
    }

    /// The `.rels` part for this part, e.g. `/word/_rels/document.xml.rels`.
    /// For the package itself (`/`) this is `/_rels/.rels`.
    pub fn rels_uri(&self) -> PackURI {
        let base_uri = self.base_uri();
        let uri = if base_uri == "/" {
            format!("/_rels/{}.rels", self.filename())
        } else {
            format!("{}/_rels/{}.rels", base_uri, self.filename())
        };
        PackURI { uri }
    }

    /// For a `.rels` part, the part whose relationships it holds.
    ///
    /// `/themeVariants/_rels/themeVariantManager.xml.rels` gives
    /// `/themeVariants/themeVariantManager.xml`; `/_rels/.rels` gives `/` and
    /// `/themeVariants/variant1/_rels/.rels` gives `/themeVariants/variant1/`.
    pub fn rels_source(&self) -> Option<PackURI> {
        let source_name = self.filename().strip_suffix(".rels")?;
        let dir = self.base_uri();
        let parent = dir.strip_suffix("/_rels")?;
        let uri = if source_name.is_empty() {
            format!("{}/", parent)
        } else {
            format!("{}/{}", parent, source_name)
        };
        Some(PackURI { uri })
    }

    #[inline]
    pub fn is_rels(&self) -> bool {
        self.uri.ends_with(".rels")
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

/// Why a member name is not portable across archive readers, if it isn't.
///
/// Rejects backslashes, reserved characters, `.` / `..` segments, empty
/// segments, absolute and drive-letter paths. `[Content_Types].xml` is
/// checked like any other name and passes.
pub fn portability_issue(member: &str) -> Option<&'static str> {
    if member.is_empty() {
        return Some("empty path");
    }
    if member.contains('\\') {
        return Some("backslash path separator");
    }
    if member.starts_with('/') {
        return Some("absolute path");
    }
    let bytes = member.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Some("drive-letter path");
    }
    if member.contains(RESERVED_CHARS) {
        return Some("reserved character in path");
    }
    for segment in member.split('/') {
        match segment {
            "" => return Some("empty path segment"),
            "." | ".." => return Some("parent or current directory segment"),
            _ => {},
        }
    }
    None
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/theme/theme/theme1.xml").is_ok());
        assert!(PackURI::new("/[Content_Types].xml").is_ok());
        assert!(PackURI::new("theme/theme1.xml").is_err());
        assert!(PackURI::new("/theme/../x.xml").is_err());
        assert!(PackURI::new("/theme\\x.xml").is_err());
    }

    #[test]
    fn test_components() {
        let uri = PackURI::new("/themeVariants/variant1/theme/presentation.xml").unwrap();
        assert_eq!(uri.base_uri(), "/themeVariants/variant1/theme");
        assert_eq!(uri.filename(), "presentation.xml");
        assert_eq!(uri.ext(), "xml");
        assert_eq!(uri.membername(), "themeVariants/variant1/theme/presentation.xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_rels_uri_round_trip() {
        let manager = PackURI::new("/themeVariants/themeVariantManager.xml").unwrap();
        let rels = manager.rels_uri();
        assert_eq!(rels.as_str(), "/themeVariants/_rels/themeVariantManager.xml.rels");
        assert_eq!(rels.rels_source(), Some(manager));

        let root = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(root.rels_uri().as_str(), "/_rels/.rels");
        assert_eq!(root.rels_uri().rels_source(), Some(root));
    }

    #[test]
    fn test_nested_package_root() {
        let root = PackURI::package_root("/themeVariants/variant1").unwrap();
        assert!(root.is_package_root());
        assert_eq!(root.as_str(), "/themeVariants/variant1/");
        assert_eq!(root.base_uri(), "/themeVariants/variant1");
        let rels = root.rels_uri();
        assert_eq!(rels.as_str(), "/themeVariants/variant1/_rels/.rels");
        assert_eq!(rels.rels_source(), Some(root));

        let theme = PackURI::new("/themeVariants/variant1/theme/theme/theme1.xml").unwrap();
        assert_eq!(theme.relative_ref("/themeVariants/variant1"), "theme/theme/theme1.xml");
        assert!(!theme.is_package_root());
        assert_eq!(PackURI::package_root("/").unwrap(), PackURI::package());
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/themeVariants", "variant2/theme/theme/theme1.xml").unwrap();
        assert_eq!(uri.as_str(), "/themeVariants/variant2/theme/theme/theme1.xml");

        let uri = PackURI::from_rel_ref("/ppt/slides", "../slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slideLayouts/slideLayout1.xml");

        assert!(PackURI::from_rel_ref("/", "../../etc/passwd").is_err());
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.relative_ref("/ppt/slides"), "../slideLayouts/slideLayout1.xml");
        assert_eq!(uri.relative_ref("/"), "ppt/slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_portability_issue() {
        assert_eq!(portability_issue("a/b.xml"), None);
        assert!(portability_issue("C:/a.xml").is_some());
        assert!(portability_issue("a//b.xml").is_some());
        assert!(portability_issue("a/b?.xml").is_some());
        assert!(portability_issue("../a.xml").is_some());
    }
}
