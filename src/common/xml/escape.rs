use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use std::borrow::Cow;

const SPECIALS: [&str; 5] = ["&", "<", ">", "\"", "'"];
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(SPECIALS)
        .expect("static escape patterns are valid")
});

/// Escape XML special characters for use in text or attribute values.
///
/// Borrows the input unchanged when nothing needs escaping, which is the
/// common case for token values such as hex colors and font names.
///
/// # Examples
///
/// ```
/// use stylestack::common::xml::escape_xml;
/// assert_eq!(escape_xml("Corporate Blue"), "Corporate Blue");
/// assert_eq!(escape_xml("R&D <draft>"), "R&amp;D &lt;draft&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if !needs_escape(s) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(XML_ESCAPER.replace_all(s, &ENTITIES))
}

#[inline]
fn needs_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    memchr::memchr3(b'&', b'<', b'>', bytes).is_some() || memchr::memchr2(b'"', b'\'', bytes).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_borrows_clean_input() {
        assert!(matches!(escape_xml("0066CC"), Cow::Borrowed(_)));
        assert!(matches!(escape_xml("a & b"), Cow::Owned(_)));
    }

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_xml(r#"<a href="x">'y' & z</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&apos;y&apos; &amp; z&lt;/a&gt;"
        );
    }
}
