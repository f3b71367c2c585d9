//! Pre-parse repair pass.
//!
//! Streams the input through quick-xml with end-name checking relaxed and
//! re-emits it well-formed: unclosed and mismatched elements are closed,
//! stray end tags dropped, DOCTYPE declarations removed. Bare `&` is escaped
//! before the stream pass. Every change is reported so callers can surface
//! it; in strict mode any change is an error instead.

use crate::common::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Limits applied while scanning a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    /// Maximum input size in bytes
    pub max_bytes: usize,
    /// Maximum element nesting depth
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
            max_depth: 256,
        }
    }
}

/// Output of [`repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub xml: String,
    pub repairs: Vec<String>,
}

/// Repair `xml` into well-formed text.
///
/// Limits are enforced regardless of mode. With `allow_repairs == false` the
/// first defect found is returned as a parse error.
pub fn repair(source_name: &str, xml: &str, limits: &ParseLimits, allow_repairs: bool) -> Result<Repaired> {
    if xml.len() > limits.max_bytes {
        return Err(Error::parse(
            source_name,
            format!("input is {} bytes, limit is {}", xml.len(), limits.max_bytes),
        ));
    }

    let mut repairs = Vec::new();
    let mut note = |msg: String| -> Result<()> {
        if allow_repairs {
            tracing::debug!("{}: repaired {}", source_name, msg);
            repairs.push(msg);
            Ok(())
        } else {
            Err(Error::parse(source_name, msg))
        }
    };

    let text = xml.strip_prefix('\u{FEFF}').unwrap_or(xml);
    let trimmed = text.trim_start();
    if trimmed.len() != text.len() && trimmed.starts_with("<?xml") {
        note("whitespace before the XML declaration".to_string())?;
    }

    let (escaped, bare) = escape_bare_ampersands(trimmed);
    if bare > 0 {
        note(format!("{} unescaped '&' character(s)", bare))?;
    }

    let mut reader = Reader::from_str(&escaped);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut out = String::with_capacity(escaped.len() + 64);
    let mut stack: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::parse(source_name, format!("at byte {}: {}", reader.buffer_position(), e))
        })?;
        match event {
            Event::Start(e) => {
                let name = utf8(source_name, e.name().as_ref())?.to_string();
                stack.push(name);
                if stack.len() > limits.max_depth {
                    return Err(Error::parse(
                        source_name,
                        format!("element depth exceeds {}", limits.max_depth),
                    ));
                }
                out.push('<');
                out.push_str(utf8(source_name, &e)?);
                out.push('>');
            },
            Event::Empty(e) => {
                if stack.len() + 1 > limits.max_depth {
                    return Err(Error::parse(
                        source_name,
                        format!("element depth exceeds {}", limits.max_depth),
                    ));
                }
                out.push('<');
                out.push_str(utf8(source_name, &e)?);
                out.push_str("/>");
            },
            Event::End(e) => {
                let qname = e.name();
                let name = utf8(source_name, qname.as_ref())?;
                match stack.iter().rposition(|open| open == name) {
                    Some(pos) => {
                        while stack.len() > pos + 1 {
                            if let Some(unclosed) = stack.pop() {
                                note(format!("unclosed element <{}> closed before </{}>", unclosed, name))?;
                                close_tag(&mut out, &unclosed);
                            }
                        }
                        stack.pop();
                        close_tag(&mut out, name);
                    },
                    None => note(format!("stray end tag </{}> removed", name))?,
                }
            },
            Event::Text(e) => out.push_str(utf8(source_name, &e)?),
            Event::GeneralRef(e) => {
                out.push('&');
                out.push_str(utf8(source_name, &e)?);
                out.push(';');
            },
            Event::CData(e) => {
                out.push_str("<![CDATA[");
                out.push_str(utf8(source_name, &e)?);
                out.push_str("]]>");
            },
            Event::Comment(e) => {
                out.push_str("<!--");
                out.push_str(utf8(source_name, &e)?);
                out.push_str("-->");
            },
            Event::Decl(e) => {
                out.push_str("<?");
                out.push_str(utf8(source_name, &e)?);
                out.push_str("?>");
            },
            Event::PI(e) => {
                out.push_str("<?");
                out.push_str(utf8(source_name, &e)?);
                out.push_str("?>");
            },
            Event::DocType(_) => note("DOCTYPE declaration removed".to_string())?,
            Event::Eof => break,
        }
    }

    while let Some(unclosed) = stack.pop() {
        note(format!("unclosed element <{}> closed at end of input", unclosed))?;
        close_tag(&mut out, &unclosed);
    }

    Ok(Repaired { xml: out, repairs })
}

#[inline]
fn close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

#[inline]
fn utf8<'a>(source_name: &str, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| Error::parse(source_name, e))
}

/// Escape every `&` that does not start an entity or character reference.
/// Returns the text and the number of characters escaped.
fn escape_bare_ampersands(text: &str) -> (std::borrow::Cow<'_, str>, usize) {
    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut count = 0;
    let mut last = 0;

    for pos in memchr::memchr_iter(b'&', bytes) {
        if starts_reference(&bytes[pos + 1..]) {
            continue;
        }
        let buf = out.get_or_insert_with(|| String::with_capacity(text.len() + 16));
        buf.push_str(&text[last..pos]);
        buf.push_str("&amp;");
        last = pos + 1;
        count += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[last..]);
            (std::borrow::Cow::Owned(buf), count)
        },
        None => (std::borrow::Cow::Borrowed(text), 0),
    }
}

/// Whether `rest` (the bytes after `&`) forms `name;`, `#123;` or `#x1F;`.
fn starts_reference(rest: &[u8]) -> bool {
    let Some(end) = memchr::memchr(b';', rest) else {
        return false;
    };
    let body = &rest[..end];
    match body {
        [] => false,
        [b'#', b'x' | b'X', hex @ ..] => !hex.is_empty() && hex.iter().all(u8::is_ascii_hexdigit),
        [b'#', dec @ ..] => !dec.is_empty() && dec.iter().all(u8::is_ascii_digit),
        [first, tail @ ..] => {
            (first.is_ascii_alphabetic() || *first == b'_')
                && tail
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(xml: &str) -> Repaired {
        repair("test.xml", xml, &ParseLimits::default(), true).unwrap()
    }

    #[test]
    fn test_clean_input_untouched() {
        let xml = r#"<?xml version="1.0"?><a x="1 &amp; 2"><b>t &lt; u</b><c/><!--n--></a>"#;
        let repaired = lenient(xml);
        assert_eq!(repaired.xml, xml);
        assert!(repaired.repairs.is_empty());
    }

    #[test]
    fn test_bare_ampersand() {
        let repaired = lenient("<a>R&D &amp; co &#38; &#x26;</a>");
        assert_eq!(repaired.xml, "<a>R&amp;D &amp; co &#38; &#x26;</a>");
        assert_eq!(repaired.repairs.len(), 1);
    }

    #[test]
    fn test_unclosed_and_stray() {
        let repaired = lenient("<a><b><c></b></x></a>");
        assert_eq!(repaired.xml, "<a><b><c></c></b></a>");
        assert_eq!(repaired.repairs.len(), 2);

        let repaired = lenient("<a><b>");
        assert_eq!(repaired.xml, "<a><b></b></a>");
    }

    #[test]
    fn test_doctype_removed() {
        let repaired = lenient(r#"<!DOCTYPE a [<!ENTITY x "boom">]><a/>"#);
        assert_eq!(repaired.xml, "<a/>");
        assert!(repaired.repairs[0].contains("DOCTYPE"));
    }

    #[test]
    fn test_strict_rejects() {
        let limits = ParseLimits::default();
        assert!(repair("s.xml", "<a>R&D</a>", &limits, false).is_err());
        assert!(repair("s.xml", "<a><b></a>", &limits, false).is_err());
        assert!(repair("s.xml", "<a/>", &limits, false).is_ok());
    }

    #[test]
    fn test_limits() {
        let limits = ParseLimits {
            max_bytes: 1024,
            max_depth: 3,
        };
        assert!(repair("d.xml", "<a><b><c/></b></a>", &limits, true).is_ok());
        assert!(repair("d.xml", "<a><b><c><d/></c></b></a>", &limits, true).is_err());
        let big = format!("<a>{}</a>", "x".repeat(2048));
        assert!(repair("d.xml", &big, &limits, true).is_err());
    }

    #[test]
    fn test_bom_stripped_silently() {
        let repaired = repair("b.xml", "\u{FEFF}<a/>", &ParseLimits::default(), false).unwrap();
        assert_eq!(repaired.xml, "<a/>");
    }
}
