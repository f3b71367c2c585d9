//! Deterministic GUIDs for design identities.
//!
//! PowerPoint groups theme variants by their `vid`. The GUID for a design
//! must therefore be stable across runs and machines, so it is derived from
//! the design name rather than drawn at random.

use sha2::{Digest, Sha256};

/// Namespace prefix hashed in front of every design name.
pub const DESIGN_GUID_NAMESPACE: &str = "stylestack-design-";

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Derive the raw 16 GUID bytes for a design name.
///
/// SHA-256 over `"stylestack-design-" + name`, truncated to 16 bytes, with the
/// RFC 4122 variant bits and a name-based (version 5) version nibble.
pub fn design_guid_bytes(design_name: &str) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(DESIGN_GUID_NAMESPACE.as_bytes());
    hasher.update(design_name.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    bytes
}

/// The braced, uppercase GUID for a design name, e.g.
/// `{1B2C3D4E-0000-5000-8000-00000000ABCD}`.
pub fn guid_for(design_name: &str) -> String {
    format_guid_braced(&design_guid_bytes(design_name))
}

/// Format raw GUID bytes as a braced string {XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}
pub fn format_guid_braced(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(38);
    out.push('{');
    hex_upper_into(&bytes[0..4], &mut out);
    out.push('-');
    hex_upper_into(&bytes[4..6], &mut out);
    out.push('-');
    hex_upper_into(&bytes[6..8], &mut out);
    out.push('-');
    hex_upper_into(&bytes[8..10], &mut out);
    out.push('-');
    hex_upper_into(&bytes[10..16], &mut out);
    out.push('}');
    out
}

/// Check the braced 8-4-4-4-12 uppercase-hex shape.
pub fn is_braced_guid(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 38 || bytes[0] != b'{' || bytes[37] != b'}' {
        return false;
    }
    bytes[1..37].iter().enumerate().all(|(i, &b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_digit() || (b'A'..=b'F').contains(&b),
    })
}

#[inline]
fn hex_upper_into(bytes: &[u8], out: &mut String) {
    out.reserve(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_UPPER[(b >> 4) as usize] as char);
        out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
    }
}
