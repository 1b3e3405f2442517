//! XML Encoding Detection
//!
//! Only UTF-8 content is supported. What this module does is notice when a
//! document claims otherwise (BOM or `encoding="..."` in the declaration) so
//! the indexer can warn that bytes are being treated as UTF-8.

/// Encoding inferred from the first bytes of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM - check for UTF-16 pattern (< followed by null or null followed by <)
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            XmlEncoding::Utf8 => "UTF-8",
            XmlEncoding::Utf16Le => "UTF-16LE",
            XmlEncoding::Utf16Be => "UTF-16BE",
        }
    }
}

/// Extract the `encoding` pseudo-attribute of a leading XML declaration.
///
/// Returns `None` when there is no declaration or it names no encoding.
pub fn declared_encoding(head: &[u8]) -> Option<&str> {
    let head = head.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(head);
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = memchr::memmem::find(head, b"?>").unwrap_or(head.len());
    let decl = &head[..end];

    let at = memchr::memmem::find(decl, b"encoding")?;
    let mut rest = &decl[at + b"encoding".len()..];
    rest = trim_start(rest).strip_prefix(b"=")?;
    rest = trim_start(rest);

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let close = memchr::memchr(quote, value)?;
    std::str::from_utf8(&value[..close]).ok()
}

/// Labels that can be read as UTF-8 without conversion
pub fn is_utf8_compatible(label: &str) -> bool {
    matches!(
        label.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii"
    )
}

/// Warning text for a document that will be read as UTF-8 despite claiming
/// another encoding, if any.
pub fn encoding_warning(head: &[u8]) -> Option<String> {
    let bom = XmlEncoding::detect(head);
    if bom != XmlEncoding::Utf8 {
        return Some(format!(
            "Document appears to be {}; content is treated as UTF-8",
            bom.label()
        ));
    }
    match declared_encoding(head) {
        Some(label) if !is_utf8_compatible(label) => Some(format!(
            "Declared encoding '{label}' is not supported; content is treated as UTF-8"
        )),
        _ => None,
    }
}

#[inline]
fn trim_start(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &s[n..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8() {
        assert_eq!(XmlEncoding::detect(b"<root/>"), XmlEncoding::Utf8);
        assert_eq!(XmlEncoding::detect(&[0xEF, 0xBB, 0xBF, b'<']), XmlEncoding::Utf8);
    }

    #[test]
    fn test_detect_utf16() {
        assert_eq!(XmlEncoding::detect(&[0xFF, 0xFE, b'<', 0x00]), XmlEncoding::Utf16Le);
        assert_eq!(XmlEncoding::detect(&[0xFE, 0xFF, 0x00, b'<']), XmlEncoding::Utf16Be);
    }

    #[test]
    fn test_declared_encoding() {
        assert_eq!(
            declared_encoding(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r/>"),
            Some("ISO-8859-1")
        );
        assert_eq!(declared_encoding(b"<?xml version='1.0' encoding = 'utf-8' ?>"), Some("utf-8"));
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><r/>"), None);
        assert_eq!(declared_encoding(b"<r encoding=\"latin1\"/>"), None);
    }

    #[test]
    fn test_encoding_warning() {
        assert!(encoding_warning(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>").is_none());
        assert!(encoding_warning(b"<root/>").is_none());
        let warning = encoding_warning(b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>").unwrap();
        assert!(warning.contains("windows-1252"));
        assert!(encoding_warning(&[0xFF, 0xFE, b'<', 0x00]).is_some());
    }
}
