//! Body decoding by content type.
//!
//! Textual media types are decoded into `Content::Text` (invalid sequences
//! are replaced, never fatal). Everything else stays `Content::Binary` so
//! images and archives pass through untouched.

use bytes::Bytes;

use crate::proxy::types::Content;
use crate::rules::engine::media_type;

/// Media types outside `text/*` that are still decoded as text.
const TEXTUAL_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/ecmascript",
    "application/xml",
    "application/xhtml+xml",
    "application/rss+xml",
    "application/atom+xml",
    "application/x-www-form-urlencoded",
    "image/svg+xml",
];

pub fn is_textual(content_type: &str) -> bool {
    let media = media_type(content_type);
    media.starts_with("text/")
        || media.ends_with("+json")
        || media.ends_with("+xml")
        || TEXTUAL_TYPES.contains(&media.as_str())
}

/// Charset parameter of a content type, lowercased. Defaults to utf-8.
pub fn charset(content_type: &str) -> String {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, v)| v.trim().trim_matches('"').to_ascii_lowercase())
        .unwrap_or_else(|| "utf-8".to_string())
}

fn is_latin1(charset: &str) -> bool {
    matches!(charset, "iso-8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii")
}

/// Pick the content branch for `raw` based on `content_type`.
pub fn decode(raw: Bytes, content_type: &str) -> Content {
    if !is_textual(content_type) {
        return Content::Binary(raw);
    }

    let charset = charset(content_type);
    let text = if is_latin1(&charset) {
        raw.iter().map(|&b| b as char).collect()
    } else {
        String::from_utf8_lossy(&raw).into_owned()
    };
    Content::Text { text, charset }
}

impl Content {
    /// Encode back to bytes in the declared charset.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Content::Binary(raw) => raw.clone(),
            Content::Text { text, charset } if is_latin1(charset) => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect::<Vec<u8>>()
                .into(),
            Content::Text { text, .. } => Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_detection() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/json"));
        assert!(is_textual("application/ld+json"));
        assert!(is_textual("image/svg+xml"));
        assert!(!is_textual("image/png"));
        assert!(!is_textual("application/octet-stream"));
        assert!(!is_textual(""));
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset("text/html; charset=\"ISO-8859-1\""), "iso-8859-1");
        assert_eq!(charset("text/html"), "utf-8");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let content = decode(Bytes::from_static(b"ok \xff\xfe end"), "text/plain");
        let text = content.as_text().unwrap();
        assert!(text.starts_with("ok "));
        assert!(text.ends_with(" end"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_binary_untouched() {
        let raw = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0xff]);
        let content = decode(raw.clone(), "image/png");
        assert_eq!(content, Content::Binary(raw.clone()));
        assert_eq!(content.to_bytes(), raw);
    }

    #[test]
    fn test_latin1_round_trip() {
        let raw = Bytes::from_static(b"caf\xe9");
        let content = decode(raw.clone(), "text/plain; charset=iso-8859-1");
        assert_eq!(content.as_text(), Some("café"));
        assert_eq!(content.to_bytes(), raw);
    }
}
