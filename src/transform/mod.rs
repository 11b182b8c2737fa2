//! Response transformation.
//!
//! # Responsibilities
//! - Decode the raw body into text or binary content
//! - Apply content rules that accept the response's media type
//! - Decide cacheability and build the final `ProxyResponse`
//!
//! # Design Decisions
//! - Binary bodies are never run through content rules
//! - A body still carrying a `content-encoding` the fetcher could not undo
//!   is passed through as binary and never cached
//! - Length headers are dropped once a body has been rewritten

use crate::cache::policy::is_cacheable;
use crate::proxy::types::{Content, ProxyResponse};
use crate::rules::RuleEngine;
use crate::upstream::body;
use crate::upstream::RawResponse;

/// Turn a raw origin response into the response handed back to callers.
pub fn transform(raw: RawResponse, engine: &RuleEngine) -> ProxyResponse {
    let RawResponse {
        status,
        status_text,
        mut headers,
        content_type,
        body: raw_body,
    } = raw;

    let encoded = headers
        .get("content-encoding")
        .is_some_and(|encoding| !encoding.trim().eq_ignore_ascii_case("identity"));

    let decoded = if encoded {
        Content::Binary(raw_body)
    } else {
        body::decode(raw_body, &content_type)
    };

    let content = match decoded {
        Content::Text { text, charset } if engine.has_content_rules() => {
            let rewritten = engine.apply_content_rules(&text, &content_type);
            if rewritten != text {
                tracing::debug!(before = text.len(), after = rewritten.len(), "Content rewritten");
                headers.remove("content-length");
                headers.remove("etag");
            }
            Content::Text { text: rewritten, charset }
        }
        other => other,
    };

    let mut response = ProxyResponse {
        content,
        content_type,
        status,
        status_text,
        headers,
        cacheable: false,
    };
    response.cacheable = !encoded && is_cacheable(&response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, RuleKind, TransformRule};
    use crate::proxy::types::Headers;
    use bytes::Bytes;

    fn raw(status: u16, content_type: &str, body: &'static [u8]) -> RawResponse {
        let mut headers = Headers::new();
        headers.insert("content-type", content_type);
        headers.insert("content-length", body.len().to_string());
        RawResponse {
            status,
            status_text: "OK".into(),
            headers,
            content_type: content_type.into(),
            body: Bytes::from_static(body),
        }
    }

    fn engine(rules: Vec<TransformRule>) -> RuleEngine {
        RuleEngine::compile(&ProxyConfig {
            transform_rules: rules,
            ..ProxyConfig::default()
        })
    }

    #[test]
    fn test_html_rewritten_and_cacheable() {
        let engine = engine(vec![TransformRule::new(RuleKind::Content, "foo", "bar")]);
        let response = transform(raw(200, "text/html", b"foo foo"), &engine);

        assert_eq!(response.content.as_text(), Some("bar bar"));
        assert!(!response.headers.contains("content-length"));
        assert!(response.cacheable);
    }

    #[test]
    fn test_binary_passes_through() {
        let engine = engine(vec![TransformRule::new(RuleKind::Content, "P", "Q")]);
        let response = transform(raw(200, "image/png", b"\x89PNG"), &engine);

        assert_eq!(response.content, Content::Binary(Bytes::from_static(b"\x89PNG")));
        assert!(response.headers.contains("content-length"));
    }

    #[test]
    fn test_undecoded_body_not_rewritten_or_cached() {
        let engine = engine(vec![TransformRule::new(RuleKind::Content, "x", "y")]);
        let mut encoded = raw(200, "text/html", b"\x28\xb5\x2f\xfdx");
        encoded.headers.insert("content-encoding", "zstd");

        let response = transform(encoded, &engine);
        assert_eq!(response.content, Content::Binary(Bytes::from_static(b"\x28\xb5\x2f\xfdx")));
        assert!(!response.cacheable);
    }

    #[test]
    fn test_json_not_cacheable() {
        let response = transform(raw(200, "application/json", b"{}"), &engine(vec![]));
        assert!(!response.cacheable);
    }

    #[test]
    fn test_error_status_not_cacheable() {
        let response = transform(raw(404, "text/html", b"missing"), &engine(vec![]));
        assert_eq!(response.status, 404);
        assert!(!response.cacheable);
    }
}
