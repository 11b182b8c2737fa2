//! Request, response, and header types shared by the pipeline stages.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use bytes::Bytes;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Header map with case-insensitive names.
///
/// Names are stored lowercased. Inserting a name that differs only in case
/// replaces the earlier value (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// Deserialized in document order so duplicate names resolve to the last one.
impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((k, v)) = map.next_entry::<String, String>()? {
                    headers.insert(k, v);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// One intercepted call, as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: Headers,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ProxyRequest {
    /// A bare `GET` for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Identity used by the client-tier cache: method plus the original URL.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.url)
    }
}

/// Response body, split by whether it can be treated as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Decoded text and the charset it was declared in.
    Text { text: String, charset: String },
    Binary(Bytes),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text {
            text: text.into(),
            charset: "utf-8".to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text, .. } => Some(text),
            Content::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Content::Text { text, .. } => text.len(),
            Content::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final result of the pipeline for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ResponseEnvelope", try_from = "ResponseEnvelope")]
pub struct ProxyResponse {
    pub content: Content,
    pub content_type: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub cacheable: bool,
}

impl ProxyResponse {
    /// Placeholder served when the pipeline fails and nothing is cached.
    pub fn unavailable() -> Self {
        Self {
            content: Content::text(UNAVAILABLE_BODY),
            content_type: "text/plain; charset=utf-8".to_string(),
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers: Headers::new(),
            cacheable: false,
        }
    }
}

/// Body of the fixed unavailable response.
pub const UNAVAILABLE_BODY: &str = "Content temporarily unavailable";

/// Wire shape of [`ProxyResponse`]. Binary bodies travel as base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseEnvelope {
    content: String,
    #[serde(default = "text_encoding")]
    encoding: String,
    #[serde(default)]
    charset: Option<String>,
    content_type: String,
    status: u16,
    status_text: String,
    #[serde(default)]
    headers: Headers,
    cacheable: bool,
}

fn text_encoding() -> String {
    "text".to_string()
}

impl From<ProxyResponse> for ResponseEnvelope {
    fn from(response: ProxyResponse) -> Self {
        let (content, encoding, charset) = match response.content {
            Content::Text { text, charset } => (text, text_encoding(), Some(charset)),
            Content::Binary(bytes) => (
                base64::engine::general_purpose::STANDARD.encode(&bytes),
                "base64".to_string(),
                None,
            ),
        };
        Self {
            content,
            encoding,
            charset,
            content_type: response.content_type,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            cacheable: response.cacheable,
        }
    }
}

impl TryFrom<ResponseEnvelope> for ProxyResponse {
    type Error = String;

    fn try_from(envelope: ResponseEnvelope) -> Result<Self, Self::Error> {
        let content = match envelope.encoding.as_str() {
            "text" => Content::Text {
                text: envelope.content,
                charset: envelope.charset.unwrap_or_else(|| "utf-8".to_string()),
            },
            "base64" => base64::engine::general_purpose::STANDARD
                .decode(envelope.content.as_bytes())
                .map(|raw| Content::Binary(Bytes::from(raw)))
                .map_err(|e| format!("invalid base64 content: {e}"))?,
            other => return Err(format!("unknown content encoding: {other}")),
        };
        Ok(Self {
            content,
            content_type: envelope.content_type,
            status: envelope.status,
            status_text: envelope.status_text,
            headers: envelope.headers,
            cacheable: envelope.cacheable,
        })
    }
}
