//! Outbound fetch to the origin.
//!
//! # Responsibilities
//! - Send the rewritten request with a wall-clock deadline
//! - Reject oversized bodies as soon as the cap is crossed
//! - Strip hop-by-hop response headers
//!
//! # Design Decisions
//! - The deadline covers connect, headers and body; it is the only way an
//!   in-flight fetch is cancelled
//! - A declared `content-length` over the cap is rejected before reading,
//!   except for `HEAD` where no body follows
//! - gzip, brotli and deflate bodies are decoded by the client; the cap
//!   applies to the decoded size
//! - Bodies are read chunk by chunk so memory stays bounded by the cap

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use thiserror::Error;
use url::Url;

use crate::proxy::types::Headers;

/// Response headers never propagated past the fetcher.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] = &["set-cookie", "connection", "transfer-encoding"];

/// Failure of a single origin fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("fetch timed out after {0} seconds")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("request could not be built: {0}")]
    InvalidRequest(String),
}

/// Everything the fetcher needs for one call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub method: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub timeout: Duration,
    pub max_bytes: usize,
}

/// What came back from the origin, before any transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub content_type: String,
    pub body: Bytes,
}

#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<RawResponse, FetchError>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: FetchRequest) -> Result<RawResponse, FetchError> {
        let timeout_secs = request.timeout.as_secs();
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout_secs)
            } else if e.is_builder() {
                FetchError::InvalidRequest(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        };

        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let is_head = method == reqwest::Method::HEAD;
        let sends_body = !is_head && method != reqwest::Method::GET;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let (true, Some(body)) = (sends_body, request.body) {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let limit = request.max_bytes;
        if let (false, Some(declared)) = (is_head, response.content_length()) {
            if declared > limit as u64 {
                tracing::warn!(url = %request.url, declared, limit, "Declared body exceeds cap");
                return Err(FetchError::TooLarge { limit });
            }
        }

        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str(), value);
            }
        }
        for name in STRIPPED_RESPONSE_HEADERS {
            headers.remove(name);
        }
        let content_type = headers.get("content-type").unwrap_or_default().to_string();

        let capacity = response.content_length().unwrap_or(0).min(limit as u64) as usize;
        let mut body = BytesMut::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            if body.len() + chunk.len() > limit {
                tracing::warn!(url = %request.url, limit, "Body crossed cap while streaming");
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            content_type,
            body: body.freeze(),
        })
    }
}

#[async_trait]
impl OriginFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<RawResponse, FetchError> {
        let deadline = request.timeout;
        let url = request.url.clone();
        match tokio::time::timeout(deadline, self.execute(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(url = %url, timeout_secs = deadline.as_secs(), "Origin fetch timed out");
                Err(FetchError::Timeout(deadline.as_secs()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one raw HTTP response per connection.
    async fn serve_raw(response: Vec<u8>, delay: Duration) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(delay).await;
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    fn request(addr: SocketAddr, max_bytes: usize, timeout: Duration) -> FetchRequest {
        FetchRequest {
            url: Url::parse(&format!("http://{}/", addr)).unwrap(),
            method: "GET".into(),
            headers: Headers::new(),
            body: None,
            timeout,
            max_bytes,
        }
    }

    #[tokio::test]
    async fn test_fetch_strips_hop_by_hop() {
        let body = "<h1>hello</h1>";
        let raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nSet-Cookie: a=b\r\nX-Custom: yes\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let addr = serve_raw(raw.into_bytes(), Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher.fetch(request(addr, 1024, Duration::from_secs(5))).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.content_type, "text/html");
        assert_eq!(response.body, Bytes::from(body));
        assert!(!response.headers.contains("set-cookie"));
        assert!(!response.headers.contains("connection"));
        assert_eq!(response.headers.get("x-custom"), Some("yes"));
    }

    #[tokio::test]
    async fn test_declared_length_over_cap() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5000\r\nConnection: close\r\n\r\n";
        let addr = serve_raw(raw.as_bytes().to_vec(), Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(request(addr, 100, Duration::from_secs(5))).await.unwrap_err();
        assert_eq!(err, FetchError::TooLarge { limit: 100 });
    }

    #[tokio::test]
    async fn test_head_ignores_declared_length() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5000\r\nConnection: close\r\n\r\n";
        let addr = serve_raw(raw.as_bytes().to_vec(), Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let mut head = request(addr, 100, Duration::from_secs(5));
        head.method = "HEAD".into();
        let response = fetcher.fetch(head).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_gzip_body_is_decoded() {
        let page = "<html>hello world</html>";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(page.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            compressed.len()
        )
        .into_bytes();
        raw.extend_from_slice(&compressed);
        let addr = serve_raw(raw, Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher.fetch(request(addr, 1024, Duration::from_secs(5))).await.unwrap();
        assert_eq!(response.body, Bytes::from(page));
        assert!(!response.headers.contains("content-encoding"));
    }

    #[tokio::test]
    async fn test_streamed_body_over_cap() {
        // No content-length: the cap has to be enforced while reading.
        let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n".to_vec();
        raw.extend(std::iter::repeat(b'x').take(4096));
        let addr = serve_raw(raw, Duration::ZERO).await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(request(addr, 1000, Duration::from_secs(5))).await.unwrap_err();
        assert_eq!(err, FetchError::TooLarge { limit: 1000 });
    }

    #[tokio::test]
    async fn test_timeout() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        let addr = serve_raw(raw.as_bytes().to_vec(), Duration::from_secs(5)).await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(request(addr, 100, Duration::from_millis(200))).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(request(addr, 100, Duration::from_secs(5))).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
