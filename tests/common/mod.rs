//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flate2::{write::GzEncoder, Compression};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use rewrite_proxy::cache::{strategy_for, MemoryCacheStore, ServerCache};
use rewrite_proxy::config::{ConfigProvider, ProxyConfig, Settings};
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::lifecycle::Shutdown;
use rewrite_proxy::proxy::ProxyService;
use rewrite_proxy::upstream::HttpFetcher;

/// Canned origin reply.
#[derive(Debug, Clone)]
pub struct OriginReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Delay before answering.
    pub delay: Duration,
    /// Gzip the body when the request accepts it.
    pub gzip: bool,
}

impl OriginReply {
    pub fn ok(content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
            delay: Duration::ZERO,
            gzip: false,
        }
    }

    pub fn gzipped(self) -> Self {
        Self { gzip: true, ..self }
    }

    pub fn stalled() -> Self {
        Self {
            delay: Duration::from_secs(30),
            ..Self::ok("text/plain", "")
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn answer(mut socket: TcpStream, reply: OriginReply) {
    // Drain the request head so the close is clean.
    let mut buf = [0u8; 8192];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let request = String::from_utf8_lossy(&buf[..n]).to_ascii_lowercase();

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let accepts_gzip = request
        .lines()
        .any(|line| line.starts_with("accept-encoding:") && line.contains("gzip"));
    let (body, encoding) = if reply.gzip && accepts_gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(reply.body.as_bytes()).unwrap();
        (encoder.finish().unwrap(), "Content-Encoding: gzip\r\n")
    } else {
        (reply.body.into_bytes(), "")
    };

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status,
        reason(reply.status),
        reply.content_type,
        encoding,
        body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&body).await;
    let _ = socket.shutdown().await;
}

/// Start a mock origin that always returns `reply`.
pub async fn start_mock_origin(reply: OriginReply) -> SocketAddr {
    start_programmable_origin(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Start a mock origin whose reply is computed per connection.
pub async fn start_programmable_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OriginReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let reply = f().await;
                answer(socket, reply).await;
            });
        }
    });

    addr
}

/// Fetcher that resolves every `hosts` entry to the origin at `origin`.
pub fn fetcher_for(hosts: &[&str], origin: SocketAddr) -> HttpFetcher {
    let mut builder = reqwest::Client::builder().no_proxy().pool_max_idle_per_host(0);
    for host in hosts {
        builder = builder.resolve(host, origin);
    }
    HttpFetcher::with_client(builder.build().unwrap())
}

/// A proxy server running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub store: MemoryCacheStore,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(settings: Settings, fetcher: HttpFetcher) -> TestProxy {
    let store = MemoryCacheStore::new();
    let cache = ServerCache::new(Arc::new(store.clone()), strategy_for(settings.cache.key_strategy));
    let provider = Arc::new(ConfigProvider::fixed(settings.proxy.clone()));
    let service = ProxyService::new(provider, Arc::new(fetcher)).with_cache(cache);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(settings, service);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestProxy { addr, store, shutdown }
}

pub fn settings_with(proxy: ProxyConfig) -> Settings {
    Settings {
        proxy,
        ..Settings::default()
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
