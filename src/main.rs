//! Rewriting forward proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /proxy {url, method, headers, body}      GET /proxy?url=...
//!          │                                             │
//!          └──────────────────┬──────────────────────────┘
//!                             ▼
//!                   ┌───────────────────┐    ┌──────────────────────────┐
//!                   │   http server     │    │ config provider          │
//!                   │ (axum + tower)    │    │ file → snapshot → default│
//!                   └─────────┬─────────┘    └────────────┬─────────────┘
//!                             ▼                           │
//!                   ┌───────────────────┐                 │
//!                   │  proxy service    │◀────────────────┘
//!                   │ rewrite → fetch → │
//!                   │ transform → cache │──▶ origin
//!                   └─────────┬─────────┘
//!                             ▼
//!                      JSON envelope | error body
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::cache::{strategy_for, CacheSweeper, MemoryCacheStore, ServerCache};
use rewrite_proxy::config::loader::load_config;
use rewrite_proxy::config::watcher::ConfigWatcher;
use rewrite_proxy::config::{ConfigProvider, ConfigStore, FileConfigStore, Settings, SnapshotStore};
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::lifecycle::{wait_for_signal, Shutdown};
use rewrite_proxy::observability::{logging, metrics};
use rewrite_proxy::proxy::ProxyService;
use rewrite_proxy::upstream::HttpFetcher;

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Rewriting forward proxy with two-tier caching", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (mut settings, load_error) = match load_config(&args.config) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    if let Some(bind) = args.bind {
        settings.server.bind_address = bind;
    }

    logging::init_tracing(&settings.observability)?;
    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let config_found = load_error.is_none();
    if let Some(e) = load_error {
        tracing::warn!(
            path = %args.config.display(),
            error = %e,
            "Config file unavailable, starting with defaults"
        );
    }

    tracing::info!(
        bind_address = %settings.server.bind_address,
        key_strategy = ?settings.cache.key_strategy,
        request_timeout_secs = settings.server.request_timeout_secs,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Per-request proxy config: watched file first, then the last good snapshot.
    let snapshot = Arc::new(SnapshotStore::new());
    if let Err(e) = snapshot.store(settings.proxy.clone()) {
        tracing::warn!(error = %e, "Initial proxy config rejected, snapshot left empty");
    }
    let file_store = config_found.then(|| Arc::new(FileConfigStore::open(&args.config)));
    let primary = file_store.clone().map(|store| store as Arc<dyn ConfigStore>);
    let provider = Arc::new(ConfigProvider::new(primary, snapshot));

    let _watcher = match file_store.map(|store| ConfigWatcher::new(store).run()) {
        Some(Ok(w)) => Some(w),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
        None => {
            tracing::warn!("No config file, hot reload disabled");
            None
        }
    };

    let store = MemoryCacheStore::new();
    let cache = ServerCache::new(Arc::new(store.clone()), strategy_for(settings.cache.key_strategy));
    let fetcher = Arc::new(HttpFetcher::new()?);
    let service = ProxyService::new(provider, fetcher).with_cache(cache);

    let shutdown = Shutdown::new();

    let sweeper = CacheSweeper::new(store, Duration::from_secs(settings.cache.sweep_interval_secs));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&settings.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(settings, service);
    let server_handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    let notified = shutdown.trigger();
    tracing::info!(tasks = notified, "Shutdown signal broadcast");

    server_handle.await??;
    let _ = sweeper_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
