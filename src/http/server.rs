//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the proxy and management endpoints
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Translate pipeline results into envelope or error responses
//! - Give middleware rejections (body limit, timeout) the same error object
//! - Serve until the shutdown coordinator fires

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::map_response_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Settings;
use crate::error::ProxyError;
use crate::http::request::{propagate_request_id_layer, request_id_of, set_request_id_layer};
use crate::proxy::{Headers, ProxyRequest, ProxyService};
use crate::rules::headers::{PROXIED_BY, PROXY_NAME};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: ProxyService,
}

/// Limits reported back in structured middleware rejections.
#[derive(Debug, Clone, Copy)]
struct LayerLimits {
    max_request_body: usize,
    request_timeout_secs: u64,
}

/// HTTP front of the proxy pipeline.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(settings: Settings, service: ProxyService) -> Self {
        let router = Self::build_router(&settings, AppState { service });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(settings: &Settings, state: AppState) -> Router {
        let prefix = settings.server.management_prefix.trim_end_matches('/');
        let limits = LayerLimits {
            max_request_body: settings.server.max_request_body,
            request_timeout_secs: settings.server.request_timeout_secs,
        };

        Router::new()
            .route("/proxy", get(proxy_query_handler).post(proxy_json_handler))
            .route(&format!("{}/health", prefix), get(health_handler))
            .route(&format!("{}/cache", prefix), get(cache_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(settings.server.max_request_body))
            .layer(TimeoutLayer::new(Duration::from_secs(settings.server.request_timeout_secs)))
            .layer(map_response_with_state(limits, structure_rejections))
            .layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(PROXIED_BY),
                HeaderValue::from_static(PROXY_NAME),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `POST /proxy` with a JSON [`ProxyRequest`].
async fn proxy_json_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        // Body cap hit while buffering; reported by `structure_rejections`.
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return rejection.into_response();
        }
        Err(rejection) => {
            return ProxyError::InvalidInput(rejection.body_text()).into_response();
        }
    };
    run_pipeline(&state, &headers, request).await
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

/// `GET /proxy?url=...`, equivalent to posting `{"url": ..., "method": "GET"}`.
async fn proxy_query_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ProxyQuery>, QueryRejection>,
) -> Response {
    let url = match query {
        Ok(Query(ProxyQuery { url: Some(url) })) => url,
        Ok(_) => return ProxyError::InvalidInput("missing url".to_string()).into_response(),
        Err(rejection) => return ProxyError::InvalidInput(rejection.body_text()).into_response(),
    };
    let request = ProxyRequest {
        url,
        method: "GET".to_string(),
        headers: Headers::new(),
        body: None,
    };
    run_pipeline(&state, &headers, request).await
}

async fn run_pipeline(state: &AppState, headers: &HeaderMap, request: ProxyRequest) -> Response {
    let request_id = request_id_of(headers);
    tracing::debug!(
        request_id = %request_id,
        method = %request.method,
        url = %request.url,
        "Proxying request"
    );

    match state.service.process(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::warn!(request_id = %request_id, code = %e.code(), error = %e, "Proxy request failed");
            e.into_response()
        }
    }
}

/// The body-limit and timeout layers answer with bare statuses.
async fn structure_rejections(State(limits): State<LayerLimits>, response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return response;
    }

    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ProxyError::ContentTooLarge {
            limit: limits.max_request_body,
        }
        .into_response(),
        StatusCode::REQUEST_TIMEOUT => {
            tracing::warn!(timeout_secs = limits.request_timeout_secs, "Request exceeded server timeout");
            ProxyError::UpstreamTimeout(limits.request_timeout_secs).into_response()
        }
        _ => response,
    }
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    enabled: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let enabled = state.service.config().resolve().enabled;
    Json(HealthStatus {
        status: if enabled { "operational" } else { "disabled" },
        version: env!("CARGO_PKG_VERSION"),
        enabled,
    })
}

#[derive(Debug, Serialize)]
struct CacheStatus {
    strategy: &'static str,
    entries: Option<usize>,
}

async fn cache_handler(State(state): State<AppState>) -> Json<CacheStatus> {
    let cache = state.service.cache();
    Json(CacheStatus {
        strategy: cache.strategy(),
        entries: cache.store().entry_count(),
    })
}
