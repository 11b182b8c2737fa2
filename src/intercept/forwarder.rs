//! Hands intercepted requests to the proxy pipeline.
//!
//! [`RemoteForwarder`] posts the request as JSON to a running proxy server;
//! [`LocalForwarder`] calls a [`ProxyService`] in-process.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{ErrorBody, ProxyError};
use crate::proxy::{ProxyRequest, ProxyResponse, ProxyService};

#[derive(Debug, Error)]
pub enum ForwardError {
    /// Proxy answered with a non-success status.
    #[error("proxy returned status {status}")]
    Status { status: u16, body: Option<ErrorBody> },

    #[error("proxy unreachable: {0}")]
    Transport(String),

    #[error("proxy did not answer within {0:?}")]
    Timeout(Duration),

    #[error("malformed proxy response: {0}")]
    Decode(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: &ProxyRequest) -> Result<ProxyResponse, ForwardError>;
}

/// Forwards over HTTP to `POST {base}/proxy`.
#[derive(Clone)]
pub struct RemoteForwarder {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteForwarder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| ForwardError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: format!("{}/proxy", base_url.trim_end_matches('/')),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exchange(&self, request: &ProxyRequest) -> Result<ProxyResponse, ForwardError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
            return Err(ForwardError::Status { status, body });
        }

        serde_json::from_slice(&bytes).map_err(|e| ForwardError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Forwarder for RemoteForwarder {
    /// The deadline covers the whole exchange, body included.
    async fn forward(&self, request: &ProxyRequest) -> Result<ProxyResponse, ForwardError> {
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(endpoint = %self.endpoint, timeout = ?self.timeout, "Forwarding timed out");
                Err(ForwardError::Timeout(self.timeout))
            }
        }
    }
}

/// Runs the pipeline in-process.
#[derive(Clone)]
pub struct LocalForwarder {
    service: ProxyService,
}

impl LocalForwarder {
    pub fn new(service: ProxyService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Forwarder for LocalForwarder {
    async fn forward(&self, request: &ProxyRequest) -> Result<ProxyResponse, ForwardError> {
        Ok(self.service.process(request.clone()).await?)
    }
}
