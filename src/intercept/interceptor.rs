//! Per-request interception lifecycle.
//!
//! ```text
//! Idle → Deciding ─exempt──────────────────────→ Bypass
//!                 └intercept→ Forwarding ─ok───→ Succeeded (client cache write)
//!                                        └err──→ Failed (client cache read | 503)
//! ```
//!
//! Every intercepted request ends in exactly one terminal state and always
//! carries a response the caller can hand back.

use std::sync::Arc;

use crate::cache::ClientCache;
use crate::intercept::decision::{Decision, InterceptPolicy};
use crate::intercept::forwarder::{ForwardError, Forwarder};
use crate::proxy::{ProxyRequest, ProxyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptState {
    Idle,
    Deciding,
    Forwarding,
    Succeeded,
    Failed,
}

/// Terminal result of [`Interceptor::handle`].
#[derive(Debug)]
pub enum Outcome {
    /// Exempt; the caller performs the request itself.
    Bypass(ProxyRequest),
    Succeeded(ProxyResponse),
    Failed {
        response: ProxyResponse,
        from_cache: bool,
        error: ForwardError,
    },
}

impl Outcome {
    pub fn state(&self) -> InterceptState {
        match self {
            Outcome::Succeeded(_) => InterceptState::Succeeded,
            Outcome::Failed { .. } => InterceptState::Failed,
            // Never left Deciding.
            Outcome::Bypass(_) => InterceptState::Deciding,
        }
    }

    /// The response to return, if the request was intercepted.
    pub fn into_response(self) -> Option<ProxyResponse> {
        match self {
            Outcome::Bypass(_) => None,
            Outcome::Succeeded(response) => Some(response),
            Outcome::Failed { response, .. } => Some(response),
        }
    }
}

pub struct Interceptor {
    policy: InterceptPolicy,
    forwarder: Arc<dyn Forwarder>,
    cache: ClientCache,
}

impl Interceptor {
    pub fn new(policy: InterceptPolicy, forwarder: Arc<dyn Forwarder>, cache: ClientCache) -> Self {
        Self {
            policy,
            forwarder,
            cache,
        }
    }

    pub async fn handle(&self, mut request: ProxyRequest) -> Outcome {
        let mut state = InterceptState::Idle;
        tracing::trace!(?state, url = %request.url, "Intercept start");

        state = InterceptState::Deciding;
        if let Decision::Exempt(reason) = self.policy.decide(&request.url) {
            tracing::trace!(?state, ?reason, url = %request.url, "Request exempt");
            return Outcome::Bypass(request);
        }

        if matches!(request.method.to_ascii_uppercase().as_str(), "GET" | "HEAD") {
            request.body = None;
        }

        state = InterceptState::Forwarding;
        tracing::debug!(?state, method = %request.method, url = %request.url, "Forwarding to proxy");

        match self.forwarder.forward(&request).await {
            Ok(response) => {
                self.cache.remember(&request, &response).await;
                Outcome::Succeeded(response)
            }
            Err(error) => {
                tracing::warn!(url = %request.url, error = %error, "Forwarding failed, using fallback");
                let cached = self.cache.lookup(&request).await;
                let from_cache = cached.is_some();
                Outcome::Failed {
                    response: cached.unwrap_or_else(ProxyResponse::unavailable),
                    from_cache,
                    error,
                }
            }
        }
    }
}
