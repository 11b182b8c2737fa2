//! The rewrite step: validated, policy-checked, rewritten target.

use std::sync::Arc;

use url::Url;

use crate::config::ProxyConfig;
use crate::pipeline::fronting;
use crate::pipeline::RejectReason;
use crate::proxy::types::{Headers, ProxyRequest};
use crate::rules::{apply_header_policy, RandomSource, RuleEngine, ThreadRandom};

/// Where and how the origin should be contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub url: Url,
    pub headers: Headers,
    /// True when the URL was replaced by a fronting substitution.
    pub fronted: bool,
}

/// Applies URL rules, domain policy, fronting and header policy.
#[derive(Clone)]
pub struct Rewriter {
    random: Arc<dyn RandomSource>,
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

impl Rewriter {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Rewrite `request` under `config`. `engine` must be compiled from the
    /// same config.
    pub fn rewrite(
        &self,
        request: &ProxyRequest,
        config: &ProxyConfig,
        engine: &RuleEngine,
    ) -> Result<RewriteResult, RejectReason> {
        let original = parse_target(&request.url)?;
        let host = original.host_str().ok_or(RejectReason::InvalidUrl)?;

        engine.check_domain(host).into_result()?;

        let rewritten = engine.apply_url_rules(original.as_str());
        let mut url = parse_target(&rewritten)?;
        if rewritten != original.as_str() {
            tracing::debug!(from = %original, to = %url, "URL rewritten");
        }

        let fronted = match fronting::front(&url, &config.fronting) {
            Some(front) => {
                tracing::debug!(front_host = ?front.host_str(), "Fronting substitution applied");
                url = front;
                true
            }
            None => false,
        };

        let headers = apply_header_policy(request.headers.clone(), self.random.as_ref());
        let headers = engine.apply_header_rules(headers);

        Ok(RewriteResult { url, headers, fronted })
    }
}

/// Parse an absolute http(s) URL with a host.
pub fn parse_target(raw: &str) -> Result<Url, RejectReason> {
    let url = Url::parse(raw.trim()).map_err(|_| RejectReason::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(RejectReason::InvalidUrl),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RejectReason::InvalidUrl);
    }
    Ok(url)
}
