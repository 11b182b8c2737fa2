//! Which outbound requests get intercepted.
//!
//! Runs before any network call. A request is left alone when:
//! - its scheme is not a network scheme (`data:`, `blob:`, extensions, ...)
//! - it targets the proxy's own control host
//! - its path is under the management prefix
//! - its path contains a `.` (treated as a static asset)
//!
//! The last rule is a heuristic and exempts e.g. `/index.html` as well.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptReason {
    NonNetworkScheme,
    ControlHost,
    ManagementPath,
    StaticAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Intercept,
    Exempt(ExemptReason),
}

/// Exemption rules for one proxy deployment.
#[derive(Debug, Clone)]
pub struct InterceptPolicy {
    control_host: String,
    management_prefix: String,
}

impl InterceptPolicy {
    pub fn new(control_host: impl Into<String>, management_prefix: impl Into<String>) -> Self {
        Self {
            control_host: control_host.into().to_ascii_lowercase(),
            management_prefix: management_prefix.into(),
        }
    }

    /// Unparseable URLs are intercepted so the pipeline can reject them
    /// with a structured error.
    pub fn decide(&self, raw_url: &str) -> Decision {
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(_) => return Decision::Intercept,
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Decision::Exempt(ExemptReason::NonNetworkScheme);
        }
        if self.is_control_host(&url) {
            return Decision::Exempt(ExemptReason::ControlHost);
        }

        let path = url.path();
        if !self.management_prefix.is_empty() && path.starts_with(&self.management_prefix) {
            return Decision::Exempt(ExemptReason::ManagementPath);
        }
        if path.contains('.') {
            return Decision::Exempt(ExemptReason::StaticAsset);
        }

        Decision::Intercept
    }

    fn is_control_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        if host == self.control_host {
            return true;
        }
        match url.port() {
            Some(port) => format!("{host}:{port}") == self.control_host,
            None => false,
        }
    }
}
