//! Fronting substitution for sensitive hosts.
//!
//! The request is re-addressed to the configured front host and the real
//! target travels as a query parameter. This hides the target from a casual
//! glance at the URL only. TLS SNI, DNS, and the front host itself all still
//! see enough to reconstruct it, so treat it as cosmetic.

use url::Url;

use crate::config::FrontingConfig;
use crate::rules::domain::matches_any;

/// Returns the fronted URL when `target` is on the sensitive list.
pub fn front(target: &Url, config: &FrontingConfig) -> Option<Url> {
    if !config.enabled {
        return None;
    }
    let host = target.host_str()?;
    if !matches_any(host, &config.sensitive_domains) {
        return None;
    }

    let mut fronted = Url::parse(&format!("https://{}/", config.front_host.trim())).ok()?;
    fronted
        .query_pairs_mut()
        .append_pair(&config.param, target.as_str());
    Some(fronted)
}

/// Recover the original target from a fronted URL.
pub fn unfront(fronted: &Url, param: &str) -> Option<String> {
    fronted
        .query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.into_owned())
}
