//! Outbound header policy.
//!
//! # Responsibilities
//! - Drop identity-correlating headers (cookie, referer, origin)
//! - Replace the user agent with one from a fixed pool
//! - Inject a synthetic forwarding address and a proxy marker
//! - Drop hop-by-hop headers the origin connection manages itself
//!
//! The substitutions are cosmetic. The pool has three entries and the
//! forwarding address is random noise shaped like IPv4.

use crate::proxy::types::Headers;
use crate::rules::random::RandomSource;

/// Headers removed from every outbound request.
pub const IDENTITY_HEADERS: &[&str] = &["cookie", "referer", "origin"];

/// Request headers the client connection must set itself. The fetcher
/// negotiates (and undoes) content encoding on its own.
const HOP_BY_HOP: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "accept-encoding",
];

pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const PROXIED_BY: &str = "x-proxied-by";
pub const PROXY_NAME: &str = concat!("rewrite-proxy/", env!("CARGO_PKG_VERSION"));

/// Sanitize `headers` for the origin request.
pub fn apply_header_policy(mut headers: Headers, random: &dyn RandomSource) -> Headers {
    for name in IDENTITY_HEADERS.iter().chain(HOP_BY_HOP) {
        headers.remove(name);
    }

    let agent = USER_AGENTS[random.pick(USER_AGENTS.len())];
    headers.insert("user-agent", agent);
    headers.insert(FORWARDED_FOR, synthetic_address(random));
    headers.insert(PROXIED_BY, PROXY_NAME);

    headers
}

/// Four octets in 1..=254.
fn synthetic_address(random: &dyn RandomSource) -> String {
    let octet = || 1 + random.pick(254);
    format!("{}.{}.{}.{}", octet(), octet(), octet(), octet())
}
