//! Domain allow/block evaluation.
//!
//! Entries are host fragments: a host matches an entry when it contains it,
//! compared case-insensitively. The block-list is consulted first and wins
//! even when the same host is on the allow-list.

use crate::pipeline::RejectReason;

/// Outcome of checking a host against the domain lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainVerdict {
    Allowed,
    Blocked,
    NotAllowed,
}

impl DomainVerdict {
    pub fn into_result(self) -> Result<(), RejectReason> {
        match self {
            DomainVerdict::Allowed => Ok(()),
            DomainVerdict::Blocked => Err(RejectReason::DomainBlocked),
            DomainVerdict::NotAllowed => Err(RejectReason::DomainNotAllowed),
        }
    }
}

/// Lowercased copy of the configured lists.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl DomainPolicy {
    pub fn new(allowed: &[String], blocked: &[String]) -> Self {
        Self {
            allowed: normalize(allowed),
            blocked: normalize(blocked),
        }
    }

    pub fn evaluate(&self, host: &str) -> DomainVerdict {
        let host = host.to_ascii_lowercase();

        if matches_any(&host, &self.blocked) {
            return DomainVerdict::Blocked;
        }
        if !self.allowed.is_empty() && !matches_any(&host, &self.allowed) {
            return DomainVerdict::NotAllowed;
        }
        DomainVerdict::Allowed
    }
}

/// Case-insensitive substring match against any entry.
pub fn matches_any(host: &str, entries: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    entries
        .iter()
        .any(|entry| !entry.is_empty() && host.contains(&entry.to_ascii_lowercase()))
}

fn normalize(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_lists_allow_everything() {
        let policy = DomainPolicy::new(&[], &[]);
        for host in ["example.com", "a.b.c.d", "localhost", "192.168.0.1"] {
            assert_eq!(policy.evaluate(host), DomainVerdict::Allowed);
        }
    }

    #[test]
    fn test_block_takes_precedence() {
        let policy = DomainPolicy::new(&list(&["blocked-site.com"]), &list(&["blocked-site.com"]));
        assert_eq!(policy.evaluate("blocked-site.com"), DomainVerdict::Blocked);
        assert_eq!(policy.evaluate("www.blocked-site.com"), DomainVerdict::Blocked);
    }

    #[test]
    fn test_allow_list_is_block_by_default() {
        let policy = DomainPolicy::new(&list(&["example.com"]), &[]);
        assert_eq!(policy.evaluate("cdn.example.com"), DomainVerdict::Allowed);
        assert_eq!(policy.evaluate("other.org"), DomainVerdict::NotAllowed);
    }

    #[test]
    fn test_case_insensitive() {
        let policy = DomainPolicy::new(&[], &list(&["Tracker.NET"]));
        assert_eq!(policy.evaluate("ads.tracker.net"), DomainVerdict::Blocked);
        assert_eq!(
            DomainVerdict::Blocked.into_result(),
            Err(RejectReason::DomainBlocked)
        );
    }
}
