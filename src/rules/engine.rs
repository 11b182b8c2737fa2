//! Rule compilation and application.
//!
//! Rules are compiled once per request cycle from the resolved config. A
//! rule whose pattern does not compile is left out of the set and recorded
//! in [`RuleEngine::failures`]; the remaining rules still apply.

use std::borrow::Cow;

use regex::Regex;
use thiserror::Error;

use crate::config::{ProxyConfig, RuleKind, TransformRule};
use crate::observability::metrics;
use crate::proxy::types::Headers;
use crate::rules::domain::{DomainPolicy, DomainVerdict};

/// A rule that could not be compiled.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} rule #{index} has invalid pattern '{pattern}': {message}")]
pub struct RuleError {
    pub index: usize,
    pub kind: RuleKind,
    pub pattern: String,
    pub message: String,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    replacement: String,
    content_types: Vec<String>,
}

impl CompiledRule {
    fn applies_to(&self, media_type: &str) -> bool {
        self.content_types.is_empty()
            || self
                .content_types
                .iter()
                .any(|prefix| media_type.starts_with(&prefix.to_ascii_lowercase()))
    }
}

/// Compiled view of one config snapshot.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    url: Vec<CompiledRule>,
    header: Vec<CompiledRule>,
    content: Vec<CompiledRule>,
    domains: DomainPolicy,
    failures: Vec<RuleError>,
}

impl RuleEngine {
    pub fn compile(config: &ProxyConfig) -> Self {
        let mut engine = RuleEngine {
            domains: DomainPolicy::new(&config.allowed_domains, &config.blocked_domains),
            ..Default::default()
        };

        for (index, rule) in config.transform_rules.iter().enumerate() {
            match compile_rule(rule) {
                Ok(compiled) => match rule.kind {
                    RuleKind::Url => engine.url.push(compiled),
                    RuleKind::Header => engine.header.push(compiled),
                    RuleKind::Content => engine.content.push(compiled),
                },
                Err(e) => {
                    let err = RuleError {
                        index,
                        kind: rule.kind,
                        pattern: rule.pattern.clone(),
                        message: e.to_string(),
                    };
                    tracing::warn!(error = %err, "Skipping transform rule");
                    metrics::record_rule_failure(rule.kind);
                    engine.failures.push(err);
                }
            }
        }

        engine
    }

    /// Rules that were dropped at compile time.
    pub fn failures(&self) -> &[RuleError] {
        &self.failures
    }

    pub fn check_domain(&self, host: &str) -> DomainVerdict {
        self.domains.evaluate(host)
    }

    /// Apply URL rules in order, each replacing every match.
    pub fn apply_url_rules(&self, url: &str) -> String {
        apply_sequence(&self.url, url).unwrap_or_else(|| url.to_string())
    }

    /// Apply header rules to every header value, in order.
    pub fn apply_header_rules(&self, mut headers: Headers) -> Headers {
        if self.header.is_empty() {
            return headers;
        }
        for value in headers.values_mut() {
            if let Some(rewritten) = apply_sequence(&self.header, value) {
                *value = rewritten;
            }
        }
        headers
    }

    /// Apply content rules that accept `content_type`.
    pub fn apply_content_rules(&self, body: &str, content_type: &str) -> String {
        let media_type = media_type(content_type);
        let mut current = Cow::Borrowed(body);
        for rule in self.content.iter().filter(|r| r.applies_to(&media_type)) {
            if let Some(next) = replace_all(rule, &current) {
                current = Cow::Owned(next);
            }
        }
        current.into_owned()
    }

    pub fn has_content_rules(&self) -> bool {
        !self.content.is_empty()
    }
}

fn compile_rule(rule: &TransformRule) -> Result<CompiledRule, regex::Error> {
    Ok(CompiledRule {
        regex: Regex::new(&rule.pattern)?,
        replacement: rule.replacement.clone(),
        content_types: rule.content_types.clone(),
    })
}

/// Every match replaced, or `None` when the pattern did not match.
fn replace_all(rule: &CompiledRule, input: &str) -> Option<String> {
    match rule.regex.replace_all(input, rule.replacement.as_str()) {
        Cow::Owned(replaced) => Some(replaced),
        Cow::Borrowed(_) => None,
    }
}

/// Run `rules` in order. `None` when nothing changed.
fn apply_sequence(rules: &[CompiledRule], input: &str) -> Option<String> {
    let mut current: Option<String> = None;
    for rule in rules {
        let source = current.as_deref().unwrap_or(input);
        if let Some(next) = replace_all(rule, source) {
            current = Some(next);
        }
    }
    current
}

/// Lowercased media type without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
