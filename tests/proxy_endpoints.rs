//! End-to-end tests of the HTTP surface against mock origins.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use rewrite_proxy::cache::CacheStore;
use rewrite_proxy::config::{KeyStrategyKind, ProxyConfig, RuleKind, TransformRule};

mod common;

use common::{client, fetcher_for, settings_with, start_mock_origin, start_proxy, OriginReply};

const PAGE: &str = "<html><body><h1>Example Domain</h1></body></html>";

#[tokio::test]
async fn test_blocked_domain_is_policy_rejected() {
    let config = ProxyConfig {
        blocked_domains: vec!["blocked-site.com".into()],
        ..ProxyConfig::default()
    };
    // Nothing listens behind this fetcher; a rejection must not reach it.
    let unused = "127.0.0.1:9".parse().unwrap();
    let proxy = start_proxy(settings_with(config), fetcher_for(&[], unused)).await;

    let res = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": "https://blocked-site.com/page", "method": "GET" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 403);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "POLICY_REJECTED");
    assert_eq!(body["status"], 403);
    assert!(proxy.store.is_empty());
}

#[tokio::test]
async fn test_html_page_proxied_and_cached() {
    let origin = start_mock_origin(OriginReply::ok("text/html; charset=utf-8", PAGE)).await;
    let proxy = start_proxy(
        settings_with(ProxyConfig::default()),
        fetcher_for(&["example.com"], origin),
    )
    .await;

    let target = format!("http://example.com:{}/", origin.port());
    let res = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": target, "method": "GET", "headers": { "Cookie": "session=1" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["cacheable"], true);
    assert_eq!(body["content"], PAGE);
    assert_eq!(body["contentType"], "text/html; charset=utf-8");

    let keys = proxy.store.keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with(&format!("{}#", target)));

    let entry = proxy.store.get(&keys[0]).await.unwrap().unwrap();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    assert!(entry.expires_at >= now + 3590 && entry.expires_at <= now + 3610);
}

#[tokio::test]
async fn test_compressed_origin_body_is_decoded() {
    let origin = start_mock_origin(OriginReply::ok("text/html", PAGE).gzipped()).await;
    let config = ProxyConfig {
        transform_rules: vec![TransformRule::new(RuleKind::Content, "Example", "Sample")],
        ..ProxyConfig::default()
    };
    let proxy = start_proxy(settings_with(config), fetcher_for(&["example.com"], origin)).await;

    let body: Value = client()
        .post(proxy.url("/proxy"))
        .json(&json!({
            "url": format!("http://example.com:{}/", origin.port()),
            "headers": { "Accept-Encoding": "gzip, deflate, br" }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], 200);
    assert_eq!(body["content"], "<html><body><h1>Sample Domain</h1></body></html>");
    assert!(body["headers"].get("content-encoding").is_none());
    assert_eq!(body["cacheable"], true);
}

#[tokio::test]
async fn test_get_query_matches_post() {
    let origin = start_mock_origin(OriginReply::ok("text/html", PAGE)).await;
    let proxy = start_proxy(
        settings_with(ProxyConfig::default()),
        fetcher_for(&["example.com"], origin),
    )
    .await;
    let target = format!("http://example.com:{}/about", origin.port());

    let via_get: Value = client()
        .get(proxy.url("/proxy"))
        .query(&[("url", target.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let via_post: Value = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": target }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(via_get, via_post);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let origin = start_mock_origin(OriginReply::ok("text/html", "x".repeat(4096))).await;
    let config = ProxyConfig {
        max_content_bytes: 1024,
        ..ProxyConfig::default()
    };
    let proxy = start_proxy(settings_with(config), fetcher_for(&["example.com"], origin)).await;

    let res = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": format!("http://example.com:{}/big", origin.port()) }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 413);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "CONTENT_TOO_LARGE");
    assert!(proxy.store.is_empty());
}

#[tokio::test]
async fn test_content_rules_applied() {
    let origin = start_mock_origin(OriginReply::ok("text/html", PAGE)).await;
    let config = ProxyConfig {
        transform_rules: vec![TransformRule::new(RuleKind::Content, "Example", "Sample")],
        ..ProxyConfig::default()
    };
    let proxy = start_proxy(settings_with(config), fetcher_for(&["example.com"], origin)).await;

    let body: Value = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": format!("http://example.com:{}/", origin.port()) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["content"], "<html><body><h1>Sample Domain</h1></body></html>");
}

#[tokio::test]
async fn test_json_responses_not_cached() {
    let origin = start_mock_origin(OriginReply::ok("application/json", r#"{"ok":true}"#)).await;
    let proxy = start_proxy(
        settings_with(ProxyConfig::default()),
        fetcher_for(&["api.example.com"], origin),
    )
    .await;

    let body: Value = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": format!("http://api.example.com:{}/v1", origin.port()) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], 200);
    assert_eq!(body["cacheable"], false);
    assert!(proxy.store.is_empty());
}

#[tokio::test]
async fn test_url_key_strategy_serves_repeat_from_cache() {
    let origin = start_mock_origin(OriginReply::ok("text/html", PAGE)).await;
    let mut settings = settings_with(ProxyConfig::default());
    settings.cache.key_strategy = KeyStrategyKind::Url;
    let proxy = start_proxy(settings, fetcher_for(&["example.com"], origin)).await;
    let target = format!("http://example.com:{}/", origin.port());

    for _ in 0..3 {
        let res = client()
            .post(proxy.url("/proxy"))
            .json(&json!({ "url": target }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    assert_eq!(proxy.store.keys(), vec![target]);
}

#[tokio::test]
async fn test_disabled_service() {
    let config = ProxyConfig {
        enabled: false,
        ..ProxyConfig::default()
    };
    let proxy = start_proxy(settings_with(config), fetcher_for(&[], "127.0.0.1:9".parse().unwrap())).await;

    let res = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": "https://example.com/" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "SERVICE_DISABLED");

    let health: Value = client()
        .get(proxy.url("/__proxy/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["enabled"], false);
}

#[tokio::test]
async fn test_invalid_input() {
    let proxy = start_proxy(
        settings_with(ProxyConfig::default()),
        fetcher_for(&[], "127.0.0.1:9".parse().unwrap()),
    )
    .await;

    let res = client()
        .post(proxy.url("/proxy"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_INPUT");

    let res = client().get(proxy.url("/proxy")).send().await.unwrap();
    assert_eq!(res.status(), 400);

    let res = client()
        .post(proxy.url("/proxy"))
        .json(&json!({ "url": "ftp://example.com/file" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_management_endpoints() {
    let proxy = start_proxy(
        settings_with(ProxyConfig::default()),
        fetcher_for(&[], "127.0.0.1:9".parse().unwrap()),
    )
    .await;

    let res = client()
        .get(proxy.url("/__proxy/health"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-request-id"], "abc-123");
    let health: Value = res.json().await.unwrap();
    assert_eq!(health["status"], "operational");

    let cache: Value = client()
        .get(proxy.url("/__proxy/cache"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cache["strategy"], "timestamped");
    assert_eq!(cache["entries"], 0);
}
