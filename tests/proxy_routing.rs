//! End-to-end tests for HTTP service routing.

use std::collections::HashMap;
use std::io;

use axum::http::StatusCode;
use portico::config::ServiceConfig;
use portico::discovery::{HostLookup, Resolver};
use portico::HttpServer;

mod common;

fn service(prefix: &str, url: String) -> ServiceConfig {
    ServiceConfig {
        prefix: prefix.into(),
        url,
    }
}

async fn get_text(url: &str) -> (StatusCode, String) {
    let res = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(res.status().as_u16()).unwrap();
    (status, res.text().await.unwrap().to_lowercase())
}

#[tokio::test]
async fn test_prefix_stripped_and_query_kept() {
    let backend = common::start_echo_backend("api").await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}")));
    let proxy = common::start_proxy(config).await;

    let (status, body) = get_text(&proxy.url("/api/users?id=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("get /users?id=7 http/1.1"), "{body}");
}

#[tokio::test]
async fn test_upstream_base_path_joined() {
    let backend = common::start_echo_backend("api").await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}/base?v=1")));
    let proxy = common::start_proxy(config).await;

    let (_, body) = get_text(&proxy.url("/api/users?id=7")).await;
    assert!(body.contains("get /base/users?v=1&id=7 http/1.1"), "{body}");
}

#[tokio::test]
async fn test_longest_prefix_wins() {
    let v1 = common::start_echo_backend("v1").await;
    let v2 = common::start_echo_backend("v2").await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{v1}")));
    config.services.push(service("/api/v2", format!("http://{v2}")));
    let proxy = common::start_proxy(config).await;

    let (_, body) = get_text(&proxy.url("/api/v2/items")).await;
    assert!(body.starts_with("backend=v2"), "{body}");
    assert!(body.contains("get /items http/1.1"), "{body}");

    let (_, body) = get_text(&proxy.url("/api/items")).await;
    assert!(body.starts_with("backend=v1"), "{body}");
}

#[tokio::test]
async fn test_bearer_token_overwrites_authorization() {
    let backend = common::start_echo_backend("api").await;
    let (_dir, token_path) = common::write_temp("token", "T");
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}")));
    config.upstream.bearer_token_file = Some(token_path);
    let proxy = common::start_proxy(config).await;

    let res = reqwest::Client::new()
        .get(proxy.url("/api/me"))
        .header("authorization", "Bearer client")
        .send()
        .await
        .unwrap();
    let body = res.text().await.unwrap().to_lowercase();

    assert!(body.contains("authorization: bearer t\r\n"), "{body}");
    assert!(!body.contains("bearer client"), "{body}");
}

#[tokio::test]
async fn test_cors_header_only_when_enabled() {
    let backend = common::start_echo_backend("api").await;

    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}")));
    let plain = common::start_proxy(config.clone()).await;

    config.upstream.cors = true;
    let cors = common::start_proxy(config).await;

    let res = reqwest::get(plain.url("/api/x")).await.unwrap();
    assert!(res.headers().get("access-control-allow-origin").is_none());

    let res = reqwest::get(cors.url("/api/x")).await.unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_forwarding_headers() {
    let backend = common::start_echo_backend("api").await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}")));
    let proxy = common::start_proxy(config).await;

    let res = reqwest::get(proxy.url("/api/x")).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
    let body = res.text().await.unwrap().to_lowercase();

    assert!(body.contains("x-forwarded-for: 127.0.0.1"), "{body}");
    assert!(body.contains("x-request-id: "), "{body}");
    assert!(body.contains(&format!("host: {backend}")), "{body}");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = common::dead_addr().await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{dead}")));
    let proxy = common::start_proxy(config).await;

    let (status, _) = get_text(&proxy.url("/api/x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // The proxy keeps serving after a failed request.
    let (status, _) = get_text(&proxy.url("/api/y")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unrouted_path_is_not_found() {
    let backend = common::start_echo_backend("api").await;
    let mut config = common::proxy_config();
    config.services.push(service("/api", format!("http://{backend}")));
    let proxy = common::start_proxy(config).await;

    let (status, _) = get_text(&proxy.url("/other")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct NoDns;

impl HostLookup for NoDns {
    fn lookup(&self, _host: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such host"))
    }
}

#[tokio::test]
async fn test_service_env_resolution() {
    let backend = common::start_echo_backend("svc").await;
    let env: HashMap<String, String> = [
        ("ECHO_SVC_SERVICE_HOST".to_string(), "127.0.0.1".to_string()),
        ("ECHO_SVC_SERVICE_PORT".to_string(), backend.port().to_string()),
    ]
    .into();

    let mut config = common::proxy_config();
    config.services.push(service("/svc", "http://echo-svc".to_string()));
    let proxy = common::start_proxy_with(config, Resolver::new(NoDns, env)).await;

    let (status, body) = get_text(&proxy.url("/svc/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("get /ping http/1.1"), "{body}");
}

#[tokio::test]
async fn test_unknown_service_is_fatal_in_strict_mode() {
    let mut config = common::proxy_config();
    config.services.push(service("/x", "http://ghost:8080".to_string()));
    config.upstream.fail_on_unknown_services = true;

    let result = HttpServer::with_resolver(config, Resolver::new(NoDns, HashMap::new())).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_unreadable_token_is_fatal() {
    let mut config = common::proxy_config();
    config.upstream.bearer_token_file = Some("/nope/token".into());

    assert!(HttpServer::new(config).await.is_err());
}
