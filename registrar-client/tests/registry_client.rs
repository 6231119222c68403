//! Registry client against a stubbed registry
//!
//! Run with: cargo test -p registrar-client --test registry_client

use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use registrar_client::{DiscoveryClient, RegistryClient, ResolutionSource};
use registrar_core::config::DiscoveryConfig;
use registrar_core::models::{RegisterRequest, ServiceStatus};
use registrar_core::Error;

fn descriptor(name: &str, host: &str, port: u16, status: &str) -> serde_json::Value {
    json!({
        "name": name,
        "host": host,
        "port": port,
        "url": format!("http://{host}:{port}"),
        "healthEndpoint": "/health",
        "status": status,
        "consecutiveFailures": 0,
        "registeredAt": "2026-01-01T00:00:00Z",
        "lastHealthCheck": null
    })
}

fn client(server: &MockServer) -> RegistryClient {
    RegistryClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_register_sends_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_json(json!({
            "name": "files",
            "host": "files",
            "port": 3004,
            "healthEndpoint": "/ready"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Service files registered successfully",
            "service": descriptor("files", "files", 3004, "HEALTHY"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = RegisterRequest::new("files", "files", 3004).with_health_endpoint("/ready");
    let registered = client(&server).register(&request).await.unwrap();
    assert_eq!(registered.status, ServiceStatus::Healthy);
    assert_eq!(registered.url, "http://files:3004");
}

#[tokio::test]
async fn test_discover_maps_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "users",
            "url": "http://users:3003",
            "host": "users",
            "port": 3003,
            "status": "HEALTHY"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/tickets"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"error": "Service tickets is unhealthy", "status": 503})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/files"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": "Service files not found", "status": 404})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/legacy"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = client(&server);

    let users = registry.discover("users").await.unwrap();
    assert_eq!(users.url, "http://users:3003");

    match registry.discover("tickets").await {
        Err(Error::Unavailable(message)) => assert!(message.contains("unhealthy")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        registry.discover("files").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        registry.discover("legacy").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        registry.discover("broken").await,
        Err(Error::Transport(_))
    ));
}

#[tokio::test]
async fn test_deregister_and_list() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/deregister/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Service users deregistered successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "services": [descriptor("tickets", "tickets", 3002, "UNHEALTHY")],
        })))
        .mount(&server)
        .await;

    let registry = client(&server);
    registry.deregister("users").await.unwrap();

    let services = registry.services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].status, ServiceStatus::Unhealthy);
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/users"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let registry = RegistryClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
    assert!(matches!(
        registry.discover("users").await,
        Err(Error::Transport(_))
    ));
}

#[tokio::test]
async fn test_discovery_from_config_prefers_registry_then_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "users",
            "url": "http://10.0.0.7:3003",
            "host": "10.0.0.7",
            "port": 3003,
            "status": "HEALTHY"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/tickets"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = DiscoveryConfig {
        registry_url: server.uri(),
        cache_ttl_seconds: 30,
        timeout_seconds: 2,
        fallback: HashMap::from([
            ("users".to_string(), "http://users:3003".to_string()),
            ("tickets".to_string(), "http://tickets:3002".to_string()),
        ]),
    };
    let discovery = DiscoveryClient::from_config(&config).unwrap();

    let users = discovery.resolve("users").await.unwrap();
    assert_eq!(users.source, ResolutionSource::Registry);
    assert_eq!(users.url, "http://10.0.0.7:3003");
    assert_eq!(
        discovery.resolve("users").await.unwrap().source,
        ResolutionSource::Cache
    );

    let tickets = discovery.resolve("tickets").await.unwrap();
    assert_eq!(tickets.source, ResolutionSource::Fallback);
    assert_eq!(tickets.url, "http://tickets:3002");

    assert!(matches!(
        discovery.resolve("files").await,
        Err(Error::ServiceUnavailable(_))
    ));
}
