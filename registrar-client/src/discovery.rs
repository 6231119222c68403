//! Discovery client with a TTL cache and a static fallback tier
//!
//! Lookup order: cache, primary resolver, secondary resolver. Only primary
//! answers are cached; fallback answers are returned fresh every time so the
//! registry is retried as soon as it comes back. Concurrent misses for the
//! same name share a single primary lookup.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use registrar_core::config::DiscoveryConfig;
use registrar_core::{Error, Result};

use crate::registry_client::RegistryClient;
use crate::resolver::{Resolution, ResolutionSource, Resolver, StaticResolver};

const MAX_CACHED_NAMES: u64 = 10_000;

/// A cached primary answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResolution {
    pub url: String,
    pub cached_at: DateTime<Utc>,
}

/// Resolves logical service names for one calling process
#[derive(Clone)]
pub struct DiscoveryClient {
    primary: Arc<dyn Resolver>,
    fallback: Arc<dyn Resolver>,
    cache: Cache<String, CachedResolution>,
    http: reqwest::Client,
}

impl std::fmt::Debug for DiscoveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryClient")
            .field("cached_names", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl DiscoveryClient {
    #[must_use]
    pub fn new(primary: Arc<dyn Resolver>, fallback: Arc<dyn Resolver>, cache_ttl: Duration) -> Self {
        Self::with_http_client(primary, fallback, cache_ttl, reqwest::Client::new())
    }

    #[must_use]
    pub fn with_http_client(
        primary: Arc<dyn Resolver>,
        fallback: Arc<dyn Resolver>,
        cache_ttl: Duration,
        http: reqwest::Client,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_NAMES)
            .time_to_live(cache_ttl)
            .build();

        Self {
            primary,
            fallback,
            cache,
            http,
        }
    }

    /// Registry client as the primary tier, the configured fallback table as the secondary
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        let registry = RegistryClient::new(&config.registry_url, config.timeout())?;
        let fallback = StaticResolver::new(config.fallback.clone());
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(
            Arc::new(registry),
            Arc::new(fallback),
            config.cache_ttl(),
            http,
        ))
    }

    pub async fn resolve(&self, name: &str) -> Result<Resolution> {
        // Only one caller per name runs the primary lookup; the rest wait for
        // its result. Errors are shared with the waiters but never cached.
        let lookup = async {
            self.primary.resolve(name).await.map(|url| CachedResolution {
                url,
                cached_at: Utc::now(),
            })
        };

        let primary_err = match self.cache.entry_by_ref(name).or_try_insert_with(lookup).await {
            Ok(entry) => {
                let source = if entry.is_fresh() {
                    ResolutionSource::Registry
                } else {
                    ResolutionSource::Cache
                };
                let cached = entry.into_value();
                debug!(service = %name, url = %cached.url, ?source, "Resolved service");
                return Ok(Resolution {
                    url: cached.url,
                    source,
                });
            }
            Err(e) => e,
        };

        match self.fallback.resolve(name).await {
            Ok(url) => {
                warn!(
                    service = %name,
                    url = %url,
                    error = %primary_err,
                    "Registry lookup failed, using fallback address"
                );
                Ok(Resolution {
                    url,
                    source: ResolutionSource::Fallback,
                })
            }
            Err(fallback_err) => Err(Error::ServiceUnavailable(format!(
                "Cannot resolve '{name}': {primary_err}; fallback: {fallback_err}"
            ))),
        }
    }

    /// Cached entry for `name`, if present and within TTL
    pub async fn cached(&self, name: &str) -> Option<CachedResolution> {
        self.cache.get(name).await
    }

    pub async fn invalidate(&self, name: &str) {
        self.cache.invalidate(name).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Resolve `name`, then send the request built from its base URL.
    ///
    /// A connect error or timeout drops the cached address so the next call
    /// asks the registry again. HTTP error statuses are returned as-is.
    pub async fn send<F>(&self, name: &str, build: F) -> Result<reqwest::Response>
    where
        F: FnOnce(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let resolution = self.resolve(name).await?;

        match build(&self.http, &resolution.url).send().await {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    warn!(
                        service = %name,
                        url = %resolution.url,
                        error = %e,
                        "Request to resolved address failed, invalidating cache entry"
                    );
                    self.invalidate(name).await;
                }
                Err(Error::Transport(format!("Request to '{name}' failed: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MockResolver;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_returning(name: &'static str, url: &'static str, times: usize) -> MockResolver {
        let mut mock = MockResolver::new();
        mock.expect_resolve()
            .with(eq(name))
            .times(times)
            .returning(move |_| Ok(url.to_string()));
        mock
    }

    fn failing_resolver() -> MockResolver {
        let mut mock = MockResolver::new();
        mock.expect_resolve()
            .returning(|name| Err(Error::Transport(format!("registry down for {name}"))));
        mock
    }

    fn no_fallback() -> Arc<dyn Resolver> {
        Arc::new(StaticResolver::default())
    }

    #[tokio::test]
    async fn test_second_resolve_within_ttl_hits_cache() {
        let primary = resolver_returning("svc-a", "http://10.0.0.5:9000", 1);
        let client = DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_secs(30));

        let first = client.resolve("svc-a").await.unwrap();
        assert_eq!(first.source, ResolutionSource::Registry);
        assert_eq!(first.url, "http://10.0.0.5:9000");

        let second = client.resolve("svc-a").await.unwrap();
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.url, first.url);
        assert!(client.cached("svc-a").await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_forces_registry_lookup() {
        let primary = resolver_returning("svc-a", "http://10.0.0.5:9000", 2);
        let client = DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_secs(30));

        client.resolve("svc-a").await.unwrap();
        client.invalidate("svc-a").await;
        assert!(client.cached("svc-a").await.is_none());

        let again = client.resolve("svc-a").await.unwrap();
        assert_eq!(again.source, ResolutionSource::Registry);
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_every_name() {
        let mut primary = MockResolver::new();
        primary
            .expect_resolve()
            .times(4)
            .returning(|name| Ok(format!("http://{name}:80")));
        let client = DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_secs(30));

        client.resolve("users").await.unwrap();
        client.resolve("tickets").await.unwrap();
        client.invalidate_all();

        assert_eq!(
            client.resolve("users").await.unwrap().source,
            ResolutionSource::Registry
        );
        assert_eq!(
            client.resolve("tickets").await.unwrap().source,
            ResolutionSource::Registry
        );
    }

    #[tokio::test]
    async fn test_expired_entry_requeries_registry() {
        let primary = resolver_returning("svc-a", "http://10.0.0.5:9000", 2);
        let client =
            DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_millis(50));

        client.resolve("svc-a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let again = client.resolve("svc-a").await.unwrap();
        assert_eq!(again.source, ResolutionSource::Registry);
    }

    #[tokio::test]
    async fn test_fallback_used_and_not_cached() {
        let mut primary = MockResolver::new();
        primary
            .expect_resolve()
            .times(2)
            .returning(|_| Err(Error::Transport("connection refused".into())));
        let fallback: StaticResolver = [("tickets", "http://tickets:3002")].into_iter().collect();
        let client =
            DiscoveryClient::new(Arc::new(primary), Arc::new(fallback), Duration::from_secs(30));

        let first = client.resolve("tickets").await.unwrap();
        assert_eq!(first.source, ResolutionSource::Fallback);
        assert_eq!(first.url, "http://tickets:3002");
        assert!(client.cached("tickets").await.is_none());

        // Registry is asked again on the next call
        let second = client.resolve("tickets").await.unwrap();
        assert_eq!(second.source, ResolutionSource::Fallback);
    }

    #[tokio::test]
    async fn test_unhealthy_in_registry_falls_back() {
        let mut primary = MockResolver::new();
        primary
            .expect_resolve()
            .returning(|name| Err(Error::Unavailable(format!("'{name}' is unhealthy"))));
        let fallback: StaticResolver = [("users", "http://users:3003")].into_iter().collect();
        let client =
            DiscoveryClient::new(Arc::new(primary), Arc::new(fallback), Duration::from_secs(30));

        let resolution = client.resolve("users").await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Fallback);
    }

    #[tokio::test]
    async fn test_both_tiers_fail() {
        let client = DiscoveryClient::new(
            Arc::new(failing_resolver()),
            no_fallback(),
            Duration::from_secs(30),
        );

        let err = client.resolve("files").await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_send_routes_to_resolved_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tickets/42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut primary = MockResolver::new();
        let uri = server.uri();
        primary
            .expect_resolve()
            .times(1)
            .returning(move |_| Ok(uri.clone()));
        let client = DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_secs(30));

        let response = client
            .send("tickets", |http, base| http.get(format!("{base}/tickets/42")))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(client.cached("tickets").await.is_some());
    }

    #[tokio::test]
    async fn test_send_connect_error_invalidates() {
        // Reserve a port, then release it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let mut primary = MockResolver::new();
        primary
            .expect_resolve()
            .times(1)
            .returning(move |_| Ok(dead.clone()));
        let client = DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_secs(30));

        let err = client
            .send("svc-a", |http, base| http.get(format!("{base}/ping")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(client.cached("svc-a").await.is_none());
    }

    /// Registry double that answers after a delay and counts its calls
    struct SlowResolver {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Resolver for SlowResolver {
        async fn resolve(&self, name: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(format!("http://{name}:9000"))
        }
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_registry_call() {
        let primary = Arc::new(SlowResolver {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
        });
        let client = DiscoveryClient::new(primary.clone(), no_fallback(), Duration::from_secs(30));

        let (first, second, third) = tokio::join!(
            client.resolve("svc-a"),
            client.resolve("svc-a"),
            client.resolve("svc-a")
        );

        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        for resolution in [first.unwrap(), second.unwrap(), third.unwrap()] {
            assert_eq!(resolution.url, "http://svc-a:9000");
        }
    }

    #[tokio::test]
    async fn test_expired_entry_not_served_when_both_tiers_fail() {
        let mut primary = MockResolver::new();
        let mut seq = Sequence::new();
        primary
            .expect_resolve()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("http://10.0.0.5:9000".to_string()));
        primary
            .expect_resolve()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::NotFound("svc-a was evicted".into())));
        let client =
            DiscoveryClient::new(Arc::new(primary), no_fallback(), Duration::from_millis(50));

        let first = client.resolve("svc-a").await.unwrap();
        assert_eq!(first.url, "http://10.0.0.5:9000");

        tokio::time::sleep(Duration::from_millis(150)).await;

        let err = client.resolve("svc-a").await.unwrap_err();
        match err {
            Error::ServiceUnavailable(message) => assert!(!message.contains("10.0.0.5")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.cached("svc-a").await.is_none());
    }
}
