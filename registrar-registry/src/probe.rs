//! Active HTTP health probes against registered services

use async_trait::async_trait;
use std::time::{Duration, Instant};

use registrar_core::models::ProbeDetails;
use registrar_core::{Error, Result};

/// Outcome of polling one health endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub details: ProbeDetails,
}

impl ProbeOutcome {
    #[must_use]
    pub fn healthy(status_code: u16) -> Self {
        Self {
            healthy: true,
            details: ProbeDetails {
                status_code: Some(status_code),
                ..ProbeDetails::default()
            },
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            details: ProbeDetails {
                error: Some(error.into()),
                ..ProbeDetails::default()
            },
        }
    }
}

/// Polls a health URL. A timed-out or refused poll is a failure, never an error.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, health_url: &str) -> ProbeOutcome;
}

/// `GET <health_url>` with a bounded timeout; only HTTP 200 counts as healthy
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build health probe client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, health_url: &str) -> ProbeOutcome {
        let started = Instant::now();
        let result = self.client.get(health_url).send().await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                let status = response.status();
                // Body is informational only; a non-JSON body does not fail the poll
                let body = response.json::<serde_json::Value>().await.ok();
                let healthy = status == reqwest::StatusCode::OK;

                ProbeOutcome {
                    healthy,
                    details: ProbeDetails {
                        status_code: Some(status.as_u16()),
                        latency_ms,
                        error: (!healthy).then(|| format!("unexpected status {status}")),
                        body,
                    },
                }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    format!("timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    e.to_string()
                };

                ProbeOutcome {
                    healthy: false,
                    details: ProbeDetails {
                        status_code: None,
                        latency_ms,
                        error: Some(error),
                        body: None,
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe() -> HttpHealthProbe {
        HttpHealthProbe::new(Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_ok_response_is_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .mount(&server)
            .await;

        let outcome = probe().probe(&format!("{}/health", server.uri())).await;
        assert!(outcome.healthy);
        assert_eq!(outcome.details.status_code, Some(200));
        assert_eq!(outcome.details.body, Some(serde_json::json!({"status": "ok"})));
        assert!(outcome.details.error.is_none());
    }

    #[tokio::test]
    async fn test_probe_non_200_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcome = probe().probe(&format!("{}/health", server.uri())).await;
        assert!(!outcome.healthy);
        assert_eq!(outcome.details.status_code, Some(204));
        assert!(outcome.details.error.is_some());
    }

    #[tokio::test]
    async fn test_probe_timeout_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let outcome = probe().probe(&format!("{}/health", server.uri())).await;
        assert!(!outcome.healthy);
        assert!(outcome.details.status_code.is_none());
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_unhealthy() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = probe().probe(&format!("http://{addr}/health")).await;
        assert!(!outcome.healthy);
        assert!(outcome.details.error.is_some());
    }
}
