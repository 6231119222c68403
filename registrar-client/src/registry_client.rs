//! HTTP client for the registry API
//!
//! Maps registry status codes back onto the shared error taxonomy:
//! 404 -> `NotFound`, 503 and 429 -> `Unavailable`, any other 4xx ->
//! `Validation`, and network failures, timeouts or 5xx -> `Transport`.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use registrar_core::models::{
    DiscoverResponse, RegisterRequest, RegisterResponse, ServiceDescriptor, ServiceList,
};
use registrar_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RegistryClient {
    /// Create a client for the registry at `base_url`; every call is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid registry URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "Registry URL '{base_url}' cannot be used as a base URL"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build registry client: {e}")))?;

        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<ServiceDescriptor> {
        let response = self
            .http
            .post(self.endpoint(&["register"])?)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let registered: RegisterResponse = Self::parse(response).await?;
        Ok(registered.service)
    }

    pub async fn deregister(&self, name: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&["deregister", name])?)
            .send()
            .await
            .map_err(transport_error)?;

        Self::check_status(response).await.map(|_| ())
    }

    pub async fn discover(&self, name: &str) -> Result<DiscoverResponse> {
        let response = self
            .http
            .get(self.endpoint(&["discover", name])?)
            .send()
            .await
            .map_err(transport_error)?;

        Self::parse(response).await
    }

    pub async fn services(&self) -> Result<Vec<ServiceDescriptor>> {
        let response = self
            .http
            .get(self.endpoint(&["services"])?)
            .send()
            .await
            .map_err(transport_error)?;

        let list: ServiceList = Self::parse(response).await?;
        Ok(list.services)
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Configuration(format!("Registry URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        Self::check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("Invalid registry response: {e}")))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };

        Err(match status {
            StatusCode::BAD_REQUEST => Error::Validation(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => {
                Error::Unavailable(message)
            }
            // Resending the same request cannot turn another 4xx into a success
            s if s.is_client_error() => {
                Error::Validation(format!("Registry rejected request with {status}: {message}"))
            }
            _ => Error::Transport(format!("Registry returned {status}: {message}")),
        })
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("Registry request timed out: {err}"))
    } else {
        Error::Transport(format!("Registry unreachable: {err}"))
    }
}
