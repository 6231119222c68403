use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed registration request (missing name, host or port)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Name was never registered or has already been evicted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Name is registered but currently marked unhealthy
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Network failure or timeout talking to the registry or a health endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// Neither dynamic discovery nor the fallback table could resolve the name
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure is worth retrying after a short delay.
    ///
    /// `Validation` and `NotFound` are permanent from the caller's point of view.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
