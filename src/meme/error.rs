use std::time::Duration;

/// Failures inside the reward pipeline. Everything except a terminal
/// rendering failure is absorbed by the fallback chains.
#[derive(Debug, thiserror::Error)]
pub enum MemeError {
    #[error("missing configuration: {0}")]
    Config(String),

    #[error("service error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Service {
        status: Option<u16>,
        message: String,
    },

    #[error("template resource unavailable: {0}")]
    Resource(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion was empty after cleanup")]
    EmptyCompletion,

    #[error("rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl MemeError {
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }
}

/// Transport and body-read failures count as service failures.
impl From<reqwest::Error> for MemeError {
    fn from(err: reqwest::Error) -> Self {
        Self::service(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

pub type MemeResult<T> = Result<T, MemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_mentions_status_when_known() {
        assert_eq!(
            MemeError::service(Some(503), "unavailable").to_string(),
            "service error (HTTP 503): unavailable"
        );
        assert_eq!(
            MemeError::service(None, "bad body").to_string(),
            "service error: bad body"
        );
    }
}
