use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Invalid credentials or setup for the inference capability. Surfaced to
/// the caller immediately, never retried.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigError: {}", self.0)
    }
}
impl std::error::Error for ConfigError {}

/// The inference call itself failed. Reported per image; other images in
/// the same batch keep going.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("inference service returned {0}: {1}")]
    Api(u16, String),

    #[error("inference response contained no text content")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_itself() {
        let err = ConfigError("missing API key".into());
        assert_eq!(err.to_string(), "ConfigError: missing API key");
    }

    #[test]
    fn inference_error_carries_status_and_body() {
        let err = InferenceError::Api(429, "quota exhausted".into());
        assert_eq!(
            err.to_string(),
            "inference service returned 429: quota exhausted"
        );
    }
}
