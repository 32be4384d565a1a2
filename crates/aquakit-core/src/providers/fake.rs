use async_trait::async_trait;

use super::{InferenceResponse, VisionClient};
use crate::errors::InferenceError;
use crate::model::ImagePayload;

/// Offline provider: echoes a canned response without touching the
/// network. Used by the test suite and the CLI's offline mode.
#[derive(Debug, Default)]
pub struct FakeClient {
    fixed_response: Option<String>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }
}

#[async_trait]
impl VisionClient for FakeClient {
    async fn infer(
        &self,
        _prompt: &str,
        _image: &ImagePayload,
    ) -> Result<InferenceResponse, InferenceError> {
        let text = self.fixed_response.clone().unwrap_or_else(|| {
            // Default keeps offline runs on the structured path.
            r#"{"predicted_level": 1.0, "confidence": 50, "explanation": "canned response", "tube_description": "canned", "matched_reference": "canned"}"#
                .to_string()
        });
        Ok(InferenceResponse {
            text,
            provider: "fake".to_string(),
            model: "fake".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
