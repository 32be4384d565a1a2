pub mod fake;
pub mod gemini;

use async_trait::async_trait;

use crate::errors::InferenceError;
use crate::model::ImagePayload;

/// Raw text returned by one inference call, before any interpretation.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

/// A multimodal inference capability: submit an image and a text prompt,
/// receive free-form text.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn infer(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<InferenceResponse, InferenceError>;

    fn provider_name(&self) -> &'static str;
}
