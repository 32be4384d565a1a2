use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;

use super::{InferenceResponse, VisionClient};
use crate::errors::{ConfigError, InferenceError};
use crate::model::ImagePayload;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug)]
pub struct GeminiClient {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Fails fast on unusable setup; inference-time failures are reported
    /// per call instead.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError(
                "Gemini API key is empty (pass --api-key or set GEMINI_API_KEY)".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: model.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn infer(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<InferenceResponse, InferenceError> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": {
                        "mime_type": image.mime_type(),
                        "data": BASE64.encode(image.bytes()),
                    }},
                ]
            }]
        });

        tracing::debug!(
            model = %self.model,
            image_bytes = image.bytes().len(),
            "sending generateContent request"
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_else(|_| String::new());
            return Err(InferenceError::Api(status.as_u16(), error_text));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let text = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or(InferenceError::EmptyResponse)?
            .to_string();

        tracing::debug!(chars = text.len(), "received inference text");

        Ok(InferenceResponse {
            text,
            provider: "gemini".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
