use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::InferenceError;
use crate::limiter::RateLimiter;
use crate::model::{AnalysisRequest, AnalysisResult, ImagePayload, Reading, TestType};
use crate::parser::parse_response;
use crate::prompt::build_prompt;
use crate::providers::VisionClient;
use crate::store::ReadingStore;

/// Images analyzed concurrently within one batch. The rate limiter still
/// bounds the outbound request rate.
const BATCH_PARALLELISM: usize = 4;

/// One image of a batch, keyed by the name the caller knows it under.
pub struct BatchItem {
    pub image_name: String,
    pub image: ImagePayload,
}

pub struct AnalyzedImage {
    pub image_name: String,
    pub result: AnalysisResult,
}

pub struct FailedImage {
    pub image_name: String,
    pub error: InferenceError,
}

/// Outcome of a batch: successes in input order, failures reported
/// individually and excluded from the summary.
#[derive(Default)]
pub struct BatchReport {
    pub analyzed: Vec<AnalyzedImage>,
    pub failures: Vec<FailedImage>,
}

/// The analysis pipeline: prompt, throttled inference, parsing, recording.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn VisionClient>,
    limiter: Arc<RateLimiter>,
    store: ReadingStore,
}

impl Analyzer {
    pub fn new(
        client: Arc<dyn VisionClient>,
        limiter: Arc<RateLimiter>,
        store: ReadingStore,
    ) -> Self {
        Self {
            client,
            limiter,
            store,
        }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Analyze one image. The returned result is always fully populated
    /// when the inference call itself succeeds.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, InferenceError> {
        let prompt = build_prompt(request.test_type(), request.unit_label());
        self.limiter.acquire().await;
        let response = self.client.infer(&prompt, request.image()).await?;
        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            chars = response.text.len(),
            "inference response received"
        );
        Ok(parse_response(
            &response.text,
            request.test_type(),
            request.unit_label(),
        ))
    }

    /// Analyze one image and record the reading. A failed save is logged
    /// and retried with the next record; it does not fail the analysis.
    pub async fn analyze_and_record(
        &self,
        request: &AnalysisRequest,
        image_name: &str,
    ) -> Result<AnalysisResult, InferenceError> {
        let result = self.analyze(request).await?;
        let reading = Reading::new(&result, request.test_type(), request.unit_label(), image_name);
        if let Err(e) = self.store.record(reading) {
            warn!(image = image_name, error = %e, "failed to persist reading");
        }
        info!(
            test_type = %request.test_type(),
            level = result.predicted_level,
            confidence = result.confidence,
            image = image_name,
            "analysis recorded"
        );
        Ok(result)
    }

    /// Run a batch, one inference call per image. Per-image failures are
    /// isolated; the report lists successes in input order.
    pub async fn analyze_batch(
        &self,
        test_type: TestType,
        unit: Option<String>,
        items: Vec<BatchItem>,
    ) -> BatchReport {
        let sem = Arc::new(Semaphore::new(BATCH_PARALLELISM));
        let mut join_set = JoinSet::new();

        for (idx, item) in items.into_iter().enumerate() {
            let permit = sem
                .clone()
                .acquire_owned()
                .await
                .expect("batch semaphore is never closed");
            let this = self.clone();
            let unit = unit.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let BatchItem { image_name, image } = item;
                let request = AnalysisRequest::new(image, test_type, unit);
                let outcome = this.analyze_and_record(&request, &image_name).await;
                (idx, image_name, outcome)
            });
        }

        let mut analyzed = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, image_name, Ok(result))) => {
                    analyzed.push((idx, AnalyzedImage { image_name, result }));
                }
                Ok((idx, image_name, Err(error))) => {
                    warn!(image = %image_name, error = %error, "image analysis failed");
                    failures.push((idx, FailedImage { image_name, error }));
                }
                Err(e) => warn!(error = %e, "analysis task aborted"),
            }
        }
        analyzed.sort_by_key(|(idx, _)| *idx);
        failures.sort_by_key(|(idx, _)| *idx);

        BatchReport {
            analyzed: analyzed.into_iter().map(|(_, a)| a).collect(),
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        }
    }
}
