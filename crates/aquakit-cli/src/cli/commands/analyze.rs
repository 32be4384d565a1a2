use std::sync::Arc;

use tracing::info;

use aquakit_core::analyzer::{Analyzer, BatchItem, BatchReport};
use aquakit_core::limiter::RateLimiter;
use aquakit_core::model::{ImagePayload, TestType};
use aquakit_core::providers::fake::FakeClient;
use aquakit_core::providers::gemini::GeminiClient;
use aquakit_core::providers::VisionClient;
use aquakit_core::store::ReadingStore;

use crate::cli::args::{AnalyzeArgs, Provider};
use crate::exit_codes;

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<i32> {
    let test_type: TestType = args.test_type.into();

    let client: Arc<dyn VisionClient> = match args.provider {
        Provider::Gemini => {
            let key = args.api_key.clone().unwrap_or_default();
            match GeminiClient::new(args.model.clone(), key) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    eprintln!("{e}");
                    return Ok(exit_codes::CONFIG_ERROR);
                }
            }
        }
        Provider::Fake => {
            let mut fake = FakeClient::new();
            if let Some(response) = args.fake_response.clone() {
                fake = fake.with_response(response);
            }
            Arc::new(fake)
        }
    };

    let mut items = Vec::new();
    for path in &args.images {
        let image = match ImagePayload::from_path(path) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("{e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };
        let image_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        items.push(BatchItem { image_name, image });
    }

    let store = ReadingStore::open(&args.log)?;
    let unit = test_type.uses_unit().then(|| args.unit.clone());
    let analyzer = Analyzer::new(client, Arc::new(RateLimiter::for_service_quota()), store);

    info!(test_type = %test_type, images = items.len(), "starting batch analysis");
    let report = analyzer.analyze_batch(test_type, unit, items).await;

    print_summary(test_type, &args.unit, &report);

    for failure in &report.failures {
        eprintln!("error analyzing {}: {}", failure.image_name, failure.error);
    }

    if report.failures.is_empty() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::PARTIAL_FAILURE)
    }
}

fn print_summary(test_type: TestType, unit: &str, report: &BatchReport) {
    if report.analyzed.is_empty() {
        println!("No images analyzed.");
        return;
    }

    let label = if test_type.uses_unit() { unit } else { "pH" };
    println!(
        "{} analysis summary ({} image(s)):",
        test_type.display_name(),
        report.analyzed.len()
    );
    println!("{:<32} {:>10} {:>14}", "Image", "Level", "Confidence");
    for analyzed in &report.analyzed {
        println!(
            "{:<32} {:>6} {:<3} {:>13.1}%",
            analyzed.image_name, analyzed.result.predicted_level, label, analyzed.result.confidence
        );
    }

    for analyzed in &report.analyzed {
        println!();
        println!("{}:", analyzed.image_name);
        println!("  tube: {}", analyzed.result.tube_description);
        println!("  matched: {}", analyzed.result.matched_reference);
        println!("  {}", analyzed.result.explanation);
    }
}
