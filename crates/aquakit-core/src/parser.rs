use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{AnalysisResult, TestType};

/// Longest explanation kept verbatim when synthesizing from prose.
const EXPLANATION_LIMIT: usize = 200;

lazy_static! {
    static ref LEVEL_RE: Regex =
        Regex::new(r"(?i)(?:level|prediction).*?(\d+\.?\d*)").expect("level pattern compiles");
    static ref CONFIDENCE_RE: Regex =
        Regex::new(r"(?i)confidence.*?(\d+)").expect("confidence pattern compiles");
}

/// Extract a structured reading from whatever text the service returned.
///
/// Total function: a malformed response degrades through the heuristic
/// tier down to a fixed default instead of ever failing the analysis. The
/// tiers compose left to right; each yields a result or defers to the
/// next.
pub fn parse_response(text: &str, test_type: TestType, unit_label: &str) -> AnalysisResult {
    extract_structured(text)
        .or_else(|| extract_heuristic(text, test_type, unit_label))
        .unwrap_or_else(default_result)
}

/// Strict tier: decode the widest brace-delimited span as the mandated
/// five-key object. No independent validation of ranges; the prompt
/// already constrains them.
fn extract_structured(text: &str) -> Option<AnalysisResult> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Heuristic tier: fish level and confidence out of prose, synthesizing
/// the descriptive fields around them.
fn extract_heuristic(text: &str, test_type: TestType, unit_label: &str) -> Option<AnalysisResult> {
    let level_capture = LEVEL_RE.captures(text).map(|c| c[1].to_string());
    let confidence_capture = CONFIDENCE_RE.captures(text).map(|c| c[1].to_string());

    // A capture that fails to parse means the text shape defeated this
    // tier; hand over to the fixed default.
    let predicted_level = match level_capture {
        Some(raw) => raw.parse::<f64>().ok()?,
        None => 1.0,
    };
    let confidence = match confidence_capture {
        Some(raw) => raw.parse::<f64>().ok()?,
        None => 50.0,
    };

    let explanation = if text.chars().count() > EXPLANATION_LIMIT {
        let kept: String = text.chars().take(EXPLANATION_LIMIT).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    };

    Some(AnalysisResult {
        predicted_level,
        confidence,
        explanation,
        tube_description: format!("{} analysis completed", test_type.display_name()),
        matched_reference: format!("Closest match: {predicted_level} {unit_label}"),
    })
}

/// Last-resort tier: fixed placeholder values.
fn default_result() -> AnalysisResult {
    AnalysisResult {
        predicted_level: 1.0,
        confidence: 50.0,
        explanation: "Could not parse detailed results".to_string(),
        tube_description: "Analysis attempted".to_string(),
        matched_reference: "Default result".to_string(),
    }
}
