use std::fmt;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Unit recorded for ammonia/nitrite readings when the caller picked none.
pub const DEFAULT_UNIT: &str = "mg/L";
/// Fixed unit label for pH readings; the selectable unit never applies.
pub const PH_UNIT: &str = "pH";

/// Water test kind the photographed tube belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Ammonia,
    Nitrite,
    Ph,
}

impl TestType {
    pub const ALL: [TestType; 3] = [TestType::Ammonia, TestType::Nitrite, TestType::Ph];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Ammonia => "ammonia",
            TestType::Nitrite => "nitrite",
            TestType::Ph => "ph",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ammonia" => Some(TestType::Ammonia),
            "nitrite" => Some(TestType::Nitrite),
            "ph" => Some(TestType::Ph),
            _ => None,
        }
    }

    /// Name used in prompts, summaries and synthesized placeholders.
    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::Ammonia => "Ammonia",
            TestType::Nitrite => "Nitrite",
            TestType::Ph => "pH",
        }
    }

    /// Expected color family of the tube liquid.
    pub fn color_family(&self) -> &'static str {
        match self {
            TestType::Ammonia => "orange",
            TestType::Nitrite => "pink",
            TestType::Ph => "yellow/green/blue",
        }
    }

    /// Discrete reference levels the inference service chooses among.
    pub fn reference_levels(&self) -> &'static [f64] {
        match self {
            TestType::Ammonia | TestType::Nitrite => &[0.0, 0.5, 1.0, 3.0, 5.0],
            TestType::Ph => &[6.8, 7.0, 7.2, 7.6, 8.0, 8.5],
        }
    }

    /// Whether a measurement unit applies. pH readings carry the fixed
    /// "pH" label instead.
    pub fn uses_unit(&self) -> bool {
        !matches!(self, TestType::Ph)
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Already-decoded image bytes plus the MIME type the inference service
/// needs to interpret them. Decoding and pixel inspection stay external.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Load image bytes from disk, mapping the extension to a MIME type.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let mime = match ext.as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => {
                return Err(ConfigError(format!(
                    "unsupported image type for {} (expected jpg, jpeg or png)",
                    path.display()
                )))
            }
        };
        let bytes = std::fs::read(path)
            .map_err(|e| ConfigError(format!("failed to read image {}: {}", path.display(), e)))?;
        Ok(Self::new(bytes, mime))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// One image to analyze. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    image: ImagePayload,
    test_type: TestType,
    unit: Option<String>,
}

impl AnalysisRequest {
    pub fn new(image: ImagePayload, test_type: TestType, unit: Option<String>) -> Self {
        Self {
            image,
            test_type,
            unit,
        }
    }

    pub fn image(&self) -> &ImagePayload {
        &self.image
    }

    pub fn test_type(&self) -> TestType {
        self.test_type
    }

    /// Unit label recorded with readings: the fixed "pH" for pH tests,
    /// otherwise the selected unit (mg/L when none was given).
    pub fn unit_label(&self) -> &str {
        if self.test_type.uses_unit() {
            self.unit.as_deref().unwrap_or(DEFAULT_UNIT)
        } else {
            PH_UNIT
        }
    }
}

/// Structured outcome of one inference call. Every field is always
/// populated; the parser fills placeholders when the service returned less
/// than the mandated shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub predicted_level: f64,
    pub confidence: f64,
    pub explanation: String,
    pub tube_description: String,
    pub matched_reference: String,
}

/// One persisted, immutable analysis outcome for a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: String,
    pub predicted_level: f64,
    pub confidence: f64,
    pub unit: String,
    pub test_type: TestType,
    pub explanation: String,
    pub image_name: String,
}

impl Reading {
    /// Stamp a result as a reading at the current local time.
    pub fn new(result: &AnalysisResult, test_type: TestType, unit: &str, image_name: &str) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            predicted_level: result.predicted_level,
            confidence: result.confidence,
            unit: unit.to_string(),
            test_type,
            explanation: result.explanation.clone(),
            image_name: image_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_through_its_name() {
        for t in TestType::ALL {
            assert_eq!(TestType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TestType::parse("nitrate"), None);
    }

    #[test]
    fn unit_label_is_fixed_for_ph() {
        let image = ImagePayload::new(vec![0u8], "image/png");
        let ph = AnalysisRequest::new(image.clone(), TestType::Ph, Some("ppm".into()));
        assert_eq!(ph.unit_label(), "pH");

        let ammonia = AnalysisRequest::new(image.clone(), TestType::Ammonia, Some("ppm".into()));
        assert_eq!(ammonia.unit_label(), "ppm");

        let defaulted = AnalysisRequest::new(image, TestType::Nitrite, None);
        assert_eq!(defaulted.unit_label(), "mg/L");
    }

    #[test]
    fn unknown_image_extension_is_a_config_error() {
        let err = ImagePayload::from_path(Path::new("tube.gif")).unwrap_err();
        assert!(err.to_string().contains("unsupported image type"));
    }

    #[test]
    fn reading_timestamp_has_the_log_shape() {
        let result = AnalysisResult {
            predicted_level: 0.5,
            confidence: 80.0,
            explanation: "pale orange".into(),
            tube_description: "orange liquid".into(),
            matched_reference: "0.5 block".into(),
        };
        let reading = Reading::new(&result, TestType::Ammonia, "mg/L", "tube.jpg");
        // e.g. 2026-08-07 14:03:59
        assert_eq!(reading.timestamp.len(), 19);
        assert_eq!(&reading.timestamp[4..5], "-");
        assert_eq!(&reading.timestamp[10..11], " ");
    }
}
