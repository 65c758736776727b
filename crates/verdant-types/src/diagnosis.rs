//! Plant diagnosis types.
//!
//! A `DiagnosticContext` is what the greeting logic consumes. On the wire it
//! travels as participant metadata, a JSON object whose keys are all
//! optional; `DiagnosisMetadata` models that object and fills defaults
//! explicitly when converted.

use serde::{Deserialize, Serialize};

/// Tri-state health verdict of a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The classifier considers the plant healthy.
    Healthy,
    /// The classifier detected a condition.
    Diseased,
    /// No verdict: missing flag, or the classifier could not find a subject.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Returns the wire flag for this status (`None` for unknown).
    pub fn as_flag(self) -> Option<bool> {
        match self {
            Self::Healthy => Some(true),
            Self::Diseased => Some(false),
            Self::Unknown => None,
        }
    }
}

impl From<Option<bool>> for HealthStatus {
    fn from(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Healthy,
            Some(false) => Self::Diseased,
            None => Self::Unknown,
        }
    }
}

/// A decoded diagnosis, ready for greeting selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosticContext {
    /// Detected class label, e.g. "Black Pod". Empty when not reported.
    pub class_name: String,
    /// Classifier confidence, either a fraction (0..=1) or a percentage.
    pub confidence: f64,
    /// Health verdict.
    pub health: HealthStatus,
}

impl DiagnosticContext {
    pub fn new(class_name: impl Into<String>, confidence: f64, health: HealthStatus) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            health,
        }
    }

    /// Encodes this context as participant metadata.
    pub fn to_metadata(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&DiagnosisMetadata::from(self))
    }
}

/// Participant metadata as sent by the client.
///
/// Every key is optional. Unknown keys (the client also forwards treatment
/// tips and a preview URL) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisMetadata {
    #[serde(rename = "className", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(rename = "isHealthy", default, skip_serializing_if = "Option::is_none")]
    pub is_healthy: Option<bool>,
}

impl DiagnosisMetadata {
    /// Converts into a context, defaulting missing fields to an empty class,
    /// zero confidence and an unknown verdict.
    pub fn into_context(self) -> DiagnosticContext {
        DiagnosticContext {
            class_name: self.class_name.unwrap_or_default(),
            confidence: self.confidence.unwrap_or(0.0),
            health: HealthStatus::from(self.is_healthy),
        }
    }
}

impl From<&DiagnosticContext> for DiagnosisMetadata {
    fn from(ctx: &DiagnosticContext) -> Self {
        Self {
            class_name: Some(ctx.class_name.clone()),
            confidence: Some(ctx.confidence),
            is_healthy: ctx.health.as_flag(),
        }
    }
}

/// One alternative from the classifier's ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKEntry {
    #[serde(rename = "className")]
    pub class_name: String,
    pub confidence: f64,
}

/// Response of the leaf/pod classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantPrediction {
    #[serde(rename = "className")]
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub index: u32,
    #[serde(rename = "topK", default)]
    pub top_k: Vec<TopKEntry>,
    #[serde(rename = "isHealthy", default)]
    pub is_healthy: Option<bool>,
}

/// Classifier label meaning no pod was found in the photo.
const NO_SUBJECT_CLASS: &str = "NULL";
const HEALTHY_CLASS: &str = "HEALTHY";

impl PlantPrediction {
    /// Derives the health verdict. An explicit classifier flag wins; otherwise
    /// the class label decides.
    pub fn health(&self) -> HealthStatus {
        if let Some(flag) = self.is_healthy {
            return HealthStatus::from(Some(flag));
        }

        let normalized: String = self
            .class_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        match normalized.as_str() {
            "" | NO_SUBJECT_CLASS => HealthStatus::Unknown,
            HEALTHY_CLASS => HealthStatus::Healthy,
            _ => HealthStatus::Diseased,
        }
    }

    pub fn to_context(&self) -> DiagnosticContext {
        DiagnosticContext::new(self.class_name.clone(), self.confidence, self.health())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_from_flag() {
        assert_eq!(HealthStatus::from(Some(true)), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from(Some(false)), HealthStatus::Diseased);
        assert_eq!(HealthStatus::from(None), HealthStatus::Unknown);
    }

    #[test]
    fn metadata_defaults_missing_fields() {
        let ctx = DiagnosisMetadata::default().into_context();
        assert_eq!(ctx.class_name, "");
        assert_eq!(ctx.confidence, 0.0);
        assert_eq!(ctx.health, HealthStatus::Unknown);
    }

    #[test]
    fn unknown_health_is_omitted_from_metadata() {
        let ctx = DiagnosticContext::new("NULL", 0.4, HealthStatus::Unknown);
        let json = ctx.to_metadata().unwrap();
        assert!(!json.contains("isHealthy"));
        assert!(json.contains("\"className\":\"NULL\""));
    }

    #[test]
    fn prediction_health_from_class_label() {
        let mut prediction = PlantPrediction {
            class_name: "Healthy".to_string(),
            confidence: 0.91,
            index: 2,
            top_k: Vec::new(),
            is_healthy: None,
        };
        assert_eq!(prediction.health(), HealthStatus::Healthy);

        prediction.class_name = "Black Pod".to_string();
        assert_eq!(prediction.health(), HealthStatus::Diseased);

        prediction.class_name = "null".to_string();
        assert_eq!(prediction.health(), HealthStatus::Unknown);

        prediction.is_healthy = Some(true);
        assert_eq!(prediction.health(), HealthStatus::Healthy);
    }

    #[test]
    fn prediction_parses_classifier_response() {
        let json = r#"{
            "className": "Frosty Pod Rot",
            "confidence": 0.65,
            "index": 1,
            "topK": [{"className": "Frosty Pod Rot", "confidence": 0.65}],
            "isHealthy": null
        }"#;
        let prediction: PlantPrediction = serde_json::from_str(json).unwrap();
        let ctx = prediction.to_context();
        assert_eq!(ctx.class_name, "Frosty Pod Rot");
        assert_eq!(ctx.health, HealthStatus::Diseased);
        assert_eq!(prediction.top_k.len(), 1);
    }
}
