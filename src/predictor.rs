//! Predictor - runs the loaded model on a normalized record
//!
//! The raw model output is clamped into the valid score range [0, 100] and rounded
//! to two decimals. Confidence is a fixed figure: the model's cross-validated
//! R² of 0.872151, rounded to three decimals.

use crate::error::{PredictorError, Result};
use crate::features::{FeatureRecord, RawFeatures};
use crate::model::{LoadedModel, Regressor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reported confidence for every prediction
pub const CONFIDENCE: f64 = 0.872;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Prediction metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub model_type: String,
    pub features_used: usize,
}

/// Predicted math score for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub math_score: f64,
    pub confidence: f64,
    pub model_info: ModelInfo,
}

impl PredictionResult {
    /// e.g. `"75.31/100"`
    pub fn score_display(&self) -> String {
        format!("{:.2}/100", self.math_score)
    }

    /// e.g. `"87.2%"`
    pub fn confidence_display(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// Clamp a raw model output into [0, 100]
pub fn clamp_score(raw: f64) -> f64 {
    if raw < MIN_SCORE {
        tracing::warn!("Negative prediction {} clamped to {}", raw, MIN_SCORE);
        MIN_SCORE
    } else if raw > MAX_SCORE {
        tracing::warn!("Prediction {} above {} clamped", raw, MAX_SCORE);
        MAX_SCORE
    } else {
        raw
    }
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Run one prediction against any regressor
pub fn predict_with(model: &dyn Regressor, record: &FeatureRecord) -> Result<PredictionResult> {
    let row = record.to_vector();
    tracing::debug!("Model input row: {:?}", row);

    let outputs = model.predict(&[row]).map_err(|e| {
        tracing::error!("Model invocation failed: {}", e);
        e
    })?;

    let raw = match outputs.first() {
        Some(&value) if value.is_finite() => value,
        Some(&value) => {
            tracing::error!("Model returned a non-finite value: {}", value);
            return Err(PredictorError::Prediction(format!(
                "model returned a non-finite value: {}",
                value
            )));
        }
        None => {
            tracing::error!("Model returned no output");
            return Err(PredictorError::Prediction("model returned no output".to_string()));
        }
    };

    Ok(PredictionResult {
        math_score: round2(clamp_score(raw)),
        confidence: CONFIDENCE,
        model_info: ModelInfo {
            model_type: model.type_name().to_string(),
            features_used: row.len(),
        },
    })
}

/// Predictor bound to a shared loaded model
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<LoadedModel>,
}

impl Predictor {
    pub fn new(model: Arc<LoadedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &LoadedModel {
        &self.model
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult> {
        predict_with(self.model.regressor(), record)
    }

    /// Validate, normalize and predict in one step
    pub fn predict_raw(&self, raw: &RawFeatures) -> Result<(FeatureRecord, PredictionResult)> {
        let record = FeatureRecord::from_raw(raw)?;
        let result = self.predict(&record)?;
        tracing::info!(
            "Predicted math score {} (model {})",
            result.math_score,
            result.model_info.model_type
        );
        Ok((record, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactFormat, LinearRegression};
    use crate::FEATURE_COUNT;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    /// Regressor that ignores its input and returns a fixed value
    struct Fixed(Vec<f64>);

    impl Regressor for Fixed {
        fn predict(&self, _rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }

        fn type_name(&self) -> &str {
            "Fixed"
        }
    }

    struct Failing;

    impl Regressor for Failing {
        fn predict(&self, _rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>> {
            Err(PredictorError::Prediction("shape mismatch".to_string()))
        }

        fn type_name(&self) -> &str {
            "Failing"
        }
    }

    fn record() -> FeatureRecord {
        FeatureRecord::from_values([0.0, 1.0, 0.0, 85.0, 82.0, 0.0, 0.0])
    }

    #[test]
    fn test_clamping() {
        let low = predict_with(&Fixed(vec![-5.0]), &record()).unwrap();
        assert_eq!(low.math_score, 0.0);

        let high = predict_with(&Fixed(vec![107.3]), &record()).unwrap();
        assert_eq!(high.math_score, 100.0);
    }

    #[test]
    fn test_rounding() {
        let result = predict_with(&Fixed(vec![73.456]), &record()).unwrap();
        assert_relative_eq!(result.math_score, 73.46, epsilon = 1e-9);
        assert_relative_eq!(round2(12.344), 12.34, epsilon = 1e-9);
    }

    #[test]
    fn test_confidence_is_constant() {
        for raw in [-50.0, 0.0, 42.0, 99.99, 1000.0] {
            let result = predict_with(&Fixed(vec![raw]), &record()).unwrap();
            assert_eq!(result.confidence, 0.872);
        }
    }

    #[test]
    fn test_metadata() {
        let result = predict_with(&Fixed(vec![50.0, 60.0]), &record()).unwrap();
        assert_eq!(result.model_info.model_type, "Fixed");
        assert_eq!(result.model_info.features_used, 7);
        // Only the first output counts
        assert_eq!(result.math_score, 50.0);
    }

    #[test]
    fn test_displays() {
        let result = predict_with(&Fixed(vec![75.3]), &record()).unwrap();
        assert_eq!(result.score_display(), "75.30/100");
        assert_eq!(result.confidence_display(), "87.2%");
    }

    #[test]
    fn test_model_errors_propagate() {
        assert!(matches!(
            predict_with(&Failing, &record()),
            Err(PredictorError::Prediction(_))
        ));
        assert!(matches!(
            predict_with(&Fixed(vec![]), &record()),
            Err(PredictorError::Prediction(_))
        ));
        assert!(matches!(
            predict_with(&Fixed(vec![f64::NAN]), &record()),
            Err(PredictorError::Prediction(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let result = predict_with(&Fixed(vec![70.0]), &record()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["math_score"], 70.0);
        assert_eq!(json["confidence"], 0.872);
        assert_eq!(json["model_info"]["type"], "Fixed");
        assert_eq!(json["model_info"]["features_used"], 7);
    }

    #[test]
    fn test_predictor_with_linear_model() {
        let model = LinearRegression::new([13.0, 3.4, -3.3, 0.29, 0.68, 4.9, 0.9], -8.5);
        let loaded = LoadedModel::new(model, PathBuf::from("memory"), ArtifactFormat::Json);
        let predictor = Predictor::new(Arc::new(loaded));

        let result = predictor.predict(&record()).unwrap();
        // -8.5 + 3.4 + 0.29*85 + 0.68*82
        assert_relative_eq!(result.math_score, 75.31, epsilon = 1e-9);
        assert_eq!(result.model_info.model_type, "LinearRegression");
    }
}
