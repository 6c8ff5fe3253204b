//! Prediction orchestration for the form and JSON entry points.
//!
//! Neither entry point returns an error to its caller: failures become an
//! error panel (form) or `{success: false}` (JSON).

use crate::classifier::{FeatureImportance, FireClassifier, ModelInfo};
use crate::errors::FireRiskResult;
use crate::features::{derive, FeatureValue, FeatureVector, RawObservation};
use crate::log_sink::{EntryPoint, PredictionEvent};
use crate::risk_policy::{classify, FireMetrics, RiskLevel};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Importance as displayed next to a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub name: String,
    /// Three-decimal rendering of the model's static importance.
    pub importance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub probability: f64,
    /// Percentage with one decimal, as shown on the page.
    pub probability_percent: String,
    pub risk_level: RiskLevel,
    pub risk_label: &'static str,
    pub risk_color: &'static str,
    pub explanations: Vec<Explanation>,
    pub input_values: Vec<FeatureValue>,
    pub fire_metrics: FireMetrics,
}

/// What the page layer receives for a form submission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageContext {
    pub prediction: Option<PredictionResult>,
    pub show_results: bool,
    pub error: Option<String>,
}

impl PageContext {
    pub fn results(prediction: PredictionResult) -> Self {
        Self {
            prediction: Some(prediction),
            show_results: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            prediction: None,
            show_results: false,
            error: Some(message.into()),
        }
    }
}

/// JSON endpoint response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPrediction {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiPrediction {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            probability: None,
            risk_level: None,
            error: Some(error.into()),
        }
    }
}

pub struct PredictionService {
    classifier: Arc<dyn FireClassifier>,
    explanations: Vec<Explanation>,
}

impl PredictionService {
    /// Wrap a loaded classifier. Importances are static, so they are read once here.
    pub fn new(classifier: Arc<dyn FireClassifier>) -> Self {
        let explanations = classifier
            .feature_importances()
            .into_iter()
            .map(|FeatureImportance { name, importance }| Explanation {
                name,
                importance: format!("{importance:.3}"),
            })
            .collect();
        Self {
            classifier,
            explanations,
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.classifier.describe()
    }

    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        self.classifier.feature_importances()
    }

    /// Probability for an already assembled feature vector.
    pub fn probability(&self, features: &FeatureVector) -> FireRiskResult<f64> {
        self.classifier.predict_probability(features.as_slice())
    }

    /// Derive features, score them and attach the risk interpretation.
    pub fn predict_observation(&self, raw: &RawObservation) -> FireRiskResult<PredictionResult> {
        raw.validate()?;
        let features = derive(raw);
        let probability = self.probability(&features)?;
        let risk_level = classify(probability);

        Ok(PredictionResult {
            probability,
            probability_percent: format!("{:.1}", probability * 100.0),
            risk_level,
            risk_label: risk_level.label(),
            risk_color: risk_level.color(),
            explanations: self.explanations.clone(),
            input_values: features.to_records(),
            fire_metrics: FireMetrics::from_features(&features),
        })
    }

    /// Form entry point: six raw fields in, a renderable page context out.
    pub fn predict_form(&self, fields: &HashMap<String, String>) -> PageContext {
        self.predict_raw(fields, EntryPoint::Form)
    }

    pub(crate) fn predict_raw(
        &self,
        fields: &HashMap<String, String>,
        entry_point: EntryPoint,
    ) -> PageContext {
        let outcome = RawObservation::from_fields(fields).and_then(|raw| self.predict_observation(&raw));
        match outcome {
            Ok(prediction) => {
                PredictionEvent::success(entry_point, prediction.probability, prediction.risk_label)
                    .emit();
                PageContext::results(prediction)
            }
            Err(e) => {
                PredictionEvent::failure(entry_point, e.to_string()).emit();
                PageContext::error(format!("Prediction Error: {e}"))
            }
        }
    }

    /// JSON entry point: all eleven features supplied by the caller.
    ///
    /// Derived indices are trusted as given and not recomputed, unlike the
    /// form path.
    pub fn predict_api(&self, body: &serde_json::Value) -> ApiPrediction {
        let outcome = FeatureVector::from_json_object(body).and_then(|f| self.probability(&f));
        match outcome {
            Ok(probability) => {
                let risk_label = classify(probability).label();
                PredictionEvent::success(EntryPoint::Api, probability, risk_label).emit();
                ApiPrediction {
                    success: true,
                    probability: Some(probability),
                    risk_level: Some(risk_label),
                    error: None,
                }
            }
            Err(e) => {
                PredictionEvent::failure(EntryPoint::Api, e.to_string()).emit();
                ApiPrediction::failure(e.to_string())
            }
        }
    }
}
