//! Classifier port: the capability the prediction service needs from a
//! trained model, independent of how that model was produced.

use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static importance of one feature, as reported by the trained model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Artifact kinds the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    Logistic,
    Static,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::Logistic => "logistic",
            ModelKind::Static => "static",
        };
        f.write_str(s)
    }
}

impl FromStr for ModelKind {
    type Err = FireRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" => Ok(ModelKind::RandomForest),
            "logistic" => Ok(ModelKind::Logistic),
            "static" => Ok(ModelKind::Static),
            other => Err(FireRiskError::config(format!("unknown model kind '{other}'"))),
        }
    }
}

/// Descriptive metadata for a loaded model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: ModelKind,
    pub n_features: usize,
    pub feature_names: Vec<String>,
}

/// A trained binary probabilistic classifier.
///
/// Implementations are loaded once and shared read-only across requests, so
/// every method takes `&self`.
pub trait FireClassifier: Send + Sync {
    /// Probability of the fire class for a single feature row.
    fn predict_probability(&self, features: &[f64]) -> FireRiskResult<f64>;

    /// Importances aligned with [`FEATURE_NAMES`].
    fn feature_importances(&self) -> Vec<FeatureImportance>;

    fn describe(&self) -> ModelInfo;
}

/// Check a feature row against the dimensionality a model was fit on.
pub fn check_input(features: &[f64], expected: usize) -> FireRiskResult<()> {
    if features.len() != expected {
        return Err(FireRiskError::model_invocation(format!(
            "expected {expected} features, got {}",
            features.len()
        )));
    }
    if let Some(idx) = features.iter().position(|v| !v.is_finite()) {
        let name = FEATURE_NAMES.get(idx).copied().unwrap_or("unknown");
        return Err(FireRiskError::model_invocation(format!(
            "feature '{name}' is not a finite number"
        )));
    }
    Ok(())
}

/// Check a model output before it leaves the port.
pub fn check_probability(p: f64) -> FireRiskResult<f64> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(FireRiskError::model_invocation(format!(
            "model returned an invalid probability: {p}"
        )))
    }
}

/// Pair importance scores with [`FEATURE_NAMES`].
pub fn named_importances(scores: &[f64]) -> Vec<FeatureImportance> {
    FEATURE_NAMES
        .iter()
        .zip(scores)
        .map(|(name, importance)| FeatureImportance {
            name: name.to_string(),
            importance: *importance,
        })
        .collect()
}

/// Deterministic classifier returning a fixed probability.
///
/// Used where a real artifact is unavailable or unwanted, such as tests and
/// dry runs of the HTTP surface.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    probability: f64,
    importances: [f64; FEATURE_COUNT],
}

impl StaticClassifier {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            importances: [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT],
        }
    }

    pub fn with_importances(mut self, importances: [f64; FEATURE_COUNT]) -> Self {
        self.importances = importances;
        self
    }
}

impl FireClassifier for StaticClassifier {
    fn predict_probability(&self, features: &[f64]) -> FireRiskResult<f64> {
        check_input(features, FEATURE_COUNT)?;
        check_probability(self.probability)
    }

    fn feature_importances(&self) -> Vec<FeatureImportance> {
        named_importances(&self.importances)
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            name: format!("static_{:.2}", self.probability),
            kind: ModelKind::Static,
            n_features: FEATURE_COUNT,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
