use crate::classifier::{
    check_input, check_probability, named_importances, FeatureImportance, FireClassifier,
    ModelInfo, ModelKind,
};
use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module};
use std::collections::HashMap;
use std::path::Path;

pub const WEIGHT_KEY: &str = "fc.weight";
pub const BIAS_KEY: &str = "fc.bias";
pub const IMPORTANCE_KEY: &str = "importances";

/// Logistic regression over the raw feature row, stored as safetensors.
///
/// Weights act on unscaled inputs; any standardization used while training
/// is folded into `fc.weight` and `fc.bias` before saving.
pub struct LogisticClassifier {
    name: String,
    linear: Linear,
    importances: Vec<f64>,
    device: Device,
}

impl LogisticClassifier {
    pub fn from_safetensors<P: AsRef<Path>>(path: P) -> FireRiskResult<Self> {
        let path = path.as_ref();
        let load_err = |msg: String| FireRiskError::model_load(path.display().to_string(), msg);

        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(path, &device)
            .map_err(|e| load_err(e.to_string()))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("logistic")
            .to_string();
        Self::from_tensors(name, tensors, device).map_err(|e| load_err(e.to_string()))
    }

    pub fn from_tensors(
        name: String,
        mut tensors: HashMap<String, Tensor>,
        device: Device,
    ) -> FireRiskResult<Self> {
        let mut take = |key: &str| {
            tensors
                .remove(key)
                .ok_or_else(|| FireRiskError::model_load(name.clone(), format!("missing tensor '{key}'")))
        };
        let weight = take(WEIGHT_KEY)?.to_dtype(DType::F32)?;
        let bias = take(BIAS_KEY)?.to_dtype(DType::F32)?;
        let importances = take(IMPORTANCE_KEY)?
            .to_dtype(DType::F64)?
            .flatten_all()?
            .to_vec1::<f64>()?;

        if weight.dims() != [1, FEATURE_COUNT] {
            return Err(FireRiskError::model_load(
                name,
                format!("expected weight shape [1, {FEATURE_COUNT}], got {:?}", weight.dims()),
            ));
        }
        if bias.dims() != [1] {
            return Err(FireRiskError::model_load(
                name,
                format!("expected bias shape [1], got {:?}", bias.dims()),
            ));
        }
        if importances.len() != FEATURE_COUNT {
            return Err(FireRiskError::model_load(
                name,
                format!("expected {FEATURE_COUNT} importances, got {}", importances.len()),
            ));
        }

        Ok(Self {
            name,
            linear: Linear::new(weight, Some(bias)),
            importances,
            device,
        })
    }

    /// Persist weights, bias and importances in the layout `from_safetensors` reads.
    pub fn save(
        path: &Path,
        weights: &[f32],
        bias: f32,
        importances: &[f64],
    ) -> FireRiskResult<()> {
        let device = Device::Cpu;
        let mut tensors = HashMap::new();
        tensors.insert(
            WEIGHT_KEY.to_string(),
            Tensor::from_slice(weights, (1, weights.len()), &device)?,
        );
        tensors.insert(BIAS_KEY.to_string(), Tensor::from_slice(&[bias], 1, &device)?);
        tensors.insert(
            IMPORTANCE_KEY.to_string(),
            Tensor::from_slice(importances, importances.len(), &device)?,
        );
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }
}

impl FireClassifier for LogisticClassifier {
    fn predict_probability(&self, features: &[f64]) -> FireRiskResult<f64> {
        check_input(features, FEATURE_COUNT)?;
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let x = Tensor::from_vec(row, (1, FEATURE_COUNT), &self.device)
            .map_err(|e| FireRiskError::model_invocation(e.to_string()))?;
        let p = self
            .linear
            .forward(&x)
            .and_then(|logit| candle_nn::ops::sigmoid(&logit))
            .and_then(|p| p.flatten_all())
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(|e| FireRiskError::model_invocation(e.to_string()))?;
        let p = p
            .first()
            .copied()
            .ok_or_else(|| FireRiskError::model_invocation("model produced no output"))?;
        check_probability(p as f64)
    }

    fn feature_importances(&self) -> Vec<FeatureImportance> {
        named_importances(&self.importances)
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            kind: ModelKind::Logistic,
            n_features: FEATURE_COUNT,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
