//! Logistic regression trained with candle.
//!
//! Features are standardized for optimization, then the scaling is folded
//! into the weights so the saved model consumes raw feature rows.

use crate::dataset::Dataset;
use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::FEATURE_COUNT;
use candle_core::{DType, Device, Tensor};
use candle_nn::{loss, Module, Optimizer, VarBuilder, VarMap, SGD};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.5,
        }
    }
}

/// Weights for raw inputs plus importances from the standardized fit.
#[derive(Debug, Clone)]
pub struct LogisticFit {
    pub weights: Vec<f32>,
    pub bias: f32,
    pub importances: Vec<f64>,
    pub final_loss: f32,
}

fn column_stats(data: &Dataset) -> ([f64; FEATURE_COUNT], [f64; FEATURE_COUNT], [bool; FEATURE_COUNT]) {
    let n = data.len() as f64;
    let mut mean = [0.0; FEATURE_COUNT];
    for row in &data.rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut std = [0.0; FEATURE_COUNT];
    for row in &data.rows {
        for ((s, v), m) in std.iter_mut().zip(row).zip(&mean) {
            *s += (v - m).powi(2) / n;
        }
    }
    let mut varies = [false; FEATURE_COUNT];
    // Constant columns keep unit scale; their weights are dropped after fitting.
    for (s, v) in std.iter_mut().zip(varies.iter_mut()) {
        let sd = s.sqrt();
        *v = sd > 1e-9;
        *s = if *v { sd } else { 1.0 };
    }
    (mean, std, varies)
}

pub fn train_logistic(data: &Dataset, params: &LogisticParams) -> FireRiskResult<LogisticFit> {
    if data.is_empty() {
        return Err(FireRiskError::dataset("cannot train on an empty dataset"));
    }
    let device = Device::Cpu;
    let (mean, std, varies) = column_stats(data);

    let n = data.len();
    let xs: Vec<f32> = data
        .rows
        .iter()
        .flat_map(|row| (0..FEATURE_COUNT).map(move |j| ((row[j] - mean[j]) / std[j]) as f32))
        .collect();
    let ys: Vec<f32> = data.labels.iter().map(|&l| l as f32).collect();
    let x = Tensor::from_vec(xs, (n, FEATURE_COUNT), &device)?;
    let y = Tensor::from_vec(ys, (n, 1), &device)?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let linear = candle_nn::linear(FEATURE_COUNT, 1, vb.pp("fc"))?;
    let mut sgd = SGD::new(varmap.all_vars(), params.learning_rate)?;

    let mut final_loss = f32::NAN;
    for epoch in 1..=params.epochs {
        let logits = linear.forward(&x)?;
        let loss = loss::binary_cross_entropy_with_logit(&logits, &y)?;
        sgd.backward_step(&loss)?;
        final_loss = loss.to_scalar::<f32>()?;
        if epoch % 100 == 0 {
            debug!("epoch {epoch}/{}: loss {final_loss:.6}", params.epochs);
        }
    }

    let std_weights: Vec<f32> = linear
        .weight()
        .flatten_all()?
        .to_vec1::<f32>()?
        .into_iter()
        .zip(varies)
        .map(|(w, v)| if v { w } else { 0.0 })
        .collect();
    let std_bias = match linear.bias() {
        Some(b) => b.flatten_all()?.to_vec1::<f32>()?.first().copied().unwrap_or(0.0),
        None => 0.0,
    };

    // w_raw = w / std, b_raw = b - sum(w * mean / std)
    let weights: Vec<f32> = std_weights
        .iter()
        .zip(&std)
        .map(|(w, s)| (*w as f64 / s) as f32)
        .collect();
    let shift: f64 = std_weights
        .iter()
        .zip(mean.iter().zip(&std))
        .map(|(w, (m, s))| *w as f64 * m / s)
        .sum();
    let bias = (std_bias as f64 - shift) as f32;

    let mut importances: Vec<f64> = std_weights.iter().map(|w| (*w as f64).abs()).collect();
    let total: f64 = importances.iter().sum();
    if total > 0.0 {
        importances.iter_mut().for_each(|v| *v /= total);
    }

    Ok(LogisticFit {
        weights,
        bias,
        importances,
        final_loss,
    })
}
