//! Risk tiers and fire-behavior presentation metrics.
//!
//! The cut points and color tags are a fixed contract with the page layer.

use crate::features::FeatureVector;
use serde::Serialize;

/// Probability at or above which risk is Medium.
pub const MEDIUM_THRESHOLD: f64 = 0.30;
/// Probability at or above which risk is High.
pub const HIGH_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        }
    }

    /// Presentation tag paired one-to-one with the level.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "success",
            RiskLevel::Medium => "warning",
            RiskLevel::High => "danger",
        }
    }
}

/// Map a fire probability onto a risk tier over `[0, 0.30) [0.30, 0.70) [0.70, 1]`.
pub fn classify(probability: f64) -> RiskLevel {
    if probability < MEDIUM_THRESHOLD {
        RiskLevel::Low
    } else if probability < HIGH_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Illustrative fire-behavior figures derived from ISI and FWI.
///
/// These are display values, not a physical spread model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireMetrics {
    pub spread_rate: String,
    pub intensity: String,
    pub flame_height: String,
}

impl FireMetrics {
    pub fn from_features(features: &FeatureVector) -> Self {
        let isi = features.isi();
        let fwi = features.fwi();
        Self {
            spread_rate: format!("{:.2} m/min", isi * 0.5),
            intensity: format!("{:.0} kW/m", fwi * 100.0),
            flame_height: format!("{:.1} m", fwi * 0.3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_colors_pair_up() {
        assert_eq!(RiskLevel::Low.color(), "success");
        assert_eq!(RiskLevel::Medium.color(), "warning");
        assert_eq!(RiskLevel::High.color(), "danger");
        assert_eq!(classify(0.0).label(), "Low Risk");
        assert_eq!(classify(1.0).label(), "High Risk");
    }
}
