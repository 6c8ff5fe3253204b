// src/tests/test_utils.rs
// Shared fixtures for the in-crate test modules

use crate::classifier::StaticClassifier;
use crate::forest::RandomForestClassifier;
use crate::prediction_service::PredictionService;
use std::collections::HashMap;
use std::sync::Arc;

/// Service over a classifier that always answers `probability`.
pub fn stub_service(probability: f64) -> PredictionService {
    PredictionService::new(Arc::new(StaticClassifier::new(probability)))
}

/// Two-tree forest that keys on FWI (feature 10) and FFMC (feature 5).
///
/// Both trees answer 0.1 for calm conditions and 0.9 past their threshold.
pub fn forest_json() -> String {
    let tree = |feature: usize, threshold: f64| {
        serde_json::json!({
            "n_nodes": 3,
            "nodes": [
                { "feature": feature, "threshold": threshold, "left": 1, "right": 2, "value": null },
                { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.9, 0.1] },
                { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.1, 0.9] }
            ]
        })
    };
    let mut importances = vec![0.0; 11];
    importances[5] = 0.4;
    importances[10] = 0.6;

    serde_json::json!({
        "model_type": "random_forest",
        "model_name": "fixture_forest",
        "feature_names": crate::features::FEATURE_NAMES,
        "n_features": 11,
        "n_classes": 2,
        "classes": [0, 1],
        "n_estimators": 2,
        "feature_importances": importances,
        "trees": [tree(10, 20.0), tree(5, 80.0)]
    })
    .to_string()
}

pub fn fixture_forest() -> RandomForestClassifier {
    RandomForestClassifier::from_json_str(&forest_json()).expect("fixture forest should load")
}

/// Form fields for the reference scenario: 30 °C, 20 km/h, 40 %, FFMC 85, DMC 26, DC 94.8.
pub fn scenario_fields() -> HashMap<String, String> {
    [
        ("temperature", "30"),
        ("wind_speed", "20"),
        ("humidity", "40"),
        ("FFMC", "85"),
        ("DMC", "26"),
        ("DC", "94.8"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
