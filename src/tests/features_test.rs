// src/tests/features_test.rs
use super::test_utils::scenario_fields;
use crate::features::{derive, DerivedIndices, FeatureVector, RawObservation, FEATURE_NAMES};
use crate::risk_policy::FireMetrics;

fn scenario() -> RawObservation {
    RawObservation::from_fields(&scenario_fields()).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn reference_scenario_indices() {
    let derived = DerivedIndices::compute(&scenario());
    assert!(close(derived.isi, 17.0));
    assert!(close(derived.bui, 39.76));
    assert!(close(derived.fwi, 32.932));
}

#[test]
fn reference_scenario_fire_metrics() {
    let metrics = FireMetrics::from_features(&derive(&scenario()));
    assert_eq!(metrics.spread_rate, "8.50 m/min");
    assert_eq!(metrics.intensity, "3293 kW/m");
    assert_eq!(metrics.flame_height, "9.9 m");
}

#[test]
fn derived_vector_has_model_order_and_placeholders() {
    let raw = scenario();
    let vector = derive(&raw);
    assert_eq!(vector.as_slice().len(), 11);

    let names: Vec<&str> = vector.named().map(|(n, _)| n).collect();
    assert_eq!(names, FEATURE_NAMES);
    assert_eq!(vector.get("month"), Some(6.0));
    assert_eq!(vector.get("day"), Some(15.0));
    assert_eq!(vector.get("temperature"), Some(raw.temperature));
    assert_eq!(vector.get("DC"), Some(raw.dc));
    assert!(close(vector.isi(), 17.0));
}

#[test]
fn isi_increases_with_wind_at_positive_ffmc() {
    let mut raw = scenario();
    let mut previous = f64::NEG_INFINITY;
    for ws in [0.0, 5.0, 12.5, 30.0, 60.0] {
        raw.wind_speed = ws;
        let isi = DerivedIndices::compute(&raw).isi;
        assert!(isi > previous, "ISI did not increase at wind {ws}");
        previous = isi;
    }
}

#[test]
fn bui_increases_with_drought_code() {
    let mut raw = scenario();
    let mut previous = f64::NEG_INFINITY;
    for dc in [0.0, 10.0, 94.8, 300.0] {
        raw.dc = dc;
        let bui = DerivedIndices::compute(&raw).bui;
        assert!(bui > previous, "BUI did not increase at DC {dc}");
        previous = bui;
    }
}

#[test]
fn form_fields_are_trimmed() {
    let mut fields = scenario_fields();
    fields.insert("humidity".into(), "  40 ".into());
    assert_eq!(RawObservation::from_fields(&fields).unwrap().humidity, 40.0);
}

#[test]
fn non_numeric_field_names_the_field() {
    let mut fields = scenario_fields();
    fields.insert("DMC".into(), "abc".into());
    let err = RawObservation::from_fields(&fields).unwrap_err();
    assert!(err.is_request_error());
    assert!(err.to_string().contains("DMC"));
}

#[test]
fn json_features_ignore_extra_keys_and_reject_strings() {
    let mut body = serde_json::Map::new();
    for (i, name) in FEATURE_NAMES.iter().enumerate() {
        body.insert(name.to_string(), serde_json::json!(i as f64));
    }
    body.insert("station".into(), serde_json::json!("north"));
    let vector = FeatureVector::from_json_object(&serde_json::Value::Object(body.clone())).unwrap();
    assert_eq!(vector.get("FWI"), Some(10.0));

    body.insert("FFMC".into(), serde_json::json!("85"));
    let err = FeatureVector::from_json_object(&serde_json::Value::Object(body)).unwrap_err();
    assert!(err.to_string().contains("FFMC"));
}

#[test]
fn non_finite_spellings_are_rejected() {
    for spelling in ["nan", "NaN", "inf", "-infinity"] {
        let mut fields = scenario_fields();
        fields.insert("FFMC".into(), spelling.into());
        let err = RawObservation::from_fields(&fields).unwrap_err();
        assert!(err.is_request_error());
        assert_eq!(
            err.to_string(),
            "Invalid value for 'FFMC': value must be a finite number",
            "accepted '{spelling}'"
        );
    }
}
