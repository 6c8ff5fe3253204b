//! End-to-end tests: CSV → trained artifact → manifest-verified load → HTTP.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use fire_risk::app_state::AppState;
use fire_risk::classifier::ModelKind;
use fire_risk::config_loader::ServiceConfig;
use fire_risk::dataset::{self, Dataset};
use fire_risk::forest_trainer::{train_forest, ForestParams};
use fire_risk::linear_model::LogisticClassifier;
use fire_risk::linear_trainer::{train_logistic, LogisticParams};
use fire_risk::model_loader::{load_classifier, ModelManifest, MANIFEST_FILE};
use fire_risk::web::build_router;
use serde_json::{json, Value};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Synthetic fires CSV: hot, dry, windy days burn.
fn synthetic_csv() -> String {
    let mut csv = String::from("day,month,year,Temperature, RH, Ws,Rain ,FFMC,DMC,DC,ISI,BUI,FWI,Classes\n");
    for i in 0..60 {
        let hot = i % 2 == 0;
        let (temp, rh, ws, ffmc, dmc, dc) = if hot {
            (33.0 + (i % 5) as f64, 35.0, 18.0, 88.0, 25.0, 90.0)
        } else {
            (22.0 + (i % 5) as f64, 75.0, 10.0, 55.0, 3.0, 8.0)
        };
        let isi = ffmc * ws / 100.0;
        let bui = dmc * 0.8 + dc * 0.2;
        let fwi = isi * 0.3 + bui * 0.7;
        let class = if hot { "fire   " } else { "not fire   " };
        let _ = writeln!(
            csv,
            "{:02},{:02},2012,{temp},{rh},{ws},0,{ffmc},{dmc},{dc},{isi},{bui},{fwi},{class}",
            i % 28 + 1,
            6 + i % 3
        );
    }
    csv
}

fn training_data() -> Dataset {
    dataset::from_reader(synthetic_csv().as_bytes()).expect("synthetic CSV should parse")
}

fn config_for(path: &Path, kind: ModelKind) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.model.path = path.to_path_buf();
    config.model.kind = kind;
    config.model.verify_manifest = true;
    config
}

fn write_forest(dir: &TempDir) -> std::path::PathBuf {
    let params = ForestParams {
        n_estimators: 10,
        ..ForestParams::default()
    };
    let artifact = train_forest(&training_data(), &params, "e2e_forest").unwrap();
    let path = dir.path().join("forest.json");
    artifact.write_to(&path).unwrap();
    ModelManifest::for_artifact(&path, ModelKind::RandomForest)
        .unwrap()
        .write(&dir.path().join(MANIFEST_FILE))
        .unwrap();
    path
}

async fn post_form(app: axum::Router, body: &str) -> String {
    let req = Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn trained_forest_serves_form_and_api() {
    let dir = TempDir::new().unwrap();
    let path = write_forest(&dir);

    let classifier = load_classifier(&config_for(&path, ModelKind::RandomForest))
        .expect("verified forest should load");
    let app = build_router(Arc::new(AppState::new(classifier)));

    let hot = post_form(
        app.clone(),
        "temperature=35&wind_speed=18&humidity=35&FFMC=88&DMC=25&DC=90",
    )
    .await;
    assert!(hot.contains("High Risk"), "hot day should be high risk");

    let cool = post_form(
        app.clone(),
        "temperature=22&wind_speed=10&humidity=75&FFMC=55&DMC=3&DC=8",
    )
    .await;
    assert!(cool.contains("Low Risk"), "cool day should be low risk");

    let mut features = serde_json::Map::new();
    for (name, value) in [
        ("temperature", 35.0),
        ("wind_speed", 18.0),
        ("humidity", 35.0),
        ("month", 1.0),
        ("day", 10.0),
        ("FFMC", 88.0),
        ("DMC", 25.0),
        ("DC", 90.0),
        ("ISI", 15.84),
        ("BUI", 38.0),
        ("FWI", 31.352),
    ] {
        features.insert(name.to_string(), json!(value));
    }
    let req = Request::builder()
        .uri("/api/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(Value::Object(features).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], json!(true));
    assert!(body["probability"].as_f64().unwrap() >= 0.7);
}

#[test]
fn tampered_artifact_fails_manifest_check() {
    let dir = TempDir::new().unwrap();
    let path = write_forest(&dir);

    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push(' ');
    std::fs::write(&path, content).unwrap();

    let err = load_classifier(&config_for(&path, ModelKind::RandomForest)).err().unwrap();
    assert!(err.to_string().contains("sha256 mismatch"));
}

#[test]
fn manifest_kind_must_match_configuration() {
    let dir = TempDir::new().unwrap();
    let path = write_forest(&dir);

    let err = load_classifier(&config_for(&path, ModelKind::Logistic)).err().unwrap();
    assert!(err.to_string().contains("manifest describes"));
}

#[test]
fn missing_artifact_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir.path().join("absent.json"), ModelKind::RandomForest);
    config.model.verify_manifest = false;

    let err = load_classifier(&config).err().unwrap();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn trained_logistic_model_round_trips_through_loader() {
    let dir = TempDir::new().unwrap();
    let fit = train_logistic(&training_data(), &LogisticParams::default()).unwrap();
    let path = dir.path().join("model.safetensors");
    LogisticClassifier::save(&path, &fit.weights, fit.bias, &fit.importances).unwrap();
    ModelManifest::for_artifact(&path, ModelKind::Logistic)
        .unwrap()
        .write(&dir.path().join(MANIFEST_FILE))
        .unwrap();

    let classifier = load_classifier(&config_for(&path, ModelKind::Logistic)).unwrap();
    let state = AppState::new(classifier);
    let mut fields = std::collections::HashMap::new();
    for (k, v) in [
        ("temperature", "35"),
        ("wind_speed", "18"),
        ("humidity", "35"),
        ("FFMC", "88"),
        ("DMC", "25"),
        ("DC", "90"),
    ] {
        fields.insert(k.to_string(), v.to_string());
    }
    let ctx = state.service.predict_form(&fields);
    assert!(ctx.prediction.unwrap().probability > 0.5);
}
