// tests/web.rs
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use fire_risk::app_state::AppState;
use fire_risk::classifier::StaticClassifier;
use fire_risk::features::FEATURE_NAMES;
use fire_risk::web::build_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for .oneshot()

fn app(probability: f64) -> Router {
    build_router(Arc::new(AppState::new(Arc::new(StaticClassifier::new(probability)))))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_request(body: &str) -> Request<Body> {
    Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_request(body: String) -> Request<Body> {
    Request::builder()
        .uri("/api/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn full_feature_body() -> Value {
    let object: serde_json::Map<String, Value> = FEATURE_NAMES
        .iter()
        .map(|name| (name.to_string(), json!(10.0)))
        .collect();
    Value::Object(object)
}

#[tokio::test]
async fn form_prediction_renders_results() {
    let response = app(0.42)
        .oneshot(form_request(
            "temperature=30&wind_speed=20&humidity=40&FFMC=85&DMC=26&DC=94.8",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_string(response).await;
    assert!(page.contains("id=\"results\""));
    assert!(page.contains("Medium Risk"));
    assert!(page.contains("42.0"));
    assert!(page.contains("8.50 m/min"));
    assert!(!page.contains("id=\"error\""));
}

#[tokio::test]
async fn form_missing_field_renders_error_panel_with_200() {
    let response = app(0.42)
        .oneshot(form_request("temperature=30&wind_speed=20&humidity=40&DMC=26&DC=94.8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_string(response).await;
    assert!(page.contains("id=\"error\""));
    assert!(page.contains("FFMC"));
    assert!(!page.contains("id=\"results\""));
}

#[tokio::test]
async fn form_with_wrong_content_type_still_answers_200() {
    let req = Request::builder()
        .uri("/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app(0.42).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("id=\"error\""));
}

#[tokio::test]
async fn api_prediction_succeeds_with_all_features() {
    let response = app(0.81)
        .oneshot(json_request(full_feature_body().to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["probability"], json!(0.81));
    assert_eq!(body["risk_level"], json!("High Risk"));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn api_missing_key_reports_failure_with_200() {
    let mut payload = full_feature_body();
    payload.as_object_mut().unwrap().remove("BUI");

    let response = app(0.81).oneshot(json_request(payload.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("BUI"));
    assert!(body.get("probability").is_none());
}

#[tokio::test]
async fn api_invalid_json_reports_failure_with_200() {
    let response = app(0.81)
        .oneshot(json_request("{not json".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn health_and_readiness() {
    let app = app(0.5);
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    let req = Request::builder().uri("/readyz").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, json!({ "ready": true }));
}

#[tokio::test]
async fn model_endpoint_lists_importances() {
    let req = Request::builder().uri("/api/model").body(Body::empty()).unwrap();
    let response = app(0.5).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["kind"], json!("static"));
    assert_eq!(body["n_features"], json!(11));
    assert_eq!(body["feature_importances"].as_array().unwrap().len(), 11);
}

#[tokio::test]
async fn index_and_about_pages_render() {
    for uri in ["/", "/about"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app(0.5).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("<html"));
    }
}
