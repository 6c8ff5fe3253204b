use crate::app_state::AppState;
use crate::config_loader::ServerConfig;
use crate::presentation::{render_about, render_index};
use crate::prediction_service::{ApiPrediction, PageContext};
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    response::{Html, Json},
    routing::{get, post},
    Form, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router: pages, prediction endpoints, model metadata and health checks.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_api))
        .route("/api/model", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router with CORS applied per server settings.
pub fn build_app(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let router = build_router(state);
    if server.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn index() -> Html<String> {
    Html(render_index(&PageContext::default()))
}

async fn about() -> Html<String> {
    Html(render_about())
}

/// Always answers 200 with a page; a body that is not a form becomes an error panel.
async fn predict_form(
    State(st): State<Arc<AppState>>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Html<String> {
    let ctx = match form {
        Ok(Form(fields)) => st.service.predict_form(&fields),
        Err(rejection) => {
            tracing::warn!("rejected form submission: {rejection}");
            PageContext::error(format!("Prediction Error: {}", rejection.body_text()))
        }
    };
    Html(render_index(&ctx))
}

/// Always answers 200; success or failure is carried in the body.
async fn predict_api(
    State(st): State<Arc<AppState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Json<ApiPrediction> {
    match body {
        Ok(Json(value)) => Json(st.service.predict_api(&value)),
        Err(rejection) => {
            tracing::warn!("rejected JSON body: {rejection}");
            Json(ApiPrediction::failure(rejection.body_text()))
        }
    }
}

async fn model_info(State(st): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let info = st.service.model_info();
    Json(serde_json::json!({
        "name": info.name,
        "kind": info.kind,
        "n_features": info.n_features,
        "feature_names": info.feature_names,
        "feature_importances": st.service.feature_importances(),
        "loaded_at": st.model_loaded_at.to_rfc3339(),
    }))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// Startup aborts when the model cannot be loaded, so a running router is ready.
async fn readyz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ready": true }))
}
