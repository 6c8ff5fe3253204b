//! Library root for the `fire_risk` crate.
//! Forest-fire risk prediction: feature derivation, classifiers, HTTP surface and training.

// Core error handling
pub mod errors;

// Features & models
pub mod classifier;
pub mod features;
pub mod forest;
pub mod linear_model;
pub mod model_loader;

// Risk interpretation & orchestration
pub mod prediction_service;
pub mod risk_policy;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

// Web server interface
pub mod app_state;
pub mod presentation;
pub mod web;

// Logging
pub mod log_sink;

// Training
pub mod dataset;
pub mod forest_trainer;
pub mod linear_trainer;
pub mod metrics;


pub use classifier::{FeatureImportance, FireClassifier, ModelInfo, ModelKind, StaticClassifier};
pub use errors::{FireRiskError, FireRiskResult};
pub use features::{derive, FeatureVector, RawObservation, FEATURE_NAMES};
pub use prediction_service::{ApiPrediction, PageContext, PredictionResult, PredictionService};
pub use risk_policy::{classify, RiskLevel};
