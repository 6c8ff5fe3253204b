// Logging setup and structured prediction records.

use crate::config_loader::LoggingConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when it parses. Calling this
/// twice is harmless; the second call leaves the first subscriber in place.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(&config.level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Filter string for a configured level.
///
/// A bare level such as `debug` scopes this crate and the HTTP trace layer;
/// anything already carrying a directive (`target=level`) is used as written.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') {
        level.to_string()
    } else {
        format!("fire_risk={level},tower_http={level}")
    }
}

/// Which transport a prediction arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    Form,
    Api,
    Cli,
}

/// Structured record of one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionEvent {
    pub trace_id: String,
    pub entry_point: EntryPoint,
    pub success: bool,
    pub probability: Option<f64>,
    pub risk_level: Option<&'static str>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionEvent {
    pub fn success(entry_point: EntryPoint, probability: f64, risk_level: &'static str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            entry_point,
            success: true,
            probability: Some(probability),
            risk_level: Some(risk_level),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(entry_point: EntryPoint, error: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            entry_point,
            success: false,
            probability: None,
            risk_level: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn emit(&self) {
        if self.success {
            tracing::info!(
                trace_id = %self.trace_id,
                entry_point = ?self.entry_point,
                probability = self.probability.unwrap_or_default(),
                risk_level = self.risk_level.unwrap_or_default(),
                "prediction served"
            );
        } else {
            tracing::warn!(
                trace_id = %self.trace_id,
                entry_point = ?self.entry_point,
                error = self.error.as_deref().unwrap_or_default(),
                "prediction failed"
            );
        }
    }
}
