use crate::classifier::FireClassifier;
use crate::prediction_service::PredictionService;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Process-wide state shared by every handler. Read-only after startup.
pub struct AppState {
    pub service: PredictionService,
    pub model_loaded_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn FireClassifier>) -> Self {
        Self {
            service: PredictionService::new(classifier),
            model_loaded_at: Utc::now(),
        }
    }
}
