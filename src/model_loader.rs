//! One-time model loading at process start.
//!
//! A failure here is fatal to `serve`: the process must not accept requests
//! without a usable classifier.

use crate::classifier::{FireClassifier, ModelKind, StaticClassifier};
use crate::config_loader::ServiceConfig;
use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::FEATURE_NAMES;
use crate::forest::RandomForestClassifier;
use crate::linear_model::LogisticClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const MANIFEST_FILE: &str = "model_manifest.json";

/// Deployment record written by the trainer beside each artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model_file: String,
    pub sha256: String,
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
}

impl ModelManifest {
    pub fn for_artifact(model_path: &Path, kind: ModelKind) -> FireRiskResult<Self> {
        Ok(Self {
            model_file: model_path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            sha256: hash_file(model_path)?,
            kind,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            trained_at: Utc::now(),
        })
    }

    pub fn read(path: &Path) -> FireRiskResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FireRiskError::io(format!("reading {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| FireRiskError::serialization("model manifest", e))
    }

    pub fn write(&self, path: &Path) -> FireRiskResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FireRiskError::serialization("model manifest", e))?;
        std::fs::write(path, json)
            .map_err(|e| FireRiskError::io(format!("writing {}", path.display()), e))
    }
}

pub fn hash_file(path: &Path) -> FireRiskResult<String> {
    let data = std::fs::read(path)
        .map_err(|e| FireRiskError::io(format!("hashing {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

fn verify_manifest(model_path: &Path, manifest_path: &Path, kind: ModelKind) -> FireRiskResult<()> {
    let load_err = |msg: String| FireRiskError::model_load(model_path.display().to_string(), msg);

    let manifest = ModelManifest::read(manifest_path).map_err(|e| load_err(e.to_string()))?;
    if manifest.kind != kind {
        return Err(load_err(format!(
            "manifest describes a {} model, configured kind is {kind}",
            manifest.kind
        )));
    }
    if manifest.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
        return Err(load_err("manifest feature order does not match".to_string()));
    }
    let actual = hash_file(model_path).map_err(|e| load_err(e.to_string()))?;
    if actual != manifest.sha256 {
        return Err(load_err(format!(
            "sha256 mismatch: manifest {}, artifact {actual}",
            manifest.sha256
        )));
    }
    info!("Model artifact matches manifest (sha256 {actual})");
    Ok(())
}

/// Load the configured classifier.
pub fn load_classifier(config: &ServiceConfig) -> FireRiskResult<Arc<dyn FireClassifier>> {
    let path = &config.model.path;
    let kind = config.model.kind;

    if config.model.verify_manifest {
        verify_manifest(path, &config.manifest_path(), kind)?;
    }

    let classifier: Arc<dyn FireClassifier> = match kind {
        ModelKind::RandomForest => {
            let forest = RandomForestClassifier::from_json_file(path)?;
            info!(
                "Loaded random forest '{}' with {} trees from {}",
                forest.describe().name,
                forest.n_estimators(),
                path.display()
            );
            Arc::new(forest)
        }
        ModelKind::Logistic => {
            let model = LogisticClassifier::from_safetensors(path)?;
            info!("Loaded logistic model from {}", path.display());
            Arc::new(model)
        }
        ModelKind::Static => {
            warn!("Using the static classifier; predictions are a fixed 0.5");
            Arc::new(StaticClassifier::new(0.5))
        }
    };

    Ok(classifier)
}
