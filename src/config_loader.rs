use crate::classifier::ModelKind;
use crate::errors::{FireRiskError, FireRiskResult};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "fire_risk.toml";
pub const CONFIG_PATH_VAR: &str = "FIRE_RISK_CONFIG";
pub const ENV_PREFIX: &str = "FIRE_RISK_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin calls to the JSON endpoint from any origin.
    #[serde(default)]
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub kind: ModelKind,
    /// Manifest to check the artifact against; defaults to
    /// `model_manifest.json` beside the artifact.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    #[serde(default)]
    pub verify_manifest: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/forest_fire_model.json"),
            kind: ModelKind::RandomForest,
            manifest_path: None,
            verify_manifest: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Layer defaults, the TOML file and `FIRE_RISK_*` environment variables.
///
/// The file is `path` when given, else `$FIRE_RISK_CONFIG`, else
/// `fire_risk.toml` in the working directory. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> FireRiskResult<ServiceConfig> {
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let figment = Figment::from(Serialized::defaults(ServiceConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));

    let config: ServiceConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl ServiceConfig {
    pub fn validate(&self) -> FireRiskResult<()> {
        if self.model.path.as_os_str().is_empty() {
            return Err(FireRiskError::config("model.path must be set"));
        }
        if self.server.port == 0 {
            return Err(FireRiskError::config("server.port must be non-zero"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(FireRiskError::config("logging.level must be set"));
        }
        let directives = crate::log_sink::filter_directives(&self.logging.level);
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&directives) {
            return Err(FireRiskError::config(format!(
                "logging.level '{}' is not a valid filter: {e}",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// `serve` only accepts trained artifacts; the static classifier is for
    /// tests and one-off `predict` dry runs.
    pub fn check_servable(&self) -> FireRiskResult<()> {
        if self.model.kind == ModelKind::Static {
            return Err(FireRiskError::config(
                "model.kind 'static' answers a fixed probability and cannot be served",
            ));
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.model
            .manifest_path
            .clone()
            .unwrap_or_else(|| self.model.path.with_file_name(crate::model_loader::MANIFEST_FILE))
    }

    pub fn to_toml(&self) -> FireRiskResult<String> {
        toml::to_string_pretty(self).map_err(|e| FireRiskError::config(e.to_string()))
    }
}
