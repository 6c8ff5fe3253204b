use crate::app_state::AppState;
use crate::config_loader::{load_config, ServiceConfig};
use crate::features::RAW_FIELDS;
use crate::log_sink::{self, EntryPoint};
use crate::model_loader::load_classifier;
use crate::web::build_app;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level CLI interface for the fire risk service
#[derive(Parser)]
#[command(
    name = "fire_risk",
    version,
    about = "Forest fire risk prediction service"
)]
pub struct Cli {
    /// Configuration file (defaults to $FIRE_RISK_CONFIG, then fire_risk.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides shared by every command that loads a model.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model artifact path
    #[arg(long)]
    pub model: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the web form and JSON API
    Serve {
        /// Host/IP to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long)]
        port: Option<u16>,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Score one observation through the form pipeline and print the result as JSON
    Predict {
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        wind_speed: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        ffmc: f64,
        #[arg(long)]
        dmc: f64,
        #[arg(long)]
        dc: f64,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print model metadata and feature importances
    ModelInfo {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn apply_model_override(config: &mut ServiceConfig, args: &ModelArgs) {
    if let Some(path) = &args.model {
        config.model.path = path.clone();
    }
}

pub fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    log_sink::init(&config.logging);

    match cli.command {
        Commands::Serve { host, port, model } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            apply_model_override(&mut config, &model);
            serve(config)
        }
        Commands::Predict {
            temperature,
            wind_speed,
            humidity,
            ffmc,
            dmc,
            dc,
            model,
        } => {
            apply_model_override(&mut config, &model);
            let classifier = load_classifier(&config).context("Failed to load model")?;
            let state = AppState::new(classifier);

            let values = [temperature, wind_speed, humidity, ffmc, dmc, dc];
            let fields: HashMap<String, String> = RAW_FIELDS
                .iter()
                .zip(values)
                .map(|(name, v)| (name.to_string(), v.to_string()))
                .collect();

            let ctx = state.service.predict_raw(&fields, EntryPoint::Cli);
            match (ctx.prediction, ctx.error) {
                (Some(prediction), _) => {
                    println!("{}", serde_json::to_string_pretty(&prediction)?);
                    Ok(())
                }
                (None, error) => anyhow::bail!(error.unwrap_or_else(|| "prediction failed".into())),
            }
        }
        Commands::ModelInfo { model } => {
            apply_model_override(&mut config, &model);
            let classifier = load_classifier(&config).context("Failed to load model")?;
            let report = serde_json::json!({
                "model": classifier.describe(),
                "feature_importances": classifier.feature_importances(),
                "path": config.model.path,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    config.check_servable()?;
    // A server without a model must not start.
    let classifier = load_classifier(&config)
        .with_context(|| format!("Failed to load model from {}", config.model.path.display()))?;
    let state = Arc::new(AppState::new(classifier));
    let app = build_app(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        tracing::info!("HTTP server listening on http://{addr}");
        axum::serve(listener, app).await.context("Server error")
    })
}
