// src/tests/config.rs
use crate::classifier::ModelKind;
use crate::config_loader::load_config;
use crate::log_sink::filter_directives;
use figment::Jail;
use tracing_subscriber::EnvFilter;
use std::path::{Path, PathBuf};

#[test]
fn defaults_apply_without_file_or_env() {
    Jail::expect_with(|_jail| {
        let config = load_config(None).expect("defaults should load");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.model.kind, ModelKind::RandomForest);
        assert_eq!(config.model.path, PathBuf::from("models/forest_fire_model.json"));
        assert!(!config.model.verify_manifest);
        Ok(())
    });
}

#[test]
fn toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "fire_risk.toml",
            r#"
            [server]
            host = "127.0.0.1"
            port = 8088

            [model]
            path = "artifacts/model.safetensors"
            kind = "logistic"
            "#,
        )?;
        let config = load_config(None).expect("file should load");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.model.kind, ModelKind::Logistic);
        assert_eq!(config.logging.level, "info");
        Ok(())
    });
}

#[test]
fn env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[server]\nport = 7000\n")?;
        jail.set_env("FIRE_RISK_SERVER__PORT", "9100");
        jail.set_env("FIRE_RISK_LOGGING__JSON", "true");
        let config = load_config(Some(Path::new("custom.toml"))).expect("layers should merge");
        assert_eq!(config.server.port, 9100);
        assert!(config.logging.json);
        Ok(())
    });
}

#[test]
fn config_path_variable_selects_the_file() {
    Jail::expect_with(|jail| {
        jail.create_file("elsewhere.toml", "[model]\nkind = \"static\"\npath = \"unused\"\n")?;
        jail.set_env("FIRE_RISK_CONFIG", "elsewhere.toml");
        let config = load_config(None).expect("file from env should load");
        assert_eq!(config.model.kind, ModelKind::Static);
        Ok(())
    });
}

#[test]
fn zero_port_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("FIRE_RISK_SERVER__PORT", "0");
        let err = load_config(None).unwrap_err();
        assert!(err.to_string().contains("server.port"));
        Ok(())
    });
}

#[test]
fn manifest_defaults_beside_the_model() {
    Jail::expect_with(|jail| {
        jail.set_env("FIRE_RISK_MODEL__PATH", "out/forest.json");
        let config = load_config(None).expect("config should load");
        assert_eq!(config.manifest_path(), PathBuf::from("out/model_manifest.json"));
        assert!(config.to_toml().unwrap().contains("[server]"));
        Ok(())
    });
}

#[test]
fn bare_level_is_scoped_to_service_targets() {
    assert_eq!(filter_directives("debug"), "fire_risk=debug,tower_http=debug");
}

#[test]
fn directive_level_is_used_as_written() {
    Jail::expect_with(|jail| {
        jail.set_env("FIRE_RISK_LOGGING__LEVEL", "fire_risk=trace");
        let config = load_config(None).expect("directive level should validate");
        let directives = filter_directives(&config.logging.level);
        assert_eq!(directives, "fire_risk=trace");
        assert!(EnvFilter::try_new(&directives).is_ok());
        Ok(())
    });
}

#[test]
fn static_model_cannot_be_served() {
    Jail::expect_with(|jail| {
        jail.set_env("FIRE_RISK_MODEL__KIND", "static");
        let config = load_config(None).expect("static kind still loads for dry runs");
        let err = config.check_servable().unwrap_err();
        assert!(err.to_string().contains("static"));

        jail.set_env("FIRE_RISK_MODEL__KIND", "random_forest");
        assert!(load_config(None).unwrap().check_servable().is_ok());
        Ok(())
    });
}
