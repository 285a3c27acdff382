use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::model::{BoostingParams, BUNDLE_FILE_NAME};

/// Distinguishes runtime behavior for different stages of deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the risk engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub models: ModelConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let defaults = ModelConfig::default();
        let artifact_dir = env::var("RISK_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.artifact_dir);
        let training_data = env::var("RISK_TRAINING_DATA")
            .map(PathBuf::from)
            .unwrap_or(defaults.training_data);
        let enabled = match env::var("RISK_ML_ENABLED") {
            Ok(raw) => parse_flag("RISK_ML_ENABLED", &raw)?,
            Err(_) => defaults.enabled,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            models: ModelConfig {
                enabled,
                artifact_dir,
                training_data,
                ..defaults
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where model artifacts live and how they are trained.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// `false` pins scoring to the weighted aggregate.
    pub enabled: bool,
    pub artifact_dir: PathBuf,
    pub training_data: PathBuf,
    pub boosting: BoostingParams,
    /// Inverse L2 strength of the delay model.
    pub delay_regularization: f64,
}

impl ModelConfig {
    pub fn bundle_path(&self) -> PathBuf {
        self.artifact_dir.join(BUNDLE_FILE_NAME)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artifact_dir: PathBuf::from("models"),
            training_data: PathBuf::from("data/synthetic_training_data.csv"),
            boosting: BoostingParams::default(),
            delay_regularization: 1.0,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be true or false, got '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RISK_MODEL_DIR");
        env::remove_var("RISK_TRAINING_DATA");
        env::remove_var("RISK_ML_ENABLED");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert!(config.models.enabled);
        assert_eq!(
            config.models.bundle_path(),
            Path::new("models").join("risk_model_bundle.json")
        );
        assert_eq!(
            config.models.training_data,
            PathBuf::from("data/synthetic_training_data.csv")
        );
        assert_eq!(config.models.boosting.n_estimators, 200);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn reads_model_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "prod");
        env::set_var("RISK_MODEL_DIR", "/var/lib/titleguard");
        env::set_var("RISK_ML_ENABLED", "off");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.models.artifact_dir, PathBuf::from("/var/lib/titleguard"));
        assert!(!config.models.enabled);
    }

    #[test]
    fn rejects_unparseable_flags() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RISK_ML_ENABLED", "sometimes");
        let err = AppConfig::load().expect_err("flag is invalid");
        reset_env();

        assert!(matches!(
            err,
            ConfigError::InvalidFlag {
                name: "RISK_ML_ENABLED",
                ..
            }
        ));
    }
}
