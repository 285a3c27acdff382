use clap::Args;
use std::io::Read;
use std::path::{Path, PathBuf};
use titleguard_risk::config::AppConfig;
use titleguard_risk::error::AppError;
use titleguard_risk::telemetry;

/// Command-line overrides layered on top of the environment configuration.
#[derive(Args, Debug, Default)]
pub(crate) struct ConfigOverrides {
    /// Directory holding the model bundle (overrides RISK_MODEL_DIR)
    #[arg(long, global = true)]
    pub(crate) model_dir: Option<PathBuf>,
    /// Training CSV used when the bundle must be (re)built (overrides RISK_TRAINING_DATA)
    #[arg(long, global = true)]
    pub(crate) training_data: Option<PathBuf>,
}

impl ConfigOverrides {
    pub(crate) fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.model_dir {
            config.models.artifact_dir = dir;
        }
        if let Some(path) = self.training_data {
            config.models.training_data = path;
        }
    }
}

pub(crate) fn bootstrap(overrides: ConfigOverrides) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    overrides.apply(&mut config);
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

/// Read a whole file, or stdin when the path is `-`.
pub(crate) fn read_input(path: &Path) -> Result<String, AppError> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use titleguard_risk::config::{AppEnvironment, ModelConfig, TelemetryConfig};

    #[test]
    fn overrides_replace_model_paths() {
        let mut config = AppConfig {
            environment: AppEnvironment::Test,
            models: ModelConfig::default(),
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
        };
        ConfigOverrides {
            model_dir: Some(PathBuf::from("/srv/models")),
            training_data: None,
        }
        .apply(&mut config);

        assert_eq!(config.models.artifact_dir, PathBuf::from("/srv/models"));
        assert_eq!(
            config.models.training_data,
            ModelConfig::default().training_data
        );
    }

    #[test]
    fn reads_files_from_disk() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(file.path(), "{}").expect("write");
        assert_eq!(read_input(file.path()).expect("reads"), "{}");
    }
}
