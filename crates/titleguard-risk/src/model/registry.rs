use std::sync::Arc;

use tracing::{info, warn};

use super::artifacts::ModelArtifacts;
use super::dataset::TrainingSet;
use super::ModelError;
use crate::config::ModelConfig;

/// Where ready artifacts came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Read from the persisted bundle.
    Loaded,
    /// Fitted at startup from the training resource.
    Trained,
    /// Handed in by the caller.
    Provided,
}

impl ArtifactSource {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactSource::Loaded => "loaded",
            ArtifactSource::Trained => "trained",
            ArtifactSource::Provided => "provided",
        }
    }
}

#[derive(Debug, Clone)]
pub enum MlCapability {
    Ready {
        artifacts: Arc<ModelArtifacts>,
        source: ArtifactSource,
    },
    /// Scoring runs weighted-only for the lifetime of the registry.
    Disabled { reason: String },
}

/// Owns the trained artifacts. Built once at startup, immutable afterwards,
/// and shared across scoring threads without locking.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    capability: MlCapability,
}

impl ModelRegistry {
    /// Load the persisted bundle, or train and persist a new one when it is
    /// missing or unusable. Never fails: when neither path yields artifacts
    /// the registry is disabled with the reason recorded.
    pub fn initialize(config: &ModelConfig) -> Self {
        if !config.enabled {
            info!("ML scoring disabled by configuration");
            return Self::disabled("disabled by configuration");
        }

        let bundle_path = config.bundle_path();
        match ModelArtifacts::load(&bundle_path) {
            Ok(Some(artifacts)) => {
                info!(
                    path = %bundle_path.display(),
                    trained_at = %artifacts.trained_at(),
                    rows = artifacts.dataset().rows,
                    "loaded model bundle"
                );
                return Self::ready(artifacts, ArtifactSource::Loaded);
            }
            Ok(None) => {
                info!(path = %bundle_path.display(), "no model bundle found; training");
            }
            Err(err) => {
                warn!(path = %bundle_path.display(), %err, "model bundle unusable; retraining");
            }
        }

        match train_and_persist(config) {
            Ok(artifacts) => Self::ready(artifacts, ArtifactSource::Trained),
            Err(err) => {
                warn!(%err, "model training failed; scoring will be weighted-only");
                Self::disabled(format!("training failed: {err}"))
            }
        }
    }

    /// Train from the configured resource and overwrite the bundle,
    /// ignoring any persisted artifacts.
    pub fn retrain(config: &ModelConfig) -> Result<Self, ModelError> {
        let artifacts = train_and_persist(config)?;
        Ok(Self::ready(artifacts, ArtifactSource::Trained))
    }

    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self::ready(artifacts, ArtifactSource::Provided)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            capability: MlCapability::Disabled {
                reason: reason.into(),
            },
        }
    }

    fn ready(artifacts: ModelArtifacts, source: ArtifactSource) -> Self {
        Self {
            capability: MlCapability::Ready {
                artifacts: Arc::new(artifacts),
                source,
            },
        }
    }

    pub fn capability(&self) -> &MlCapability {
        &self.capability
    }

    pub fn artifacts(&self) -> Option<&ModelArtifacts> {
        match &self.capability {
            MlCapability::Ready { artifacts, .. } => Some(artifacts.as_ref()),
            MlCapability::Disabled { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ArtifactSource> {
        match &self.capability {
            MlCapability::Ready { source, .. } => Some(*source),
            MlCapability::Disabled { .. } => None,
        }
    }

    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.capability {
            MlCapability::Ready { .. } => None,
            MlCapability::Disabled { reason } => Some(reason.as_str()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts().is_some()
    }
}

fn train_and_persist(config: &ModelConfig) -> Result<ModelArtifacts, ModelError> {
    let set = TrainingSet::from_path(&config.training_data)?;
    info!(
        path = %config.training_data.display(),
        rows = set.len(),
        positives = set.positives(),
        "training risk models"
    );

    let artifacts = ModelArtifacts::train(&set, config.boosting, config.delay_regularization)?;

    let bundle_path = config.bundle_path();
    match artifacts.persist(&bundle_path) {
        Ok(()) => info!(path = %bundle_path.display(), "persisted model bundle"),
        // Fitted models still serve this process.
        Err(err) => warn!(path = %bundle_path.display(), %err, "failed to persist model bundle"),
    }

    Ok(artifacts)
}
