use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::dataset::TrainingSet;
use super::features::{name_values, FeatureVector};
use super::gbdt::{BoostingParams, GradientBoostedClassifier};
use super::logistic::LogisticRegression;
use super::scaler::StandardScaler;
use super::shap::{self, ExplainError, ShapValues};
use super::ModelError;

/// Bumped whenever the serialized layout changes; older bundles are retrained.
pub const FORMAT_VERSION: u32 = 1;

pub const BUNDLE_FILE_NAME: &str = "risk_model_bundle.json";

/// Provenance of the training rows a bundle was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub positives: usize,
    pub fingerprint: u64,
}

/// Everything scoring needs from training, persisted as one JSON bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    format_version: u32,
    trained_at: DateTime<Utc>,
    dataset: DatasetSummary,
    scaler: StandardScaler,
    classifier: GradientBoostedClassifier,
    delay_model: LogisticRegression,
}

#[derive(Deserialize)]
struct BundleHeader {
    format_version: u32,
}

impl ModelArtifacts {
    pub fn train(
        set: &TrainingSet,
        params: BoostingParams,
        delay_regularization: f64,
    ) -> Result<Self, ModelError> {
        let scaler = StandardScaler::fit(&set.rows)?;
        let scaled: Vec<FeatureVector> = set.rows.iter().map(|row| scaler.transform(row)).collect();

        let classifier = GradientBoostedClassifier::fit(&scaled, &set.labels, params)?;
        let delay_model = LogisticRegression::fit(&scaled, &set.labels, delay_regularization)?;

        Ok(Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            dataset: DatasetSummary {
                rows: set.len(),
                positives: set.positives(),
                fingerprint: set.fingerprint,
            },
            scaler,
            classifier,
            delay_model,
        })
    }

    /// Read a bundle. A missing file is `Ok(None)`; a bundle written by a
    /// different format version is `IncompatibleBundle`, and one whose
    /// models could not be evaluated safely is `Malformed`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ModelError> {
        let bytes = match fs::read(path.as_ref()) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let header: BundleHeader = serde_json::from_slice(&bytes)?;
        if header.format_version != FORMAT_VERSION {
            return Err(ModelError::IncompatibleBundle {
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }

        let artifacts: Self = serde_json::from_slice(&bytes)?;
        artifacts.validate()?;
        Ok(Some(artifacts))
    }

    fn validate(&self) -> Result<(), ModelError> {
        self.scaler
            .validate()
            .and_then(|()| self.classifier.validate())
            .and_then(|()| self.delay_model.validate())
            .map_err(ModelError::Malformed)
    }

    /// Write the bundle through a temporary file in the target directory,
    /// then rename it over `path`.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, self)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(path)?;
        Ok(())
    }

    pub fn risk_probability(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(features);
        self.classifier.predict_proba(scaled.as_slice())
    }

    pub fn delay_probability(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(features);
        self.delay_model.predict_proba(scaled.as_slice())
    }

    pub fn explain(&self, features: &FeatureVector) -> Result<ShapValues, ExplainError> {
        let scaled = self.scaler.transform(features);
        shap::explain(&self.classifier, scaled.as_slice())
    }

    pub fn feature_importances(&self) -> BTreeMap<String, f64> {
        name_values(self.classifier.feature_importances())
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn dataset(&self) -> &DatasetSummary {
        &self.dataset
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &GradientBoostedClassifier {
        &self.classifier
    }

    pub fn delay_model(&self) -> &LogisticRegression {
        &self.delay_model
    }
}
