//! Trained components behind the blended score: the boosted risk
//! classifier, its TreeSHAP explainer, the closing-delay model, and the
//! registry that owns them.

pub mod artifacts;
pub mod dataset;
pub mod features;
pub mod gbdt;
pub mod logistic;
pub mod registry;
mod rng;
pub mod scaler;
pub mod shap;
pub mod tree;

pub use artifacts::{DatasetSummary, ModelArtifacts, BUNDLE_FILE_NAME, FORMAT_VERSION};
pub use dataset::{DatasetError, TrainingSet};
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use gbdt::{BoostingParams, GradientBoostedClassifier};
pub use logistic::LogisticRegression;
pub use registry::{ArtifactSource, MlCapability, ModelRegistry};
pub use scaler::StandardScaler;
pub use shap::{ExplainError, ShapValues};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("training set has {rows} rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },
    #[error("training labels contain a single class")]
    SingleClass,
    #[error("normal equations are singular")]
    SingularSystem,
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("artifact bundle I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact bundle is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to move artifact bundle into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("artifact bundle format {found} does not match expected {expected}")]
    IncompatibleBundle { found: u32, expected: u32 },
    #[error("artifact bundle is malformed: {0}")]
    Malformed(String),
}
