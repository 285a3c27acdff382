//! Underwriting risk engine for property title and closing risk.
//!
//! The [`scoring`] module turns a [`scoring::PropertyFactorRecord`] into a
//! [`scoring::RiskResult`], blending analytic factor transforms with the
//! trained models owned by a [`model::ModelRegistry`].

pub mod config;
pub mod derived;
pub mod error;
pub mod model;
pub mod scoring;
pub mod telemetry;

pub use model::{MlCapability, ModelArtifacts, ModelRegistry};
pub use scoring::{Observation, PropertyFactorRecord, RiskEngine, RiskResult, RiskTier};
