use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_COUNT};
use super::ModelError;

/// Per-feature standardization fitted on the training set (population
/// standard deviation; constant columns keep unit scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    pub fn fit(rows: &[FeatureVector]) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for row in rows {
            for (acc, value) in mean.iter_mut().zip(row.0) {
                *acc += value;
            }
        }
        mean.iter_mut().for_each(|acc| *acc /= n);

        let mut scale = [0.0; FEATURE_COUNT];
        for row in rows {
            for (column, value) in row.0.iter().enumerate() {
                let diff = value - mean[column];
                scale[column] += diff * diff;
            }
        }
        for std in &mut scale {
            *std = (*std / n).sqrt();
            if *std < f64::EPSILON {
                *std = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let usable = self.mean.iter().all(|mean| mean.is_finite())
            && self.scale.iter().all(|scale| scale.is_finite() && *scale > 0.0);
        if usable {
            Ok(())
        } else {
            Err("scaler statistics are not finite and positive".to_string())
        }
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (column, value) in features.0.iter().enumerate() {
            scaled[column] = (value - self.mean[column]) / self.scale[column];
        }
        FeatureVector(scaled)
    }

    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns_and_keeps_constant_columns_finite() {
        let rows = vec![
            FeatureVector([0.0, 10.0, 0.1, 0.5, 20.0, 1.0, 4.0, 0.2, 0.0]),
            FeatureVector([1.0, 30.0, 0.3, 0.7, 40.0, 3.0, 8.0, 0.4, 0.0]),
        ];
        let scaler = StandardScaler::fit(&rows).expect("fits");

        assert_eq!(scaler.mean()[1], 20.0);
        assert_eq!(scaler.scale()[1], 10.0);
        assert_eq!(scaler.scale()[8], 1.0);

        let scaled = scaler.transform(&rows[1]);
        assert!((scaled.0[1] - 1.0).abs() < 1e-12);
        assert_eq!(scaled.0[8], 0.0);
    }

    #[test]
    fn empty_training_set_is_rejected() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(ModelError::EmptyTrainingSet)
        ));
    }
}
