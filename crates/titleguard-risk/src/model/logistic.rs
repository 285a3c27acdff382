use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{FeatureVector, FEATURE_COUNT};
use super::ModelError;
use crate::scoring::transforms::logistic;

const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-10;
const PARAMS: usize = FEATURE_COUNT + 1;

/// L2-regularized logistic regression fitted with Newton iterations.
/// The intercept is not penalized; `c` is the inverse regularization strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: [f64; FEATURE_COUNT],
    intercept: f64,
    c: f64,
    iterations: usize,
}

impl LogisticRegression {
    pub fn fit(rows: &[FeatureVector], labels: &[bool], c: f64) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ModelError::LabelMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let positives = labels.iter().filter(|label| **label).count();
        if positives == 0 || positives == labels.len() {
            return Err(ModelError::SingleClass);
        }

        let lambda = if c > 0.0 { 1.0 / c } else { 1.0 };
        // theta[0] is the intercept.
        let mut theta = [0.0; PARAMS];
        let mut objective = penalized_loss(rows, labels, &theta, lambda);
        let mut iterations = 0;

        for iteration in 0..MAX_ITERATIONS {
            iterations = iteration + 1;
            let (gradient, mut hessian) = gradient_and_hessian(rows, labels, &theta, lambda);
            let mut step = gradient;
            solve_in_place(&mut hessian, &mut step)?;

            let mut scale = 1.0;
            let mut candidate = theta;
            let mut candidate_objective = f64::INFINITY;
            for _ in 0..30 {
                for (value, (current, delta)) in
                    candidate.iter_mut().zip(theta.iter().zip(step.iter()))
                {
                    *value = current - scale * delta;
                }
                candidate_objective = penalized_loss(rows, labels, &candidate, lambda);
                if candidate_objective <= objective {
                    break;
                }
                scale *= 0.5;
            }

            let max_change = theta
                .iter()
                .zip(candidate.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            theta = candidate;
            objective = candidate_objective.min(objective);
            if max_change < TOLERANCE {
                break;
            }
        }

        debug!(iterations, objective, "fitted logistic delay model");

        let mut weights = [0.0; FEATURE_COUNT];
        weights.copy_from_slice(&theta[1..]);
        Ok(Self {
            weights,
            intercept: theta[0],
            c,
            iterations,
        })
    }

    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(x)
                .map(|(weight, value)| weight * value)
                .sum::<f64>()
    }

    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        logistic(self.decision_function(x))
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.intercept.is_finite() && self.weights.iter().all(|weight| weight.is_finite()) {
            Ok(())
        } else {
            Err("delay model coefficients are not finite".to_string())
        }
    }

    pub fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Inverse regularization strength used at fit time.
    pub fn c(&self) -> f64 {
        self.c
    }
}

fn linear(theta: &[f64; PARAMS], row: &FeatureVector) -> f64 {
    theta[0]
        + theta[1..]
            .iter()
            .zip(row.0.iter())
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
}

fn penalized_loss(rows: &[FeatureVector], labels: &[bool], theta: &[f64; PARAMS], lambda: f64) -> f64 {
    let data_loss: f64 = rows
        .iter()
        .zip(labels)
        .map(|(row, label)| {
            let z = linear(theta, row);
            // log(1 + e^z) - y*z, written to stay finite for large |z|.
            let softplus = if z > 0.0 {
                z + (-z).exp().ln_1p()
            } else {
                z.exp().ln_1p()
            };
            softplus - if *label { z } else { 0.0 }
        })
        .sum();
    let penalty: f64 = theta[1..].iter().map(|w| w * w).sum();
    data_loss + 0.5 * lambda * penalty
}

fn gradient_and_hessian(
    rows: &[FeatureVector],
    labels: &[bool],
    theta: &[f64; PARAMS],
    lambda: f64,
) -> ([f64; PARAMS], [[f64; PARAMS]; PARAMS]) {
    let mut gradient = [0.0; PARAMS];
    let mut hessian = [[0.0; PARAMS]; PARAMS];

    for (row, label) in rows.iter().zip(labels) {
        let p = logistic(linear(theta, row));
        let error = p - if *label { 1.0 } else { 0.0 };
        let curvature = p * (1.0 - p);

        let mut design = [1.0; PARAMS];
        design[1..].copy_from_slice(&row.0);

        for i in 0..PARAMS {
            gradient[i] += error * design[i];
            for j in 0..PARAMS {
                hessian[i][j] += curvature * design[i] * design[j];
            }
        }
    }

    for i in 1..PARAMS {
        gradient[i] += lambda * theta[i];
        hessian[i][i] += lambda;
    }

    (gradient, hessian)
}

/// Gaussian elimination with partial pivoting; the solution replaces `rhs`.
fn solve_in_place(
    matrix: &mut [[f64; PARAMS]; PARAMS],
    rhs: &mut [f64; PARAMS],
) -> Result<(), ModelError> {
    for column in 0..PARAMS {
        let pivot = (column..PARAMS)
            .max_by(|a, b| matrix[*a][column].abs().total_cmp(&matrix[*b][column].abs()))
            .unwrap_or(column);
        if matrix[pivot][column].abs() < 1e-12 {
            return Err(ModelError::SingularSystem);
        }
        matrix.swap(column, pivot);
        rhs.swap(column, pivot);

        for row in column + 1..PARAMS {
            let factor = matrix[row][column] / matrix[column][column];
            if factor == 0.0 {
                continue;
            }
            for k in column..PARAMS {
                matrix[row][k] -= factor * matrix[column][k];
            }
            rhs[row] -= factor * rhs[column];
        }
    }

    for row in (0..PARAMS).rev() {
        let tail: f64 = (row + 1..PARAMS).map(|k| matrix[row][k] * rhs[k]).sum();
        rhs[row] = (rhs[row] - tail) / matrix[row][row];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_rows() -> (Vec<FeatureVector>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = (i as f64 - 20.0) / 10.0;
            let mut features = [0.0; FEATURE_COUNT];
            features[0] = x;
            features[1] = ((i * 7) % 11) as f64 / 11.0;
            rows.push(FeatureVector(features));
            labels.push((i % 4 != 0 && x > -0.5) || i == 3);
        }
        (rows, labels)
    }

    #[test]
    fn learns_positive_slope_on_the_signal() {
        let (rows, labels) = separable_rows();
        let model = LogisticRegression::fit(&rows, &labels, 1.0).expect("fits");

        assert!(model.weights()[0] > 0.0);
        let mut low = [0.0; FEATURE_COUNT];
        low[0] = -2.0;
        let mut high = [0.0; FEATURE_COUNT];
        high[0] = 2.0;
        assert!(model.predict_proba(&high) > model.predict_proba(&low));
        assert!(model.iterations() < MAX_ITERATIONS);
    }

    #[test]
    fn stronger_regularization_shrinks_weights() {
        let (rows, labels) = separable_rows();
        let loose = LogisticRegression::fit(&rows, &labels, 10.0).expect("fits");
        let tight = LogisticRegression::fit(&rows, &labels, 0.01).expect("fits");
        assert!(tight.weights()[0].abs() < loose.weights()[0].abs());
    }

    #[test]
    fn constant_columns_are_handled_by_the_penalty() {
        let (rows, labels) = separable_rows();
        let model = LogisticRegression::fit(&rows, &labels, 1.0).expect("fits");
        for unused in 2..FEATURE_COUNT {
            assert!(model.weights()[unused].abs() < 1e-9);
        }
    }
}
