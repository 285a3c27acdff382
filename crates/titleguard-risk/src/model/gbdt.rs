use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{FeatureVector, FEATURE_COUNT};
use super::rng::DetRng;
use super::tree::{RegressionTree, TreeFit};
use super::ModelError;
use crate::scoring::transforms::logistic;

/// Hyperparameters of the boosted ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn without replacement for each stage.
    pub subsample: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 4,
            learning_rate: 0.1,
            subsample: 0.8,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// Binary gradient-boosted tree classifier trained on log-loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: BoostingParams,
    init_margin: f64,
    trees: Vec<RegressionTree>,
    feature_importances: [f64; FEATURE_COUNT],
}

impl GradientBoostedClassifier {
    pub fn fit(
        rows: &[FeatureVector],
        labels: &[bool],
        params: BoostingParams,
    ) -> Result<Self, ModelError> {
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

        let n_rows = rows.len();
        let targets: Vec<f64> = labels.iter().map(|l| if *l { 1.0 } else { 0.0 }).collect();
        let init_margin = (positives as f64 / (n_rows - positives) as f64).ln();

        let columns: Vec<Vec<f64>> = (0..FEATURE_COUNT)
            .map(|feature| rows.iter().map(|row| row.0[feature]).collect())
            .collect();
        let sorted: Vec<Vec<usize>> = columns
            .iter()
            .map(|column| {
                let mut order: Vec<usize> = (0..n_rows).collect();
                order.sort_by(|a, b| column[*a].total_cmp(&column[*b]).then(a.cmp(b)));
                order
            })
            .collect();

        let subsample = params.subsample.clamp(f64::EPSILON, 1.0);
        let bag_size = ((subsample * n_rows as f64).floor() as usize).clamp(1, n_rows);
        let mut rng = DetRng::new(params.seed);

        let mut margins = vec![init_margin; n_rows];
        let mut residuals = vec![0.0; n_rows];
        let mut hessians = vec![0.0; n_rows];
        let mut importances = [0.0; FEATURE_COUNT];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for row in 0..n_rows {
                let p = logistic(margins[row]);
                residuals[row] = targets[row] - p;
                hessians[row] = p * (1.0 - p);
            }

            let in_bag = if bag_size < n_rows {
                rng.sample_mask(n_rows, bag_size)
            } else {
                vec![true; n_rows]
            };

            let (tree, gains) = TreeFit {
                columns: &columns,
                sorted: &sorted,
                residuals: &residuals,
                hessians: &hessians,
                in_bag: &in_bag,
                max_depth: params.max_depth,
                min_samples_leaf: params.min_samples_leaf,
                learning_rate: params.learning_rate,
            }
            .fit();

            let stage_total: f64 = gains.iter().sum();
            if stage_total > 0.0 {
                for (acc, gain) in importances.iter_mut().zip(&gains) {
                    *acc += gain / stage_total;
                }
            }

            for (row, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict(&rows[row].0);
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|value| *value /= total);
        }

        debug!(
            trees = trees.len(),
            rows = n_rows,
            positives,
            "fitted gradient-boosted classifier"
        );

        Ok(Self {
            params,
            init_margin,
            trees,
            feature_importances: importances,
        })
    }

    /// Raw log-odds for standardized features.
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.init_margin + self.trees.iter().map(|tree| tree.predict(x)).sum::<f64>()
    }

    /// Positive-class probability for standardized features.
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        logistic(self.decision_function(x))
    }

    /// Mean margin over the training distribution, the TreeSHAP base value.
    pub fn expected_value(&self) -> f64 {
        self.init_margin
            + self
                .trees
                .iter()
                .map(RegressionTree::expected_value)
                .sum::<f64>()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.init_margin.is_finite() {
            return Err(format!("classifier margin is {}", self.init_margin));
        }
        if self.feature_importances.iter().any(|value| !value.is_finite()) {
            return Err("classifier importances are not finite".to_string());
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|reason| format!("tree {index}: {reason}"))?;
        }
        Ok(())
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Impurity-based importances, normalized to sum to one.
    pub fn feature_importances(&self) -> &[f64; FEATURE_COUNT] {
        &self.feature_importances
    }
}
