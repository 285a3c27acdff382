//! Exact path-dependent TreeSHAP over the boosted ensemble.
//!
//! Attributions live in log-odds space: `base_value + sum(contributions)`
//! reproduces the classifier margin for the explained row.

use std::collections::BTreeMap;

use super::features::{name_values, FEATURE_COUNT};
use super::gbdt::GradientBoostedClassifier;
use super::tree::{RegressionTree, TreeNode};

/// Relative tolerance of the additivity check.
const ADDITIVITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("expected {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("feature '{feature}' is not finite")]
    NonFiniteInput { feature: &'static str },
    #[error("attribution does not add up: base + contributions = {reconstructed}, margin = {margin}")]
    Additivity { reconstructed: f64, margin: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapValues {
    pub base_value: f64,
    pub contributions: [f64; FEATURE_COUNT],
}

impl ShapValues {
    pub fn named(&self) -> BTreeMap<String, f64> {
        name_values(&self.contributions)
    }

    pub fn total(&self) -> f64 {
        self.base_value + self.contributions.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Shapley values of the ensemble margin for one standardized row.
pub fn explain(model: &GradientBoostedClassifier, x: &[f64]) -> Result<ShapValues, ExplainError> {
    if x.len() != FEATURE_COUNT {
        return Err(ExplainError::DimensionMismatch {
            expected: FEATURE_COUNT,
            found: x.len(),
        });
    }
    if let Some(index) = x.iter().position(|value| !value.is_finite()) {
        return Err(ExplainError::NonFiniteInput {
            feature: super::features::FEATURE_NAMES[index],
        });
    }

    let mut contributions = [0.0; FEATURE_COUNT];
    for tree in model.trees() {
        if tree.node(0).cover() <= 0.0 {
            continue;
        }
        recurse(tree, 0, x, &mut contributions, Vec::with_capacity(8), 1.0, 1.0, None);
    }

    let values = ShapValues {
        base_value: model.expected_value(),
        contributions,
    };

    let margin = model.decision_function(x);
    let reconstructed = values.total();
    if !reconstructed.is_finite()
        || !margin.is_finite()
        || (reconstructed - margin).abs() > ADDITIVITY_TOLERANCE * margin.abs().max(1.0)
    {
        return Err(ExplainError::Additivity {
            reconstructed,
            margin,
        });
    }

    Ok(values)
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &RegressionTree,
    index: usize,
    x: &[f64],
    phi: &mut [f64; FEATURE_COUNT],
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match tree.node(index) {
        TreeNode::Leaf { value, .. } => {
            for position in 1..path.len() {
                let element = path[position];
                let weight = unwound_path_sum(&path, position);
                if let Some(feature) = element.feature {
                    phi[feature] +=
                        weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split {
            feature: split_feature,
            threshold,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if x[*split_feature] <= *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_zero_fraction = tree.node(hot).cover() / cover;
            let cold_zero_fraction = tree.node(cold).cover() / cover;

            let mut incoming_zero_fraction = 1.0;
            let mut incoming_one_fraction = 1.0;
            if let Some(position) = path
                .iter()
                .position(|element| element.feature == Some(*split_feature))
            {
                incoming_zero_fraction = path[position].zero_fraction;
                incoming_one_fraction = path[position].one_fraction;
                unwind_path(&mut path, position);
            }

            recurse(
                tree,
                hot,
                x,
                phi,
                path.clone(),
                hot_zero_fraction * incoming_zero_fraction,
                incoming_one_fraction,
                Some(*split_feature),
            );
            recurse(
                tree,
                cold,
                x,
                phi,
                path,
                cold_zero_fraction * incoming_zero_fraction,
                0.0,
                Some(*split_feature),
            );
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let scale = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / scale;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / scale;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, position: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let previous = path[i].weight;
            path[i].weight = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                previous - path[i].weight * zero_fraction * (depth - i) as f64 / scale;
        } else {
            path[i].weight = path[i].weight * scale / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in position..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

fn unwound_path_sum(path: &[PathElement], position: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let scale = (depth + 1) as f64;
    let mut next_one_portion = path[depth].weight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let portion = next_one_portion * scale / ((i + 1) as f64 * one_fraction);
            total += portion;
            next_one_portion =
                path[i].weight - portion * zero_fraction * (depth - i) as f64 / scale;
        } else if zero_fraction != 0.0 {
            total += (path[i].weight / zero_fraction) / ((depth - i) as f64 / scale);
        }
    }

    total
}
