use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;

/// Node of a fitted regression tree. `cover` is the number of in-bag
/// training rows that reached the node; TreeSHAP uses it as the background
/// distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    pub fn cover(&self) -> f64 {
        match self {
            TreeNode::Split { cover, .. } | TreeNode::Leaf { cover, .. } => *cover,
        }
    }
}

/// Regression tree stored as an arena; node 0 is the root. Rows with
/// `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    /// Structural check for trees read from disk. Children must come after
    /// their parent, so every walk from the root terminates.
    pub fn validate(&self) -> Result<(), String> {
        let len = self.nodes.len();
        if len == 0 {
            return Err("tree has no nodes".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    cover,
                } => {
                    if feature >= FEATURE_COUNT {
                        return Err(format!("node {index} splits on unknown feature {feature}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {index} has no threshold"));
                    }
                    let child_ok = |child: usize| child > index && child < len;
                    if !child_ok(left) || !child_ok(right) {
                        return Err(format!(
                            "node {index} links to children {left} and {right} in a tree of {len}"
                        ));
                    }
                    if !(cover.is_finite() && cover > 0.0) {
                        return Err(format!("split node {index} has cover {cover}"));
                    }
                }
                TreeNode::Leaf { value, cover } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {index} has value {value}"));
                    }
                    if !(cover.is_finite() && cover >= 0.0) {
                        return Err(format!("leaf {index} has cover {cover}"));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Cover-weighted mean leaf value.
    pub fn expected_value(&self) -> f64 {
        let root_cover = self.nodes[0].cover();
        if root_cover <= 0.0 {
            return 0.0;
        }
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Leaf { value, cover } => Some(value * cover),
                TreeNode::Split { .. } => None,
            })
            .sum::<f64>()
            / root_cover
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &RegressionTree, index: usize) -> usize {
            match tree.node(index) {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(tree, *left).max(walk(tree, *right))
                }
            }
        }
        walk(self, 0)
    }
}

/// Inputs for growing one boosting stage.
pub(crate) struct TreeFit<'a> {
    /// Column-major training matrix: `columns[feature][row]`.
    pub columns: &'a [Vec<f64>],
    /// Row indices of every column, sorted by value.
    pub sorted: &'a [Vec<usize>],
    pub residuals: &'a [f64],
    pub hessians: &'a [f64],
    pub in_bag: &'a [bool],
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    sum: f64,
    hessian: f64,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    gain: f64,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    left_sum: f64,
    left_count: usize,
    last_value: Option<f64>,
}

struct BuildNode {
    stats: NodeStats,
    split: Option<(usize, f64, usize, usize)>,
}

const MIN_GAIN: f64 = 1e-12;

impl TreeFit<'_> {
    /// Grow a tree level by level on the in-bag rows. Each level scans every
    /// presorted column once, so a stage costs `depth * features * rows`.
    /// Returns the tree (leaf values already scaled by the learning rate) and
    /// the squared-error reduction credited to each feature.
    pub(crate) fn fit(&self) -> (RegressionTree, Vec<f64>) {
        let n_rows = self.residuals.len();
        let n_features = self.columns.len();
        let mut importances = vec![0.0; n_features];

        let mut nodes = vec![BuildNode {
            stats: NodeStats::default(),
            split: None,
        }];
        let mut node_of: Vec<Option<usize>> = (0..n_rows)
            .map(|row| self.in_bag[row].then_some(0))
            .collect();
        self.accumulate_stats(&mut nodes, &node_of);

        let mut frontier = vec![0usize];
        for _ in 0..self.max_depth {
            if frontier.is_empty() {
                break;
            }

            let best = self.best_splits(&nodes, &node_of, &frontier);
            let mut next_frontier = Vec::new();

            for (&node, candidate) in frontier.iter().zip(best) {
                let Some(candidate) = candidate else { continue };
                let left = nodes.len();
                let right = left + 1;
                for _ in 0..2 {
                    nodes.push(BuildNode {
                        stats: NodeStats::default(),
                        split: None,
                    });
                }
                nodes[node].split = Some((candidate.feature, candidate.threshold, left, right));
                importances[candidate.feature] += candidate.gain;
                next_frontier.extend([left, right]);
            }

            for (row, assignment) in node_of.iter_mut().enumerate() {
                let Some(node) = *assignment else { continue };
                if let Some((feature, threshold, left, right)) = nodes[node].split {
                    *assignment = Some(if self.columns[feature][row] <= threshold {
                        left
                    } else {
                        right
                    });
                }
            }

            self.accumulate_stats(&mut nodes, &node_of);
            frontier = next_frontier;
        }

        (self.finish(&nodes), importances)
    }

    fn accumulate_stats(&self, nodes: &mut [BuildNode], node_of: &[Option<usize>]) {
        for node in nodes.iter_mut().filter(|node| node.split.is_none()) {
            node.stats = NodeStats::default();
        }
        for (row, assignment) in node_of.iter().enumerate() {
            let Some(node) = *assignment else { continue };
            let stats = &mut nodes[node].stats;
            stats.sum += self.residuals[row];
            stats.hessian += self.hessians[row];
            stats.count += 1;
        }
    }

    fn best_splits(
        &self,
        nodes: &[BuildNode],
        node_of: &[Option<usize>],
        frontier: &[usize],
    ) -> Vec<Option<SplitCandidate>> {
        let mut slot_of = vec![None; nodes.len()];
        for (slot, &node) in frontier.iter().enumerate() {
            if nodes[node].stats.count >= 2 * self.min_samples_leaf.max(1) {
                slot_of[node] = Some(slot);
            }
        }

        let mut best: Vec<Option<SplitCandidate>> = vec![None; frontier.len()];
        for (feature, order) in self.sorted.iter().enumerate() {
            let column = &self.columns[feature];
            let mut scans = vec![ScanState::default(); frontier.len()];

            for &row in order {
                let Some(node) = node_of[row] else { continue };
                let Some(slot) = slot_of[node] else { continue };
                let value = column[row];
                let total = nodes[node].stats;
                let scan = &mut scans[slot];

                if let Some(previous) = scan.last_value {
                    let right_count = total.count - scan.left_count;
                    if value > previous
                        && scan.left_count >= self.min_samples_leaf
                        && right_count >= self.min_samples_leaf
                    {
                        let gain = friedman_improvement(
                            scan.left_sum,
                            scan.left_count,
                            total.sum - scan.left_sum,
                            right_count,
                        );
                        let improves = match &best[slot] {
                            Some(current) => gain > current.gain,
                            None => gain > MIN_GAIN,
                        };
                        if improves {
                            best[slot] = Some(SplitCandidate {
                                gain,
                                feature,
                                threshold: midpoint(previous, value),
                            });
                        }
                    }
                }

                scan.left_sum += self.residuals[row];
                scan.left_count += 1;
                scan.last_value = Some(value);
            }
        }

        best
    }

    fn finish(&self, nodes: &[BuildNode]) -> RegressionTree {
        let nodes = nodes
            .iter()
            .map(|node| {
                let cover = node.stats.count as f64;
                match node.split {
                    Some((feature, threshold, left, right)) => TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                        cover,
                    },
                    None => TreeNode::Leaf {
                        value: self.learning_rate * newton_step(node.stats),
                        cover,
                    },
                }
            })
            .collect();
        RegressionTree { nodes }
    }
}

/// Squared-error reduction of a split: `nL*nR/(nL+nR) * (meanL - meanR)^2`.
fn friedman_improvement(left_sum: f64, left_count: usize, right_sum: f64, right_count: usize) -> f64 {
    let left_n = left_count as f64;
    let right_n = right_count as f64;
    let diff = left_sum / left_n - right_sum / right_n;
    left_n * right_n / (left_n + right_n) * diff * diff
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high {
        low
    } else {
        mid
    }
}

/// Log-loss leaf value: sum of residuals over sum of `p(1-p)`.
fn newton_step(stats: NodeStats) -> f64 {
    if stats.hessian.abs() < 1e-150 {
        0.0
    } else {
        stats.sum / stats.hessian
    }
}
