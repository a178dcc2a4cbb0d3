//! Regression tree used as the boosting base learner
//!
//! Splits minimise squared error. The caller chooses which rows and which
//! feature columns a tree may see, so row/column subsampling stays in the
//! boosting loop.

use serde::{Deserialize, Serialize};

/// Smallest squared-error reduction accepted for a split
const MIN_GAIN: f64 = 1e-12;

/// Tree growth limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (a single leaf has depth 0)
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child of a split
    pub min_samples_leaf: usize,
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Largest feature index used by any split below this node
    pub fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split {
                feature_idx,
                left,
                right,
                ..
            } => [Some(*feature_idx), left.max_feature_idx(), right.max_feature_idx()]
                .into_iter()
                .flatten()
                .max(),
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    /// Fit a tree on `rows` of `features`, considering only `columns`.
    ///
    /// Split gains are added to `importances`, indexed by feature.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        columns: &[usize],
        params: &TreeParams,
        importances: &mut [f64],
    ) -> Self {
        let builder = Builder {
            features,
            targets,
            columns,
            params,
        };
        let root = builder.build(rows, 0, importances);
        Self { root }
    }

    /// Predict for a single sample
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature_idx] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    pub fn max_feature_idx(&self) -> Option<usize> {
        self.root.max_feature_idx()
    }
}

struct Builder<'a> {
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    columns: &'a [usize],
    params: &'a TreeParams,
}

impl Builder<'_> {
    fn leaf(&self, rows: &[usize]) -> TreeNode {
        let sum: f64 = rows.iter().map(|&i| self.targets[i]).sum();
        let value = if rows.is_empty() { 0.0 } else { sum / rows.len() as f64 };
        TreeNode::Leaf {
            value,
            n_samples: rows.len(),
        }
    }

    fn build(&self, rows: &[usize], depth: usize, importances: &mut [f64]) -> TreeNode {
        if depth >= self.params.max_depth || rows.len() < self.params.min_samples_split {
            return self.leaf(rows);
        }

        let Some(split) = self.find_best_split(rows) else {
            return self.leaf(rows);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

        if left_rows.is_empty() || right_rows.is_empty() {
            return self.leaf(rows);
        }

        importances[split.feature_idx] += split.gain;

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: Box::new(self.build(&left_rows, depth + 1, importances)),
            right: Box::new(self.build(&right_rows, depth + 1, importances)),
        }
    }

    /// Exhaustive search over sorted feature values using running sums
    fn find_best_split(&self, rows: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        if n < 2 {
            return None;
        }
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total: f64 = rows.iter().map(|&i| self.targets[i]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature_idx in self.columns {
            sorted.clear();
            sorted.extend(rows.iter().map(|&i| (self.features[i][feature_idx], self.targets[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += sorted[i].1;

                // No threshold separates equal values
                if sorted[i].0 == sorted[i + 1].0 {
                    continue;
                }

                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent_score;

                let best_gain = best.as_ref().map_or(MIN_GAIN, |b| b.gain);
                if gain > best_gain {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: (sorted[i].0 + sorted[i + 1].0) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
