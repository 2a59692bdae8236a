//! Random forest regression
//!
//! Bootstrap-sampled regression trees split on squared-error reduction and
//! averaged at prediction time. Every tree draws from its own RNG seeded with
//! `seed + tree_index`, so a fixed seed reproduces the same forest.

use crate::error::{ForecastError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use crate::models::{check_training_data, FittedRegressor, Regressor};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Strategy for the number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    name: String,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: MaxFeatures,
    bootstrap: bool,
    seed: u64,
}

/// Fitted random forest
#[derive(Debug, Clone)]
pub struct FittedRandomForest {
    name: String,
    schema: FeatureSchema,
    trees: Vec<TreeNode>,
    importances: Vec<f64>,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Reduction in sum of squared errors
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn sum_squared_error(indices: &[usize], target: &[f64]) -> f64 {
    let n = indices.len() as f64;
    let sum: f64 = indices.iter().map(|&i| target[i]).sum();
    let sum_sq: f64 = indices.iter().map(|&i| target[i] * target[i]).sum();
    (sum_sq - sum * sum / n).max(0.0)
}

fn leaf_value(indices: &[usize], target: &[f64]) -> f64 {
    indices.iter().map(|&i| target[i]).sum::<f64>() / indices.len() as f64
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    target: &'a [f64],
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    n_split_features: usize,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> TreeNode {
        let value = leaf_value(&indices, self.target);
        let at_depth_limit = self.max_depth.map_or(false, |d| depth >= d);
        if at_depth_limit
            || indices.len() < self.min_samples_split
            || indices.len() < 2 * self.min_samples_leaf
        {
            return TreeNode::Leaf { value };
        }

        let parent_sse = sum_squared_error(&indices, self.target);
        if parent_sse <= f64::EPSILON {
            return TreeNode::Leaf { value };
        }

        match self.best_split(&indices, parent_sse, rng) {
            Some(split) => {
                self.importances[split.feature] += split.gain;
                let left = self.build(split.left, depth + 1, rng);
                let right = self.build(split.right, depth + 1, rng);
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => TreeNode::Leaf { value },
        }
    }

    fn best_split(
        &self,
        indices: &[usize],
        parent_sse: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let candidates = sample(rng, n_features, self.n_split_features);
        let n = indices.len();
        let mut best: Option<(usize, f64, f64, Vec<usize>, usize)> = None;

        for feature in candidates.iter() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let total_sum: f64 = sorted.iter().map(|&i| self.target[i]).sum();
            let total_sq: f64 = sorted.iter().map(|&i| self.target[i].powi(2)).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 0..n - 1 {
                let y = self.target[sorted[pos]];
                left_sum += y;
                left_sq += y * y;

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let here = self.x[[sorted[pos], feature]];
                let next = self.x[[sorted[pos + 1], feature]];
                if here == next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = (left_sq - left_sum * left_sum / left_n as f64).max(0.0);
                let right_sse = (right_sq - right_sum * right_sum / right_n as f64).max(0.0);
                let gain = parent_sse - left_sse - right_sse;

                if gain > best.as_ref().map_or(f64::EPSILON, |b| b.2) {
                    best = Some((feature, (here + next) / 2.0, gain, sorted.clone(), left_n));
                }
            }
        }

        best.map(|(feature, threshold, gain, mut sorted, left_n)| {
            let right = sorted.split_off(left_n);
            SplitCandidate {
                feature,
                threshold,
                gain,
                left: sorted,
                right,
            }
        })
    }
}

impl RandomForestRegressor {
    /// Create a new random forest with `n_estimators` trees
    pub fn new(n_estimators: usize) -> Result<Self> {
        if n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "Random forest needs at least one tree".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Random Forest (trees={})", n_estimators),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            seed: 42,
        })
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the base random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Regressor for RandomForestRegressor {
    type Fitted = FittedRandomForest;

    fn fit(&self, features: &FeatureMatrix, target: &[f64]) -> Result<Self::Fitted> {
        check_training_data(features, target)?;
        let n_features = features.schema().len();
        if n_features == 0 {
            return Err(ForecastError::ModelError(
                "Random forest needs at least one feature".to_string(),
            ));
        }

        let x = features.values();
        let n_samples = x.nrows();
        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut importances = vec![0.0; n_features];

        for tree_idx in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));
            let sample_indices: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let mut builder = TreeBuilder {
                x,
                target,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                n_split_features: self.max_features.resolve(n_features),
                importances: vec![0.0; n_features],
            };
            trees.push(builder.build(sample_indices, 0, &mut rng));

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, imp) in importances.iter_mut().zip(&builder.importances) {
                    *acc += imp / tree_total;
                }
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(FittedRandomForest {
            name: self.name.clone(),
            schema: features.schema().clone(),
            trees,
            importances,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegressor for FittedRandomForest {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.schema.ensure_matches(features.schema())?;
        let n_trees = self.trees.len() as f64;
        Ok(features
            .values()
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        Some(
            self.schema
                .names()
                .iter()
                .cloned()
                .zip(self.importances.iter().copied())
                .collect(),
        )
    }
}
