//! Bagged CART forest trained in-process and exported as a [`ForestArtifact`].
//!
//! Trees split on Gini impurity over a random subset of features at each
//! node, with thresholds at the midpoint between neighbouring distinct
//! values. Importances are mean decrease in impurity, normalized per tree
//! and averaged over the forest.

use crate::dataset::{Dataset, FeatureRow};
use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::forest::{ForestArtifact, TreeArtifact, TreeNode, MODEL_TYPE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` means `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().round() as usize)
            .clamp(1, FEATURE_COUNT)
    }
}

fn gini(counts: [usize; 2]) -> f64 {
    let n = (counts[0] + counts[1]) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / n;
    let p1 = counts[1] as f64 / n;
    1.0 - p0 * p0 - p1 * p1
}

fn class_counts(labels: &[u8], samples: &[usize]) -> [usize; 2] {
    let mut counts = [0usize; 2];
    for &s in samples {
        counts[usize::from(labels[s] == 1)] += 1;
    }
    counts
}

struct Split {
    feature: usize,
    threshold: f64,
    /// Weighted impurity decrease, in sample units.
    gain: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [FeatureRow],
    labels: &'a [u8],
    params: &'a ForestParams,
    rng: StdRng,
    nodes: Vec<TreeNode>,
    importances: [f64; FEATURE_COUNT],
}

impl<'a> TreeBuilder<'a> {
    /// Grow a subtree in pre-order and return the index of its root.
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let counts = class_counts(self.labels, samples);
        let n = samples.len();
        let at_depth_limit = self.params.max_depth.is_some_and(|d| depth >= d);
        let pure = counts[0] == 0 || counts[1] == 0;

        let split = if pure || at_depth_limit || n < self.params.min_samples_split {
            None
        } else {
            self.best_split(samples, counts)
        };

        let distribution = vec![counts[0] as f64 / n as f64, counts[1] as f64 / n as f64];
        let Some(split) = split else {
            let idx = self.nodes.len();
            self.nodes.push(TreeNode::leaf(distribution));
            return idx;
        };

        self.importances[split.feature] += split.gain;

        let idx = self.nodes.len();
        // Placeholder until the children's positions are known.
        self.nodes.push(TreeNode::split(split.feature, split.threshold, 0, 0));

        let rows = self.rows;
        let mid = partition(samples, |s| rows[s][split.feature] <= split.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);
        self.nodes[idx] =
            TreeNode::split(split.feature, split.threshold, left, right).with_value(distribution);
        idx
    }

    fn best_split(&mut self, samples: &[usize], counts: [usize; 2]) -> Option<Split> {
        let n = samples.len();
        let parent = gini(counts) * n as f64;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let candidates =
            rand::seq::index::sample(&mut self.rng, FEATURE_COUNT, self.params.features_per_split());

        let mut best: Option<Split> = None;
        let mut order: Vec<usize> = samples.to_vec();
        for feature in candidates.iter() {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left = [0usize; 2];
            for i in 0..n - 1 {
                left[usize::from(self.labels[order[i]] == 1)] += 1;
                let here = self.rows[order[i]][feature];
                let next = self.rows[order[i + 1]][feature];
                let n_left = i + 1;
                let n_right = n - n_left;
                if here == next || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right = [counts[0] - left[0], counts[1] - left[1]];
                let child = gini(left) * n_left as f64 + gini(right) * n_right as f64;
                let gain = parent - child;
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Guard against the midpoint rounding up onto `next`.
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Split { feature, threshold, gain });
                }
            }
        }
        best
    }
}

/// Stable-enough in-place partition; returns the count of items matching `pred`.
fn partition(items: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(boundary, i);
            boundary += 1;
        }
    }
    boundary
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

/// Train a forest on `data` and package it for serving.
pub fn train_forest(data: &Dataset, params: &ForestParams, model_name: &str) -> FireRiskResult<ForestArtifact> {
    if data.is_empty() {
        return Err(FireRiskError::dataset("cannot train on an empty dataset"));
    }
    if params.n_estimators == 0 {
        return Err(FireRiskError::config("n_estimators must be at least 1"));
    }

    let n = data.len();
    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut importances = [0.0; FEATURE_COUNT];

    for t in 0..params.n_estimators {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
        let mut samples: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

        let mut builder = TreeBuilder {
            rows: &data.rows,
            labels: &data.labels,
            params,
            rng,
            nodes: Vec::new(),
            importances: [0.0; FEATURE_COUNT],
        };
        builder.grow(&mut samples, 0);

        let mut tree_importances = builder.importances;
        normalize(&mut tree_importances);
        for (acc, v) in importances.iter_mut().zip(tree_importances) {
            *acc += v;
        }

        debug!("tree {t}: {} nodes", builder.nodes.len());
        trees.push(TreeArtifact {
            n_nodes: builder.nodes.len(),
            nodes: builder.nodes,
        });
    }

    normalize(&mut importances);

    Ok(ForestArtifact {
        model_type: MODEL_TYPE.to_string(),
        model_name: model_name.to_string(),
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        n_features: FEATURE_COUNT,
        n_classes: 2,
        classes: vec![0, 1],
        n_estimators: params.n_estimators,
        feature_importances: importances.to_vec(),
        trees,
    })
}
