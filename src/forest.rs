//! Random forest classifier loaded from a JSON tree-ensemble artifact.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "model_type": "random_forest",
//!   "model_name": "forest_fire",
//!   "feature_names": ["temperature", "wind_speed", ...],
//!   "n_features": 11,
//!   "n_classes": 2,
//!   "classes": [0, 1],
//!   "n_estimators": 100,
//!   "feature_importances": [0.12, ...],
//!   "trees": [
//!     { "n_nodes": 3, "nodes": [
//!       { "feature": 5, "threshold": 80.5, "left": 1, "right": 2, "value": null },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.9, 0.1] },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.2, 0.8] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Traversal starts at node 0 and goes left when `x <= threshold`. Leaves
//! carry class probabilities; the forest averages the fire-class column.
//! Split nodes may carry their own class distribution as well; when they do
//! not, it is taken as the mean of their children.

use crate::classifier::{
    check_input, check_probability, named_importances, FeatureImportance, FireClassifier,
    ModelInfo, ModelKind,
};
use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MODEL_TYPE: &str = "random_forest";
const LEAF: i32 = -1;
const FIRE_CLASS: usize = 1;

/// A single node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on, `-1` for leaves.
    pub feature: i32,
    pub threshold: f64,
    pub left: i32,
    pub right: i32,
    /// Class probabilities, present on leaves only.
    pub value: Option<Vec<f64>>,
}

impl TreeNode {
    pub fn leaf(probabilities: Vec<f64>) -> Self {
        Self {
            feature: LEAF,
            threshold: 0.0,
            left: LEAF,
            right: LEAF,
            value: Some(probabilities),
        }
    }

    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self {
            feature: feature as i32,
            threshold,
            left: left as i32,
            right: right as i32,
            value: None,
        }
    }

    /// Attach the class distribution seen at a split node.
    pub fn with_value(mut self, probabilities: Vec<f64>) -> Self {
        self.value = Some(probabilities);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.feature == LEAF
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub n_nodes: usize,
    pub nodes: Vec<TreeNode>,
}

/// On-disk representation of a trained forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub model_type: String,
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub n_features: usize,
    pub n_classes: usize,
    pub classes: Vec<i32>,
    pub n_estimators: usize,
    pub feature_importances: Vec<f64>,
    pub trees: Vec<TreeArtifact>,
}

impl ForestArtifact {
    pub fn write_to(&self, path: &Path) -> FireRiskResult<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| FireRiskError::serialization("forest artifact", e))?;
        std::fs::write(path, json)
            .map_err(|e| FireRiskError::io(format!("writing {}", path.display()), e))
    }
}

/// Change in fire probability attributed to one feature for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub name: String,
    pub contribution: f64,
}

/// Decision-path attribution of a single prediction.
///
/// `bias` is the forest's mean root probability; `bias` plus the sum of the
/// contributions equals the predicted probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionBreakdown {
    pub probability: f64,
    pub bias: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl PredictionBreakdown {
    /// Contributions ordered by magnitude, largest first.
    pub fn ranked(&self) -> Vec<&FeatureContribution> {
        let mut ranked: Vec<&FeatureContribution> = self.contributions.iter().collect();
        ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        ranked
    }
}

/// Random forest binary classifier.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    name: String,
    importances: Vec<f64>,
    trees: Vec<Vec<TreeNode>>,
    /// Fire-class probability at every node, aligned with `trees`.
    node_probabilities: Vec<Vec<f64>>,
}

impl RandomForestClassifier {
    /// Load a forest from a JSON artifact on disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> FireRiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FireRiskError::model_load(path.display().to_string(), e.to_string()))?;
        Self::from_json_str(&content)
            .map_err(|e| FireRiskError::model_load(path.display().to_string(), e.to_string()))
    }

    pub fn from_json_str(json: &str) -> FireRiskResult<Self> {
        let artifact: ForestArtifact = serde_json::from_str(json)
            .map_err(|e| FireRiskError::model_load("<inline>", format!("JSON parse error: {e}")))?;
        Self::from_artifact(artifact)
    }

    /// Validate an artifact and take ownership of its trees.
    pub fn from_artifact(artifact: ForestArtifact) -> FireRiskResult<Self> {
        let fail = |msg: String| FireRiskError::model_load(artifact.model_name.clone(), msg);

        if artifact.model_type != MODEL_TYPE {
            return Err(fail(format!(
                "expected model_type '{MODEL_TYPE}', got '{}'",
                artifact.model_type
            )));
        }
        if artifact.n_features != FEATURE_COUNT {
            return Err(fail(format!(
                "expected {FEATURE_COUNT} features, got {}",
                artifact.n_features
            )));
        }
        if artifact.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(fail(format!(
                "feature order {:?} does not match {:?}",
                artifact.feature_names, FEATURE_NAMES
            )));
        }
        if artifact.n_classes != 2 || artifact.classes != [0, 1] {
            return Err(fail(format!(
                "expected binary classes [0, 1], got {:?}",
                artifact.classes
            )));
        }
        if artifact.feature_importances.len() != FEATURE_COUNT {
            return Err(fail(format!(
                "expected {FEATURE_COUNT} feature importances, got {}",
                artifact.feature_importances.len()
            )));
        }
        if artifact.trees.is_empty() {
            return Err(fail("random forest has no trees".to_string()));
        }
        if artifact.trees.len() != artifact.n_estimators {
            return Err(fail(format!(
                "n_estimators ({}) doesn't match trees count ({})",
                artifact.n_estimators,
                artifact.trees.len()
            )));
        }

        for (t, tree) in artifact.trees.iter().enumerate() {
            validate_tree(&tree.nodes, artifact.n_classes)
                .map_err(|msg| fail(format!("tree {t}: {msg}")))?;
        }

        let trees: Vec<Vec<TreeNode>> = artifact.trees.into_iter().map(|t| t.nodes).collect();
        let node_probs = trees.iter().map(|nodes| node_probabilities(nodes)).collect();

        Ok(Self {
            name: artifact.model_name,
            importances: artifact.feature_importances,
            trees,
            node_probabilities: node_probs,
        })
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Attribute one prediction to features along each tree's decision path.
    ///
    /// Every split passed on the way to a leaf credits its feature with the
    /// change in fire probability from the node to the child taken. Credits
    /// are averaged over the trees.
    pub fn explain(&self, features: &[f64]) -> FireRiskResult<PredictionBreakdown> {
        check_input(features, FEATURE_COUNT)?;
        let n_trees = self.trees.len() as f64;
        let mut contributions = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;
        let mut probability = 0.0;

        for (nodes, probs) in self.trees.iter().zip(&self.node_probabilities) {
            let mut idx = 0usize;
            bias += probs[0];
            while !nodes[idx].is_leaf() {
                let node = &nodes[idx];
                let feature = node.feature as usize;
                let next = if features[feature] <= node.threshold {
                    node.left as usize
                } else {
                    node.right as usize
                };
                contributions[feature] += probs[next] - probs[idx];
                idx = next;
            }
            probability += probs[idx];
        }

        Ok(PredictionBreakdown {
            probability: check_probability(probability / n_trees)?,
            bias: bias / n_trees,
            contributions: FEATURE_NAMES
                .iter()
                .zip(contributions)
                .map(|(name, c)| FeatureContribution {
                    name: name.to_string(),
                    contribution: c / n_trees,
                })
                .collect(),
        })
    }

    /// Walk one tree to its leaf. Links were checked at load time to point
    /// strictly forward, so the walk always terminates.
    fn leaf_probability(nodes: &[TreeNode], features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &nodes[idx];
            if node.is_leaf() {
                return node
                    .value
                    .as_ref()
                    .and_then(|v| v.get(FIRE_CLASS))
                    .copied()
                    .unwrap_or(0.0);
            }
            let x = features[node.feature as usize];
            idx = if x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Fire-class probability per node. Children sit at higher indices than
/// their parent, so a reverse sweep sees both children before the parent.
fn node_probabilities(nodes: &[TreeNode]) -> Vec<f64> {
    let mut probs = vec![0.0; nodes.len()];
    for (i, node) in nodes.iter().enumerate().rev() {
        probs[i] = match node.value.as_ref().and_then(|v| v.get(FIRE_CLASS)) {
            Some(p) => *p,
            None if node.is_leaf() => 0.0,
            None => (probs[node.left as usize] + probs[node.right as usize]) / 2.0,
        };
    }
    probs
}

fn validate_tree(nodes: &[TreeNode], n_classes: usize) -> Result<(), String> {
    if nodes.is_empty() {
        return Err("tree has no nodes".to_string());
    }
    let n = nodes.len() as i32;
    for (i, node) in nodes.iter().enumerate() {
        let i = i as i32;
        if node.is_leaf() {
            match &node.value {
                Some(v) if v.len() == n_classes => {}
                _ => return Err(format!("leaf {i} must carry {n_classes} class probabilities")),
            }
            continue;
        }
        if node.feature < 0 || node.feature as usize >= FEATURE_COUNT {
            return Err(format!("node {i} splits on unknown feature {}", node.feature));
        }
        for child in [node.left, node.right] {
            if child <= i || child >= n {
                return Err(format!("node {i} has invalid child link {child}"));
            }
        }
        if node.value.as_ref().is_some_and(|v| v.len() != n_classes) {
            return Err(format!("split {i} carries a malformed class distribution"));
        }
    }
    Ok(())
}

impl FireClassifier for RandomForestClassifier {
    fn predict_probability(&self, features: &[f64]) -> FireRiskResult<f64> {
        check_input(features, FEATURE_COUNT)?;
        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| Self::leaf_probability(tree, features))
            .sum();
        check_probability(sum / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Vec<FeatureImportance> {
        named_importances(&self.importances)
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            kind: ModelKind::RandomForest,
            n_features: FEATURE_COUNT,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
