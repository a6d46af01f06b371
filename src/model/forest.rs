use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ProbabilisticClassifier, Trainable, CLASS_COUNT};
use crate::error::ModelError;
use crate::features::FEATURE_COUNT;

/// Splits must lower weighted impurity by more than this.
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features considered per split; `None` means `floor(sqrt(d))`.
    pub max_features: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            max_features: None,
        }
    }
}

impl ForestParams {
    fn features_per_split(&self) -> usize {
        self.max_features
            .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt() as usize)
            .clamp(1, FEATURE_COUNT)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidParameters("n_trees must be >= 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidParameters("max_depth must be >= 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidParameters(
                "min_samples_split must be >= 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Nodes are stored in pre-order; children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        proba: [f64; CLASS_COUNT],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn leaf(counts: &[usize; CLASS_COUNT]) -> Self {
        let total: usize = counts.iter().sum();
        let proba = if total == 0 {
            [1.0 / CLASS_COUNT as f64; CLASS_COUNT]
        } else {
            counts.map(|count| count as f64 / total as f64)
        };
        Node::Leaf { proba }
    }
}

impl DecisionTree {
    fn predict(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidParameters("tree has no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { proba } => {
                    if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(ModelError::InvalidParameters(format!(
                            "leaf {idx} has invalid probabilities"
                        )));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let child_ok = |child: usize| child > idx && child < self.nodes.len();
                    if *feature >= FEATURE_COUNT
                        || !threshold.is_finite()
                        || !child_ok(*left)
                        || !child_ok(*right)
                    {
                        return Err(ModelError::InvalidParameters(format!(
                            "split {idx} is malformed"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

struct Split {
    feature: usize,
    threshold: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [[f64; FEATURE_COUNT]],
    labels: &'a [usize],
    params: &'a ForestParams,
    features_per_split: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&indices);
        let node_id = self.nodes.len();
        self.nodes.push(Node::leaf(&counts));

        let pure = counts.iter().filter(|count| **count > 0).count() <= 1;
        if pure || depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return node_id;
        }

        let Some(split) = self.best_split(&indices, &counts, rng) else {
            return node_id;
        };

        let samples = self.samples;
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| samples[i][split.feature] <= split.threshold);

        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn class_counts(&self, indices: &[usize]) -> [usize; CLASS_COUNT] {
        let mut counts = [0; CLASS_COUNT];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    fn best_split(
        &self,
        indices: &[usize],
        parent_counts: &[usize; CLASS_COUNT],
        rng: &mut StdRng,
    ) -> Option<Split> {
        let n = indices.len();
        let mut best = None;
        let mut best_impurity = gini(parent_counts, n) - MIN_IMPURITY_DECREASE;

        let candidates = rand::seq::index::sample(rng, FEATURE_COUNT, self.features_per_split);
        for feature in candidates.iter() {
            let mut column: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.samples[i][feature], self.labels[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = [0; CLASS_COUNT];
            let mut right = *parent_counts;
            for pos in 0..n - 1 {
                let (value, label) = column[pos];
                left[label] += 1;
                right[label] -= 1;

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                if impurity < best_impurity {
                    best_impurity = impurity;
                    best = Some(Split {
                        feature,
                        threshold: value + (next - value) / 2.0,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize; CLASS_COUNT], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|count| {
            let p = *count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

impl Trainable for RandomForest {
    type Params = ForestParams;

    fn fit(
        samples: &[[f64; FEATURE_COUNT]],
        labels: &[usize],
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> Result<Self, ModelError> {
        params.validate()?;
        super::check_training_input(samples, labels)?;

        let n = samples.len();
        let mut trees = Vec::with_capacity(params.n_trees);
        for _ in 0..params.n_trees {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                samples,
                labels,
                params,
                features_per_split: params.features_per_split(),
                nodes: Vec::new(),
            };
            builder.grow(bootstrap, 0, rng);
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        Ok(Self { trees })
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn predict_proba(&self, sample: &[f64; FEATURE_COUNT]) -> [f64; CLASS_COUNT] {
        let mut proba = [0.0; CLASS_COUNT];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict(sample)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.map(|p| p / n)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotTrained);
        }
        self.trees.iter().try_for_each(DecisionTree::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn separable() -> (Vec<[f64; FEATURE_COUNT]>, Vec<usize>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let mut row = [0.0; FEATURE_COUNT];
            let class = i % 3;
            for value in row.iter_mut() {
                *value = class as f64 * 10.0 + (i as f64) * 0.01;
            }
            samples.push(row);
            labels.push(class);
        }
        (samples, labels)
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(gini(&[4, 0, 0], 4), 0.0);
        assert!((gini(&[1, 1, 0], 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn learns_separable_classes() {
        let (samples, labels) = separable();
        let mut rng = StdRng::seed_from_u64(1);
        let forest = RandomForest::fit(&samples, &labels, &ForestParams::default(), &mut rng).unwrap();
        forest.validate().unwrap();
        assert_eq!(forest.n_trees(), 100);

        for (row, label) in samples.iter().zip(&labels) {
            let proba = forest.predict_proba(row);
            let best = (0..CLASS_COUNT)
                .max_by(|a, b| proba[*a].total_cmp(&proba[*b]))
                .unwrap();
            assert_eq!(best, *label);
            assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn depth_limit_of_one_gives_stumps() {
        let (samples, labels) = separable();
        let params = ForestParams {
            n_trees: 3,
            max_depth: 1,
            ..ForestParams::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let forest = RandomForest::fit(&samples, &labels, &params, &mut rng).unwrap();
        assert!(forest.trees.iter().all(|tree| tree.nodes.len() <= 3));
    }

    #[test]
    fn rejects_zero_trees() {
        let (samples, labels) = separable();
        let params = ForestParams {
            n_trees: 0,
            ..ForestParams::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            RandomForest::fit(&samples, &labels, &params, &mut rng),
            Err(ModelError::InvalidParameters(_))
        ));
    }

    #[test]
    fn empty_forest_is_untrained() {
        let forest = RandomForest { trees: Vec::new() };
        assert!(matches!(forest.validate(), Err(ModelError::NotTrained)));
    }

    #[test]
    fn malformed_tree_is_rejected() {
        let forest = RandomForest {
            trees: vec![DecisionTree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 0,
                    right: 7,
                }],
            }],
        };
        assert!(matches!(forest.validate(), Err(ModelError::InvalidParameters(_))));
    }
}
