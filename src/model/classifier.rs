use serde::{Deserialize, Serialize};

use crate::error::{GenreError, Result};

/// Anything that maps a normalized feature vector to a class index.
pub trait GenreModel {
    /// Length of the vectors the model was trained on.
    fn input_dim(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// One score per class; the predicted class is the highest one.
    fn decision_scores(&self, x: &[f64]) -> Result<Vec<f64>>;

    fn predict(&self, x: &[f64]) -> Result<usize> {
        let scores = self.decision_scores(x)?;
        Ok(argmax(&scores))
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn check_dim(expected: usize, x: &[f64]) -> Result<()> {
    if x.len() != expected {
        return Err(GenreError::DimensionMismatch {
            stage: "classifier",
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}

fn dot(w: &[f64], x: &[f64]) -> f64 {
    w.iter().zip(x).map(|(a, b)| a * b).sum()
}

/// Decision model chosen by the `kind` field of the persisted artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    Linear(LinearModel),
    Forest(ForestModel),
}

impl ClassifierModel {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierModel::Linear(_) => "linear",
            ClassifierModel::Forest(_) => "forest",
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            ClassifierModel::Linear(m) => m.validate(),
            ClassifierModel::Forest(m) => m.validate(),
        }
    }
}

impl GenreModel for ClassifierModel {
    fn input_dim(&self) -> usize {
        match self {
            ClassifierModel::Linear(m) => m.input_dim(),
            ClassifierModel::Forest(m) => m.input_dim(),
        }
    }

    fn n_classes(&self) -> usize {
        match self {
            ClassifierModel::Linear(m) => m.n_classes(),
            ClassifierModel::Forest(m) => m.n_classes(),
        }
    }

    fn decision_scores(&self, x: &[f64]) -> Result<Vec<f64>> {
        match self {
            ClassifierModel::Linear(m) => m.decision_scores(x),
            ClassifierModel::Forest(m) => m.decision_scores(x),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MulticlassStrategy {
    /// One hyperplane per class; score is the margin.
    OneVsRest,
    /// One hyperplane per class pair `(i, j)`, `i < j`, in order
    /// `(0,1), (0,2) .. (k-2,k-1)`. A positive margin votes for `i`.
    OneVsOne,
}

/// Linear-margin classifier (linear SVM, logistic regression, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub strategy: MulticlassStrategy,
    pub n_classes: usize,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearModel {
    fn expected_rows(&self) -> usize {
        match self.strategy {
            MulticlassStrategy::OneVsRest => self.n_classes,
            MulticlassStrategy::OneVsOne => self.n_classes * self.n_classes.saturating_sub(1) / 2,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.n_classes < 2 {
            anyhow::bail!("linear model needs at least 2 classes, got {}", self.n_classes);
        }
        let rows = self.expected_rows();
        if self.coef.len() != rows {
            anyhow::bail!(
                "linear model ({:?}) needs {rows} coefficient rows, got {}",
                self.strategy,
                self.coef.len()
            );
        }
        if self.intercept.len() != rows {
            anyhow::bail!(
                "linear model needs {rows} intercepts, got {}",
                self.intercept.len()
            );
        }
        let dim = self.input_dim();
        if dim == 0 {
            anyhow::bail!("linear model has zero-length coefficient rows");
        }
        if let Some(r) = self.coef.iter().position(|row| row.len() != dim) {
            anyhow::bail!("coefficient row {r} has length {}, expected {dim}", self.coef[r].len());
        }
        let all_finite = self
            .coef
            .iter()
            .flatten()
            .chain(&self.intercept)
            .all(|v| v.is_finite());
        if !all_finite {
            anyhow::bail!("linear model contains non-finite weights");
        }
        Ok(())
    }

    fn margins<'a>(&'a self, x: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(move |(w, b)| dot(w, x) + b)
    }
}

impl GenreModel for LinearModel {
    fn input_dim(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn decision_scores(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_dim(self.input_dim(), x)?;

        match self.strategy {
            MulticlassStrategy::OneVsRest => Ok(self.margins(x).collect()),
            MulticlassStrategy::OneVsOne => {
                let k = self.n_classes;
                let mut votes = vec![0.0; k];
                let mut margins = self.margins(x);
                for i in 0..k {
                    for j in (i + 1)..k {
                        let m = margins.next().unwrap_or(0.0);
                        if m > 0.0 {
                            votes[i] += 1.0;
                        } else {
                            votes[j] += 1.0;
                        }
                    }
                }
                Ok(votes)
            }
        }
    }
}

/// One decision tree as flat node arrays; `-1` children mark a leaf.
/// Samples with `x[feature] <= threshold` go left.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts (or weights); only leaves are read.
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> anyhow::Result<()> {
        let n = self.node_count();
        if n == 0 {
            anyhow::bail!("tree has no nodes");
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            anyhow::bail!("tree node arrays have different lengths");
        }

        for node in 0..n {
            let (l, r) = (self.children_left[node], self.children_right[node]);
            if l < 0 || r < 0 {
                if l >= 0 || r >= 0 {
                    anyhow::bail!("node {node} has exactly one child");
                }
                let v = &self.value[node];
                if v.len() != n_classes {
                    anyhow::bail!("leaf {node} has {} class values, expected {n_classes}", v.len());
                }
                if v.iter().any(|c| !c.is_finite() || *c < 0.0) {
                    anyhow::bail!("leaf {node} has invalid class values");
                }
                continue;
            }
            // children always come after their parent, so traversal terminates
            for child in [l, r] {
                if child as usize <= node || child as usize >= n {
                    anyhow::bail!("node {node} points to invalid child {child}");
                }
            }
            let f = self.feature[node];
            if f < 0 || f as usize >= n_features {
                anyhow::bail!("node {node} splits on feature {f}, model has {n_features}");
            }
            if self.threshold[node].is_nan() {
                anyhow::bail!("node {node} has a NaN threshold");
            }
        }
        Ok(())
    }

    /// Walks from the root to the leaf `x` lands in. Trees built in code may
    /// never have been through [`ForestModel::validate`]; the walk is range
    /// checked and gives up after `node_count` steps.
    fn leaf_for(&self, x: &[f64]) -> anyhow::Result<usize> {
        let n = self.node_count();
        let mut node = 0;
        for _ in 0..n {
            let (Some(&l), Some(&r)) = (self.children_left.get(node), self.children_right.get(node))
            else {
                anyhow::bail!("node {node} is out of range for a tree of {n} nodes");
            };
            if l < 0 {
                return Ok(node);
            }

            let value = self
                .feature
                .get(node)
                .and_then(|&f| usize::try_from(f).ok())
                .and_then(|f| x.get(f))
                .ok_or_else(|| anyhow::anyhow!("node {node} splits on a missing feature"))?;
            let threshold = self
                .threshold
                .get(node)
                .ok_or_else(|| anyhow::anyhow!("node {node} has no threshold"))?;

            let child = if value <= threshold { l } else { r };
            if child <= node as i64 || child as usize >= n {
                anyhow::bail!("node {node} points to invalid child {child}");
            }
            node = child as usize;
        }
        anyhow::bail!("tree walk did not reach a leaf in {n} steps")
    }

    /// Class distribution of the leaf `x` lands in, normalised to sum 1.
    fn proba(&self, x: &[f64]) -> anyhow::Result<Vec<f64>> {
        let leaf = self.leaf_for(x)?;
        let v = self
            .value
            .get(leaf)
            .ok_or_else(|| anyhow::anyhow!("leaf {leaf} has no class values"))?;
        let total: f64 = v.iter().sum();
        if total > 0.0 {
            Ok(v.iter().map(|c| c / total).collect())
        } else {
            Ok(vec![0.0; v.len()])
        }
    }
}

/// Tree ensemble; the score of a class is its mean leaf probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.n_classes < 2 {
            anyhow::bail!("forest needs at least 2 classes, got {}", self.n_classes);
        }
        if self.n_features == 0 {
            anyhow::bail!("forest has zero input features");
        }
        if self.trees.is_empty() {
            anyhow::bail!("forest has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|e| e.context(format!("tree {i}")))?;
        }
        Ok(())
    }
}

impl GenreModel for ForestModel {
    fn input_dim(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn decision_scores(&self, x: &[f64]) -> Result<Vec<f64>> {
        check_dim(self.n_features, x)?;
        if self.trees.is_empty() {
            return Err(anyhow::anyhow!("forest has no trees").into());
        }

        let mut scores = vec![0.0; self.n_classes];
        for (i, tree) in self.trees.iter().enumerate() {
            let proba = tree
                .proba(x)
                .map_err(|e| e.context(format!("evaluating tree {i}")))?;
            for (s, p) in scores.iter_mut().zip(proba) {
                *s += p;
            }
        }
        let n = self.trees.len() as f64;
        scores.iter_mut().for_each(|s| *s /= n);
        Ok(scores)
    }
}
