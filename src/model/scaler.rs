use serde::{Deserialize, Serialize};

use crate::{
    error::{GenreError, Result},
    types::FeatureVector,
};

/// Per-position `(mean, scale)` fitted at training time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl NormalizationParams {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> anyhow::Result<Self> {
        let params = Self { mean, scale };
        params.validate()?;
        Ok(params)
    }

    /// Mean 0 / scale 1 for every position.
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            scale: vec![1.0; len],
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "normalizer has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            );
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            anyhow::bail!("normalizer mean[{i}] is not finite");
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            anyhow::bail!("normalizer scale[{i}] must be finite and non-zero");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// `(v[i] - mean[i]) / scale[i]` for every position.
    pub fn normalize(&self, features: &FeatureVector) -> Result<FeatureVector> {
        if features.len() != self.len() {
            return Err(GenreError::DimensionMismatch {
                stage: "normalizer",
                expected: self.len(),
                actual: features.len(),
            });
        }

        let values = features
            .as_slice()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect();
        Ok(FeatureVector::new(values))
    }
}
