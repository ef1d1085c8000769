use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    core::features::FeatureConfig,
    error::{GenreError, Result},
    model::{
        classifier::{ClassifierModel, GenreModel},
        labels::LabelTable,
        scaler::NormalizationParams,
    },
};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Everything a trained pipeline needs, persisted together as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub name: String,
    pub features: FeatureConfig,
    pub normalizer: NormalizationParams,
    pub classifier: ClassifierModel,
    pub labels: LabelTable,
}

impl ModelBundle {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let file = File::open(path)
            .with_context(|| format!("opening {:?}", path))
            .map_err(|e| GenreError::model_load(&origin, e))?;
        Self::from_reader(BufReader::new(file), &origin)
    }

    /// Parses and validates a bundle; `origin` only labels errors.
    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self> {
        let bundle: ModelBundle = serde_json::from_reader(reader)
            .context("parsing model bundle")
            .map_err(|e| GenreError::model_load(origin, e))?;
        bundle
            .validate()
            .map_err(|e| GenreError::model_load(origin, e))?;
        Ok(bundle)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Cross-checks the components against each other.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            anyhow::bail!(
                "unsupported bundle format version {} (expected {})",
                self.format_version,
                BUNDLE_FORMAT_VERSION
            );
        }

        self.features.validate().context("feature config")?;
        self.normalizer.validate().context("normalizer")?;
        self.classifier.validate().context("classifier")?;
        self.labels.validate().context("label table")?;

        let dim = self.features.dimension();
        if self.normalizer.len() != dim {
            anyhow::bail!(
                "normalizer expects {} features but the extractor produces {dim}",
                self.normalizer.len()
            );
        }
        if self.classifier.input_dim() != dim {
            anyhow::bail!(
                "classifier expects {} features but the extractor produces {dim}",
                self.classifier.input_dim()
            );
        }
        if self.classifier.n_classes() != self.labels.len() {
            anyhow::bail!(
                "classifier has {} classes but the label table has {}",
                self.classifier.n_classes(),
                self.labels.len()
            );
        }
        Ok(())
    }
}
