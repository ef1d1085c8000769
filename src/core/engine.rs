use crate::{
    audio::{AudioSource, WaveformLoader},
    core::features::{FeatureConfig, FeatureExtractor},
    error::{GenreError, Result},
    model::{
        bundle::ModelBundle,
        classifier::{argmax, ClassifierModel, GenreModel},
        labels::LabelTable,
        scaler::NormalizationParams,
    },
    types::{FeatureVector, Prediction, Waveform},
};

use anyhow::anyhow;
use std::{fmt, path::Path};
use tracing::{debug, info};

/// A loaded, validated model bundle ready to serve predictions.
///
/// Immutable after construction; share it by reference across threads.
pub struct ModelContext {
    name: String,
    loader: WaveformLoader,
    extractor: FeatureExtractor,
    normalizer: NormalizationParams,
    classifier: ClassifierModel,
    labels: LabelTable,
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("name", &self.name)
            .field("kind", &self.classifier.kind())
            .field("dimension", &self.dimension())
            .field("classes", &self.labels.len())
            .finish()
    }
}

impl ModelContext {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bundle = ModelBundle::load(path)?;
        Self::build(bundle, &path.display().to_string())
    }

    /// Like [`ModelContext::load`], but also rejects a bundle whose feature
    /// configuration is not exactly `expected`.
    pub fn load_expecting<P: AsRef<Path>>(path: P, expected: &FeatureConfig) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let bundle = ModelBundle::load(path)?;
        if &bundle.features != expected {
            return Err(GenreError::model_load(
                origin,
                anyhow!(
                    "bundle feature config {:?} differs from expected {:?}",
                    bundle.features,
                    expected
                ),
            ));
        }
        Self::build(bundle, &origin)
    }

    pub fn from_bundle(bundle: ModelBundle) -> Result<Self> {
        let origin = format!("<in-memory bundle {}>", bundle.name);
        bundle
            .validate()
            .map_err(|e| GenreError::model_load(&origin, e))?;
        Self::build(bundle, &origin)
    }

    fn build(bundle: ModelBundle, origin: &str) -> Result<Self> {
        let ModelBundle {
            name,
            features,
            normalizer,
            classifier,
            labels,
            ..
        } = bundle;

        let loader = WaveformLoader::from_config(&features);
        let extractor =
            FeatureExtractor::new(features).map_err(|e| GenreError::model_load(origin, e))?;

        info!(
            model = %name,
            kind = classifier.kind(),
            dim = extractor.dimension(),
            classes = labels.len(),
            "model loaded"
        );

        Ok(Self {
            name,
            loader,
            extractor,
            normalizer,
            classifier,
            labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_config(&self) -> &FeatureConfig {
        self.extractor.config()
    }

    pub fn dimension(&self) -> usize {
        self.extractor.dimension()
    }

    pub fn loader(&self) -> &WaveformLoader {
        &self.loader
    }

    pub fn normalizer(&self) -> &NormalizationParams {
        &self.normalizer
    }

    pub fn classifier(&self) -> &ClassifierModel {
        &self.classifier
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn load_waveform(&self, source: &AudioSource) -> Result<Waveform> {
        self.loader.load(source)
    }

    pub fn extract_waveform(&self, waveform: &Waveform) -> FeatureVector {
        self.extractor.extract(waveform)
    }

    pub fn extract(&self, source: &AudioSource) -> Result<FeatureVector> {
        let waveform = self.load_waveform(source)?;
        Ok(self.extract_waveform(&waveform))
    }

    /// Normalizer, classifier and label decoding for an already extracted
    /// vector.
    pub fn classify(&self, features: &FeatureVector) -> Result<Prediction> {
        let normalized = self.normalizer.normalize(features)?;
        let scores = self.classifier.decision_scores(normalized.as_slice())?;
        let class_index = argmax(&scores);
        let genre = self.labels.decode(class_index)?;
        debug!(class_index, %genre, "classified");
        Ok(Prediction {
            genre,
            class_index,
            scores,
        })
    }
}
