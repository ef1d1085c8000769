use serde::{Deserialize, Serialize};

use crate::model::labels::Genre;

/// Decoded audio as it comes out of the container: interleaved samples.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Mono signal at a known rate, never longer than its duration cap.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    max_duration_secs: f64,
}

impl Waveform {
    /// Builds a waveform, truncating `samples` to `max_duration_secs`.
    ///
    /// `sample_rate` must be non-zero; the loader guarantees this for decoded
    /// audio.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32, max_duration_secs: f64) -> Self {
        debug_assert!(sample_rate > 0);
        let cap = max_frames(sample_rate, max_duration_secs);
        samples.truncate(cap);
        Self {
            samples,
            sample_rate,
            max_duration_secs,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_duration_secs(&self) -> f64 {
        self.max_duration_secs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Number of frames that fit in `secs` at `sample_rate`.
pub fn max_frames(sample_rate: u32, secs: f64) -> usize {
    (secs * sample_rate as f64).round().max(0.0) as usize
}

/// Number of leading spectral statistics in a [`FeatureVector`].
pub const SPECTRAL_FEATURES: usize = 4;

/// Ordered feature values: `[centroid, bandwidth, rolloff, zcr, mfcc_0 .. mfcc_{n-1}]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn centroid(&self) -> Option<f64> {
        self.0.first().copied()
    }

    pub fn bandwidth(&self) -> Option<f64> {
        self.0.get(1).copied()
    }

    pub fn rolloff(&self) -> Option<f64> {
        self.0.get(2).copied()
    }

    pub fn zero_crossing_rate(&self) -> Option<f64> {
        self.0.get(3).copied()
    }

    /// The cepstral means, empty when the vector is shorter than the
    /// spectral block.
    pub fn cepstral(&self) -> &[f64] {
        self.0.get(SPECTRAL_FEATURES..).unwrap_or(&[])
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Outcome of one pipeline invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub genre: Genre,
    pub class_index: usize,
    /// Per-class decision scores, indexed like the label table.
    pub scores: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub file: String,
    pub url: String,
    pub sha256: String,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Remote description of a downloadable model bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelManifest {
    pub name: String,
    pub version: String,
    #[serde(default = "default_manifest_format")]
    pub format: String,
    pub artifacts: Vec<ModelArtifact>,
}

fn default_manifest_format() -> String {
    "genre-bundle-json".into()
}

impl ModelManifest {
    /// The bundle file: first `.json` artifact, else the first artifact.
    pub fn resolve_primary_artifact(&self) -> std::result::Result<&ModelArtifact, String> {
        if self.artifacts.is_empty() {
            return Err(format!("manifest `{}` lists no artifacts", self.name));
        }
        let a = self
            .artifacts
            .iter()
            .find(|a| a.file.ends_with(".json"))
            .unwrap_or(&self.artifacts[0]);
        if a.sha256.len() < 8 || !a.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("artifact `{}` has an invalid sha256", a.file));
        }
        Ok(a)
    }
}
