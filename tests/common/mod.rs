#![allow(dead_code)]

use std::path::{Path, PathBuf};

use genre_classifier_core::{
    model::classifier::{LinearModel, MulticlassStrategy},
    write_audio, AudioData, ClassifierModel, FeatureConfig, LabelTable, ModelBundle,
    NormalizationParams,
};

pub const SR: u32 = 22_050;

pub fn sine(freq: f32, secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let n = (secs * sample_rate as f32) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Writes interleaved samples as 16-bit PCM WAV under `dir`.
pub fn write_wav(dir: &Path, name: &str, samples: Vec<f32>, sample_rate: u32, channels: u16) -> PathBuf {
    let path = dir.join(name);
    let audio = AudioData {
        samples,
        sample_rate,
        channels,
    };
    write_audio(path.to_str().unwrap(), &audio).expect("write wav");
    path
}

/// A linear one-vs-rest model over the default 24 features that only looks
/// at the zero-crossing rate: anything with `zcr > 0.01` is blues, silence is
/// classical.
pub fn zcr_bundle() -> ModelBundle {
    let config = FeatureConfig::default();
    let dim = config.dimension();

    let mut coef = vec![vec![0.0; dim]; 10];
    coef[0][3] = 100.0;
    let mut intercept = vec![-10.0; 10];
    intercept[0] = -1.0;
    intercept[1] = 0.0;

    ModelBundle {
        format_version: 1,
        name: "zcr-test".into(),
        features: config,
        normalizer: NormalizationParams::identity(dim),
        classifier: ClassifierModel::Linear(LinearModel {
            strategy: MulticlassStrategy::OneVsRest,
            n_classes: 10,
            coef,
            intercept,
        }),
        labels: LabelTable::default(),
    }
}

pub fn save_bundle(dir: &Path, bundle: &ModelBundle) -> PathBuf {
    let path = dir.join(format!("{}.json", bundle.name));
    bundle.save(&path).expect("save bundle");
    path
}
