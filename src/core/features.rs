//! Fixed-order feature extraction: four spectral statistics followed by the
//! per-coefficient means of the mel cepstrum.
//!
//! Every analysis parameter lives in [`FeatureConfig`]. The same config is
//! stored in the model bundle, so the vectors computed at inference time are
//! produced exactly the way the training vectors were.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    core::dsp::{
        dct_ii_ortho, fft_frequencies, mel_filterbank, power_to_db, row_means,
        zero_crossing_rate, Stft,
    },
    types::{FeatureVector, Waveform, SPECTRAL_FEATURES},
};

/// How the loader treats the decoded sample rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRatePolicy {
    /// Keep whatever rate the file was encoded at.
    Native,
    /// Resample everything to this rate (Hz).
    Fixed(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub sample_rate: SampleRatePolicy,
    pub max_duration_secs: f64,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
    pub fmin: f64,
    /// `None` means the Nyquist frequency of the analysed waveform.
    pub fmax: Option<f64>,
    pub rolloff_percent: f64,
    pub top_db: Option<f64>,
    pub zcr_frame_length: usize,
    pub zcr_hop_length: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRatePolicy::Fixed(22_050),
            max_duration_secs: 30.0,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 20,
            fmin: 0.0,
            fmax: None,
            rolloff_percent: 0.85,
            top_db: Some(80.0),
            zcr_frame_length: 2048,
            zcr_hop_length: 512,
        }
    }
}

impl FeatureConfig {
    /// Length of the vectors this config produces.
    pub fn dimension(&self) -> usize {
        SPECTRAL_FEATURES + self.n_mfcc
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let SampleRatePolicy::Fixed(0) = self.sample_rate {
            anyhow::bail!("fixed sample rate must be positive");
        }
        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            anyhow::bail!("max_duration_secs must be positive, got {}", self.max_duration_secs);
        }
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            anyhow::bail!("n_fft must be an even number >= 2, got {}", self.n_fft);
        }
        if self.hop_length == 0 || self.zcr_hop_length == 0 {
            anyhow::bail!("hop lengths must be positive");
        }
        if self.zcr_frame_length < 2 || self.zcr_frame_length % 2 != 0 {
            anyhow::bail!(
                "zcr_frame_length must be an even number >= 2, got {}",
                self.zcr_frame_length
            );
        }
        if self.n_mels == 0 || self.n_mfcc == 0 {
            anyhow::bail!("n_mels and n_mfcc must be positive");
        }
        if self.n_mfcc > self.n_mels {
            anyhow::bail!("n_mfcc ({}) exceeds n_mels ({})", self.n_mfcc, self.n_mels);
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent <= 1.0) {
            anyhow::bail!("rolloff_percent must be in (0, 1], got {}", self.rolloff_percent);
        }
        if !(self.fmin.is_finite() && self.fmin >= 0.0) {
            anyhow::bail!("fmin must be a non-negative frequency");
        }
        if let Some(fmax) = self.fmax {
            if !(fmax.is_finite() && fmax > self.fmin) {
                anyhow::bail!("fmax ({fmax}) must exceed fmin ({})", self.fmin);
            }
        }
        if let Some(top_db) = self.top_db {
            if !(top_db.is_finite() && top_db >= 0.0) {
                anyhow::bail!("top_db must be non-negative");
            }
        }
        Ok(())
    }
}

/// Computes [`FeatureVector`]s from waveforms. Immutable once built.
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: Stft,
    dct: Array2<f64>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let stft = Stft::new(config.n_fft, config.hop_length);
        let dct = dct_ii_ortho(config.n_mfcc, config.n_mels);
        Ok(Self { config, stft, dct })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension()
    }

    /// Feature vector of `waveform`, always `dimension()` values long.
    pub fn extract(&self, waveform: &Waveform) -> FeatureVector {
        let sr = waveform.sample_rate();
        if let SampleRatePolicy::Fixed(expected) = self.config.sample_rate {
            if expected != sr {
                warn!(expected, actual = sr, "waveform rate differs from extraction config");
            }
        }

        let magnitude = self.stft.magnitude(waveform.samples());
        let freqs = fft_frequencies(sr, self.config.n_fft);

        let (centroid, bandwidth, rolloff) = self.spectral_stats(&magnitude, &freqs);
        let zcr = zero_crossing_rate(
            waveform.samples(),
            self.config.zcr_frame_length,
            self.config.zcr_hop_length,
        );
        let cepstral = self.cepstral_means(&magnitude, sr);

        debug!(
            samples = waveform.len(),
            sample_rate = sr,
            frames = magnitude.ncols(),
            "extracted features"
        );

        let mut values = Vec::with_capacity(self.dimension());
        values.extend([centroid, bandwidth, rolloff, zcr]);
        values.extend(cepstral);
        FeatureVector::new(values)
    }

    /// Frame-averaged centroid, bandwidth and rolloff.
    fn spectral_stats(&self, magnitude: &Array2<f64>, freqs: &[f64]) -> (f64, f64, f64) {
        let nyquist = freqs.last().copied().unwrap_or(0.0);
        let mut sums = (0.0, 0.0, 0.0);

        for frame in magnitude.axis_iter(Axis(1)) {
            let total: f64 = frame.sum();

            // all-zero frames contribute zero centroid and bandwidth
            if total > f64::MIN_POSITIVE {
                let centroid = frame
                    .iter()
                    .zip(freqs)
                    .map(|(s, f)| s * f)
                    .sum::<f64>()
                    / total;
                let variance = frame
                    .iter()
                    .zip(freqs)
                    .map(|(s, f)| (s / total) * (f - centroid).powi(2))
                    .sum::<f64>();
                sums.0 += centroid;
                sums.1 += variance.sqrt();
            }

            let threshold = self.config.rolloff_percent * total;
            let mut cumulative = 0.0;
            let mut rolloff = nyquist;
            for (s, &f) in frame.iter().zip(freqs) {
                cumulative += s;
                if cumulative >= threshold {
                    rolloff = f;
                    break;
                }
            }
            sums.2 += rolloff;
        }

        let frames = magnitude.ncols().max(1) as f64;
        (sums.0 / frames, sums.1 / frames, sums.2 / frames)
    }

    /// Per-coefficient means of the mel cepstrum.
    fn cepstral_means(&self, magnitude: &Array2<f64>, sample_rate: u32) -> Vec<f64> {
        let cfg = &self.config;
        let fmax = cfg.fmax.unwrap_or(sample_rate as f64 / 2.0);
        let filters = if fmax > cfg.fmin {
            mel_filterbank(sample_rate, cfg.n_fft, cfg.n_mels, cfg.fmin, fmax)
        } else {
            Array2::zeros((cfg.n_mels, self.stft.n_bins()))
        };

        let power = magnitude.mapv(|m| m * m);
        let mel = filters.dot(&power);
        let db = power_to_db(&mel, cfg.top_db);
        let mfcc = self.dct.dot(&db);

        row_means(&mfcc).to_vec()
    }
}
