use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Samples with `|x| <= ZCR_THRESHOLD` count as zero (non-negative).
pub const ZCR_THRESHOLD: f64 = 1e-10;

/// Floor applied before taking the log of a power spectrum.
pub const POWER_AMIN: f64 = 1e-10;

/// Periodic Hann window of length `n_fft`.
pub fn compute_hann(n_fft: usize) -> Vec<f64> {
    if n_fft <= 1 {
        return vec![1.0];
    }
    let n = n_fft as f64;
    (0..n_fft)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * (i as f64) / n).cos())
        .collect()
}

/// Frames produced by a centered analysis (`n_fft / 2` padding each side).
pub fn centered_frame_count(len: usize, hop: usize) -> usize {
    1 + len / hop
}

/// Center frequency (Hz) of every non-negative FFT bin.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    let sr = sample_rate as f64;
    (0..=n_fft / 2)
        .map(|k| k as f64 * sr / n_fft as f64)
        .collect()
}

/// Short-time Fourier transform with a fixed plan, window and hop.
///
/// The plan is built once; `Stft` is `Sync` and can be shared between
/// threads without locking.
pub struct Stft {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    n_fft: usize,
    hop: usize,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(n_fft),
            window: compute_hann(n_fft),
            n_fft,
            hop,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Magnitude spectrogram of `signal`, shape `(n_bins, frames)`.
    ///
    /// Frames are centered: the signal is zero-padded by `n_fft / 2` on
    /// both sides, so even an empty signal yields one (silent) frame.
    pub fn magnitude(&self, signal: &[f32]) -> Array2<f64> {
        let pad = self.n_fft / 2;
        let frames = centered_frame_count(signal.len(), self.hop);
        let bins = self.n_bins();

        let mut out = Array2::<f64>::zeros((bins, frames));
        let mut buf = vec![Complex64::zero(); self.n_fft];
        let mut scratch = vec![Complex64::zero(); self.fft.get_inplace_scratch_len()];

        for fr in 0..frames {
            let start = fr * self.hop;
            for (i, slot) in buf.iter_mut().enumerate() {
                let p = start + i;
                let x = if p >= pad && p - pad < signal.len() {
                    signal[p - pad] as f64
                } else {
                    0.0
                };
                *slot = Complex64::new(x * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buf, &mut scratch);

            for (b, c) in buf[..bins].iter().enumerate() {
                out[[b, fr]] = c.norm();
            }
        }

        out
    }
}

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn mel_logstep() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / mel_logstep()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (mel_logstep() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`.
pub fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let lo = hz_to_mel(fmin);
    let hi = hz_to_mel(fmax);
    if n == 1 {
        return vec![mel_to_hz(lo)];
    }
    (0..n)
        .map(|i| mel_to_hz(lo + (hi - lo) * i as f64 / (n - 1) as f64))
        .collect()
}

/// Triangular mel filter bank with Slaney area normalisation,
/// shape `(n_mels, n_fft / 2 + 1)`.
pub fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Array2<f64> {
    let fftfreqs = fft_frequencies(sample_rate, n_fft);
    let mel_f = mel_frequencies(n_mels + 2, fmin, fmax);
    let fdiff: Vec<f64> = mel_f.windows(2).map(|w| w[1] - w[0]).collect();

    let mut weights = Array2::<f64>::zeros((n_mels, fftfreqs.len()));
    for m in 0..n_mels {
        let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);
        for (k, &f) in fftfreqs.iter().enumerate() {
            let lower = (f - mel_f[m]) / fdiff[m];
            let upper = (mel_f[m + 2] - f) / fdiff[m + 1];
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

/// Power spectrogram to decibels (`ref = 1.0`), optionally clamped to
/// `top_db` below the global peak.
pub fn power_to_db(power: &Array2<f64>, top_db: Option<f64>) -> Array2<f64> {
    let mut db = power.mapv(|x| 10.0 * x.max(POWER_AMIN).log10());
    if let Some(top_db) = top_db {
        let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }
    db
}

/// Orthonormal DCT-II basis, shape `(n_out, n_in)`; row `k` is the k-th
/// cosine.
pub fn dct_ii_ortho(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    let s0 = (1.0 / n).sqrt();
    let sk = (2.0 / n).sqrt();
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { s0 } else { sk };
        scale * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}

/// Mean of every row across columns; zeros when there are no columns.
pub fn row_means(m: &Array2<f64>) -> Array1<f64> {
    m.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(m.nrows()))
}

/// Frame-averaged zero-crossing rate.
///
/// The signal is edge-padded by `frame_length / 2` on each side; each frame
/// contributes (sign changes between adjacent samples) / `frame_length`.
pub fn zero_crossing_rate(signal: &[f32], frame_length: usize, hop: usize) -> f64 {
    if signal.is_empty() || frame_length == 0 || hop == 0 {
        return 0.0;
    }

    let pad = frame_length / 2;
    let len = signal.len();
    let padded_len = len + 2 * pad;
    if padded_len < frame_length {
        return 0.0;
    }

    let negative = |p: usize| -> bool {
        let x = if p < pad {
            signal[0]
        } else if p - pad >= len {
            signal[len - 1]
        } else {
            signal[p - pad]
        };
        (x as f64) < -ZCR_THRESHOLD
    };

    // crossings[p] = sign changes between positions (q - 1, q) for q in 1..=p
    let mut crossings = vec![0usize; padded_len];
    let mut prev = negative(0);
    for (p, slot) in crossings.iter_mut().enumerate().skip(1) {
        let cur = negative(p);
        *slot = usize::from(cur != prev);
        prev = cur;
    }
    for p in 1..padded_len {
        crossings[p] += crossings[p - 1];
    }

    let frames = 1 + (padded_len - frame_length) / hop;
    let total: f64 = (0..frames)
        .map(|fr| {
            let s = fr * hop;
            (crossings[s + frame_length - 1] - crossings[s]) as f64 / frame_length as f64
        })
        .sum();

    total / frames as f64
}
