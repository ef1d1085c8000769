use approx::assert_abs_diff_eq;
use genre_classifier_core::core::dsp::{
    centered_frame_count, compute_hann, dct_ii_ortho, fft_frequencies, hz_to_mel, mel_filterbank,
    mel_to_hz, power_to_db, zero_crossing_rate, Stft,
};
use ndarray::{array, Array2};

#[test]
fn hann_is_periodic() {
    let w = compute_hann(8);
    assert_eq!(w.len(), 8);
    assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(w[4], 1.0, epsilon = 1e-12);
    // periodic window: w[k] == w[n - k]
    for k in 1..8 {
        assert_abs_diff_eq!(w[k], w[8 - k], epsilon = 1e-12);
    }
}

#[test]
fn fft_frequencies_span_dc_to_nyquist() {
    let f = fft_frequencies(22_050, 2048);
    assert_eq!(f.len(), 1025);
    assert_abs_diff_eq!(f[0], 0.0);
    assert_abs_diff_eq!(f[1024], 11_025.0, epsilon = 1e-9);
}

#[test]
fn stft_dims_reference() {
    let stft = Stft::new(2048, 512);
    let t = 22_050 * 3;
    let mag = stft.magnitude(&vec![0.0f32; t]);
    assert_eq!(mag.nrows(), 1025);
    assert_eq!(mag.ncols(), centered_frame_count(t, 512));
    assert_eq!(mag.ncols(), 1 + t / 512);
}

#[test]
fn stft_of_empty_signal_is_one_silent_frame() {
    let stft = Stft::new(256, 64);
    let mag = stft.magnitude(&[]);
    assert_eq!(mag.dim(), (129, 1));
    assert!(mag.iter().all(|&m| m == 0.0));
}

#[test]
fn stft_peaks_at_tone_bin() {
    let n_fft = 1024;
    let sr = 8_000.0f32;
    // 1000 Hz lands exactly on bin 128
    let signal: Vec<f32> = (0..8_000)
        .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr).sin())
        .collect();
    let mag = Stft::new(n_fft, 256).magnitude(&signal);

    let mid = mag.ncols() / 2;
    let column = mag.column(mid);
    let peak = column
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
    assert_eq!(peak.0, 128);
}

#[test]
fn mel_scale_round_trips() {
    for hz in [0.0, 200.0, 999.0, 1000.0, 4000.0, 11_025.0] {
        assert_abs_diff_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-6);
    }
    // linear region
    assert_abs_diff_eq!(hz_to_mel(600.0), 9.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hz_to_mel(1000.0), 15.0, epsilon = 1e-9);
}

#[test]
fn mel_filterbank_shape_and_coverage() {
    let fb = mel_filterbank(22_050, 2048, 128, 0.0, 11_025.0);
    assert_eq!(fb.dim(), (128, 1025));
    assert!(fb.iter().all(|&w| w >= 0.0 && w.is_finite()));
    for row in fb.rows() {
        assert!(row.sum() > 0.0, "every filter covers at least one bin");
    }
}

#[test]
fn dct_basis_is_orthonormal() {
    let n = 16;
    let d = dct_ii_ortho(n, n);
    let gram: Array2<f64> = d.dot(&d.t());
    for i in 0..n {
        for j in 0..n {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-10);
        }
    }
}

#[test]
fn power_to_db_clamps_to_top_db() {
    let p = array![[1.0, 1e-3], [1e-12, 0.0]];
    let db = power_to_db(&p, Some(80.0));
    assert_abs_diff_eq!(db[[0, 0]], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(db[[0, 1]], -30.0, epsilon = 1e-9);
    assert_abs_diff_eq!(db[[1, 0]], -80.0, epsilon = 1e-9);
    assert_abs_diff_eq!(db[[1, 1]], -80.0, epsilon = 1e-9);

    let raw = power_to_db(&p, None);
    assert_abs_diff_eq!(raw[[1, 1]], -100.0, epsilon = 1e-9);
}

#[test]
fn zcr_of_silence_and_empty_is_zero() {
    assert_eq!(zero_crossing_rate(&[], 2048, 512), 0.0);
    assert_eq!(zero_crossing_rate(&vec![0.0; 10_000], 2048, 512), 0.0);
}

#[test]
fn zcr_of_alternating_signal() {
    let signal: Vec<f32> = (0..4096).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    // interior frames see frame_length - 1 crossings
    let zcr = zero_crossing_rate(&signal, 64, 64);
    assert!(zcr > 0.9 && zcr <= 1.0, "zcr = {zcr}");
}
