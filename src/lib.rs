//! # genre-classifier-core
//!
//! Music genre classification for audio files: decode and resample the
//! audio, compute a fixed-length spectral/cepstral feature vector, normalize
//! it, run a trained classifier and map the winning class to a [`Genre`].
//!
//! A trained pipeline ships as one JSON [`ModelBundle`]; load it into a
//! [`ModelContext`] once and pass that to [`predict`] for every file.

pub mod audio;
pub mod core;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod types;

pub use crate::{
    audio::{read_audio, read_audio_bytes, write_audio, AudioSource, WaveformLoader},
    core::{
        engine::ModelContext,
        features::{FeatureConfig, FeatureExtractor, SampleRatePolicy},
    },
    error::{GenreError, Result},
    io::{
        paths::{CACHE_DIR_ENV, MODEL_PATH_ENV},
        progress::{clear_download_progress_callback, set_download_progress_callback},
    },
    model::{
        bundle::ModelBundle,
        classifier::{ClassifierModel, GenreModel},
        labels::{Genre, LabelTable},
        model_manager::{ensure_model, prepare_model, ModelHandle},
        scaler::NormalizationParams,
    },
    pipeline::{extract_features, predict, predict_genre, predict_genre_lossy, predict_many},
    types::{AudioData, FeatureVector, ModelManifest, Prediction, Waveform},
};
