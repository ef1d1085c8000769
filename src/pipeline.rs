use crate::{
    audio::AudioSource,
    core::engine::ModelContext,
    error::Result,
    model::labels::Genre,
    types::{FeatureVector, Prediction},
};

use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};

/// Decode, extract, normalize, classify and decode the label of one source.
pub fn predict(ctx: &ModelContext, source: &AudioSource) -> Result<Prediction> {
    let started = Instant::now();

    let features = extract_features(ctx, source)?;
    let prediction = ctx.classify(&features)?;

    debug!(
        source = %source.describe(),
        genre = %prediction.genre,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "prediction done"
    );
    Ok(prediction)
}

pub fn predict_genre(ctx: &ModelContext, source: &AudioSource) -> Result<Genre> {
    predict(ctx, source).map(|p| p.genre)
}

/// Returns `None` instead of an error; the cause is logged.
pub fn predict_genre_lossy(ctx: &ModelContext, source: &AudioSource) -> Option<Genre> {
    match predict_genre(ctx, source) {
        Ok(genre) => Some(genre),
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "genre prediction failed");
            None
        }
    }
}

pub fn extract_features(ctx: &ModelContext, source: &AudioSource) -> Result<FeatureVector> {
    let started = Instant::now();
    let waveform = ctx.load_waveform(source)?;
    debug!(
        source = %source.describe(),
        samples = waveform.len(),
        sample_rate = waveform.sample_rate(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "waveform loaded"
    );
    Ok(ctx.extract_waveform(&waveform))
}

/// Runs [`predict`] over all sources in parallel. Results keep input order.
pub fn predict_many(ctx: &ModelContext, sources: &[AudioSource]) -> Vec<Result<Prediction>> {
    sources.par_iter().map(|s| predict(ctx, s)).collect()
}
