use crate::error::{GenreError, Result};
use directories::ProjectDirs;
use std::{env, path::PathBuf};

/// Overrides the model cache location.
pub const CACHE_DIR_ENV: &str = "GENRE_CLASSIFIER_CACHE_DIR";

/// Default bundle path for callers that don't pass one explicitly.
pub const MODEL_PATH_ENV: &str = "GENRE_MODEL_PATH";

pub fn models_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let proj = ProjectDirs::from("dev", "GenreClassifier", "genre-classifier-core")
        .ok_or(GenreError::CacheDirUnavailable)?;
    let mut p = PathBuf::from(proj.cache_dir());
    p.push("models");
    Ok(p)
}

pub fn model_path_from_env() -> Option<PathBuf> {
    env::var_os(MODEL_PATH_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}
