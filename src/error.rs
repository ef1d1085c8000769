use thiserror::Error;

/// Central error type for the genre-classifier-core crate.
#[derive(Debug, Error)]
pub enum GenreError {
    /// The audio source could not be opened, probed or decoded.
    #[error("failed to decode audio from {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: anyhow::Error,
    },

    /// A vector's length disagrees with what the trained model expects.
    /// Usually means extraction and training configurations drifted apart.
    #[error("dimension mismatch in {stage}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("classifier returned class index {index}, but only {classes} labels are known")]
    UnknownClass { index: usize, classes: usize },

    /// The model artifact is missing, unreadable or inconsistent.
    #[error("failed to load model artifact {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    // Provisioning
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("Checksum mismatch for {path}")]
    Checksum { path: String },

    #[error("Cache dir not available")]
    CacheDirUnavailable,

    // Generic fallback (wraps anyhow)
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl GenreError {
    pub(crate) fn decode(origin: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        GenreError::Decode {
            origin: origin.into(),
            source: source.into(),
        }
    }

    pub(crate) fn model_load(path: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        GenreError::ModelLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    /// True for failures scoped to a single invocation; the loaded model
    /// remains usable for other inputs.
    pub fn is_per_request(&self) -> bool {
        matches!(
            self,
            GenreError::Decode { .. }
                | GenreError::DimensionMismatch { .. }
                | GenreError::UnknownClass { .. }
        )
    }
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for GenreError {
    fn from(e: std::io::Error) -> Self {
        GenreError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for GenreError {
    fn from(e: serde_json::Error) -> Self {
        GenreError::Anyhow(e.into())
    }
}

impl From<reqwest::Error> for GenreError {
    fn from(e: reqwest::Error) -> Self {
        GenreError::Anyhow(e.into())
    }
}

pub type Result<T> = std::result::Result<T, GenreError>;
