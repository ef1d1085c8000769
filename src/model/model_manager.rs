use crate::{
    core::engine::ModelContext,
    error::{GenreError, Result},
    io::{
        crypto::{digest_file, is_cached},
        net::{download_with_progress, http_client},
        paths::models_cache_dir,
    },
    types::ModelManifest,
};

use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct ModelHandle {
    pub manifest: ModelManifest,
    pub local_path: PathBuf,
}

/// Makes sure the bundle described by the manifest at `manifest_url` is in
/// the local cache, downloading and verifying it if needed.
pub fn ensure_model(manifest_url: &str) -> Result<ModelHandle> {
    let client = http_client()?;
    let manifest: ModelManifest = client
        .get(manifest_url)
        .send()?
        .error_for_status()?
        .json()?;

    let a = manifest
        .resolve_primary_artifact()
        .map_err(GenreError::Manifest)?;

    let cache_dir = models_cache_dir()?;
    fs::create_dir_all(&cache_dir)?;
    let local_path = cache_dir.join(cache_file_name(&manifest.name, &a.file, &a.sha256)?);

    if is_cached(&local_path, &a.sha256) {
        debug!(path = %local_path.display(), "using cached model artifact");
    } else {
        info!(model = %manifest.name, url = %a.url, "downloading model artifact");
        download_with_progress(&client, &a.url, &local_path)?;

        let digest = digest_file(&local_path)?;
        if !digest.matches(&a.sha256) {
            debug!(expected = %a.sha256, got = %digest.sha256, "checksum mismatch");
            fs::remove_file(&local_path).ok();
            return Err(GenreError::Checksum {
                path: local_path.display().to_string(),
            });
        }
        if a.size_bytes > 0 && digest.size != a.size_bytes {
            warn!(
                path = %local_path.display(),
                expected = a.size_bytes,
                got = digest.size,
                "artifact size mismatch"
            );
        }
    }

    Ok(ModelHandle {
        manifest,
        local_path,
    })
}

/// `<name>-<sha prefix>.<ext>`; the name and extension come from the remote
/// manifest and must not leave the cache directory.
fn cache_file_name(name: &str, file: &str, sha256: &str) -> Result<String> {
    let ext = file.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
    for (what, part) in [("name", name), ("file extension", ext)] {
        if part.contains(['/', '\\']) || part.contains("..") {
            return Err(GenreError::Manifest(format!(
                "model {what} `{part}` is not a plain file name"
            )));
        }
    }
    if name.is_empty() {
        return Err(GenreError::Manifest("model name is empty".into()));
    }

    let prefix = sha256.get(..8).unwrap_or(sha256);
    Ok(if ext.is_empty() {
        format!("{name}-{prefix}")
    } else {
        format!("{name}-{prefix}.{ext}")
    })
}

/// [`ensure_model`] followed by loading the cached bundle.
pub fn prepare_model(manifest_url: &str) -> Result<ModelContext> {
    let handle = ensure_model(manifest_url)?;
    ModelContext::load(&handle.local_path)
}
