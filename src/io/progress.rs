use std::sync::{OnceLock, RwLock};

type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync + 'static>;

static DOWNLOAD_PROGRESS_CB: OnceLock<RwLock<Option<ProgressFn>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<ProgressFn>> {
    DOWNLOAD_PROGRESS_CB.get_or_init(|| RwLock::new(None))
}

/// Installs (or replaces) the callback receiving `(downloaded, total)` bytes.
/// `total` is 0 when the server sends no content length.
pub fn set_download_progress_callback(cb: impl Fn(u64, u64) + Send + Sync + 'static) {
    if let Ok(mut g) = slot().write() {
        *g = Some(Box::new(cb));
    }
}

pub fn clear_download_progress_callback() {
    if let Ok(mut g) = slot().write() {
        *g = None;
    }
}

pub fn emit_download_progress(done: u64, total: u64) {
    if let Ok(g) = slot().read() {
        if let Some(cb) = &*g {
            cb(done, total);
        }
    }
}
