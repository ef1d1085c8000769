fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: ensure_model <manifest-url>"))?;

    genre_classifier_core::set_download_progress_callback(|done, total| {
        let pct = if total > 0 {
            (done as f64 / total as f64 * 100.0).round() as u64
        } else {
            0
        };
        eprint!("\rDownloading model… {}% ({}/{} bytes)", pct, done, total);
    });

    let handle = genre_classifier_core::ensure_model(&url)?;
    eprintln!("\nOK: cached at {}", handle.local_path.display());
    eprintln!(
        "Manifest {} v{} lists {} artifact(s)",
        handle.manifest.name,
        handle.manifest.version,
        handle.manifest.artifacts.len()
    );

    Ok(())
}
