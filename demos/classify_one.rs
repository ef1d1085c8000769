use genre_classifier_core::{io::paths::model_path_from_env, predict, AudioSource, ModelContext};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: classify_one <audio> [bundle.json]"))?;
    let bundle = args
        .next()
        .map(PathBuf::from)
        .or_else(model_path_from_env)
        .ok_or_else(|| anyhow::anyhow!("no bundle given and GENRE_MODEL_PATH is not set"))?;

    let ctx = ModelContext::load(&bundle)?;
    let prediction = predict(&ctx, &AudioSource::from(input.as_str()))?;

    eprintln!("Model: {}", ctx.name());
    println!("{}", prediction.genre);
    for (genre, score) in ctx.labels().genres().iter().zip(&prediction.scores) {
        eprintln!("  {genre:<10} {score:>8.4}");
    }
    Ok(())
}
