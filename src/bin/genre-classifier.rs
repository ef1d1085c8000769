use anyhow::anyhow;
use clap::{Parser, Subcommand};
use genre_classifier_core::{
    predict, prepare_model, set_download_progress_callback, AudioSource, ClassifierModel,
    FeatureConfig, FeatureExtractor, Genre, GenreError, GenreModel, ModelContext,
    WaveformLoader,
};
use serde_json::json;
use std::{path::PathBuf, process};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "genre-classifier")]
#[command(about = "Predict the musical genre of audio files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one or more audio files
    Predict {
        #[arg(short, long, env = "GENRE_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Takes precedence over --model and GENRE_MODEL_PATH
        #[arg(long)]
        manifest_url: Option<String>,

        /// Print per-class scores next to the genre
        #[arg(long)]
        scores: bool,

        #[arg(short, long)]
        quiet: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print feature vectors as JSON lines
    Features {
        #[arg(short, long, env = "GENRE_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Ground-truth genre to attach to every line
        #[arg(short, long)]
        label: Option<Genre>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Describe a model bundle
    Info {
        #[arg(short, long, env = "GENRE_MODEL_PATH")]
        model: PathBuf,
    },

    /// Download and verify a model bundle
    Prepare {
        #[arg(long)]
        manifest_url: String,

        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Predict {
            model,
            manifest_url,
            scores,
            quiet,
            files,
        } => handle_predict(model, manifest_url, scores, quiet, files),
        Commands::Features {
            model,
            label,
            files,
        } => handle_features(model, label, files),
        Commands::Info { model } => handle_info(model),
        Commands::Prepare {
            manifest_url,
            quiet,
        } => handle_prepare(manifest_url, quiet),
    };

    match result {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = if matches!(e, GenreError::ModelLoad { .. }) {
                2
            } else {
                1
            };
            process::exit(code);
        }
    }
}

type CliResult = Result<bool, GenreError>;

fn load_context(
    model: Option<PathBuf>,
    manifest_url: Option<String>,
    quiet: bool,
) -> Result<ModelContext, GenreError> {
    match (model, manifest_url) {
        (_, Some(url)) => {
            if !quiet {
                setup_download_progress();
            }
            prepare_model(&url)
        }
        (Some(path), None) => ModelContext::load(path),
        (None, None) => Err(GenreError::ModelLoad {
            path: "<none>".into(),
            source: anyhow!("pass --model, --manifest-url or set GENRE_MODEL_PATH"),
        }),
    }
}

fn handle_predict(
    model: Option<PathBuf>,
    manifest_url: Option<String>,
    scores: bool,
    quiet: bool,
    files: Vec<PathBuf>,
) -> CliResult {
    let ctx = load_context(model, manifest_url, quiet)?;

    if !quiet {
        eprintln!("🎵 Genre Classifier");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Model: {}", ctx.name());
        eprintln!("Files: {}", files.len());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut all_ok = true;
    for file in files {
        let source = AudioSource::from(file.clone());
        match predict(&ctx, &source) {
            Ok(p) if scores => {
                let rendered: Vec<String> = ctx
                    .labels()
                    .genres()
                    .iter()
                    .zip(&p.scores)
                    .map(|(g, s)| format!("{g}={s:.4}"))
                    .collect();
                println!("{}\t{}\t{}", file.display(), p.genre, rendered.join(" "));
            }
            Ok(p) => println!("{}\t{}", file.display(), p.genre),
            Err(e) => {
                all_ok = false;
                eprintln!("❌ {}: {}", file.display(), e);
            }
        }
    }

    Ok(all_ok)
}

fn handle_features(model: Option<PathBuf>, label: Option<Genre>, files: Vec<PathBuf>) -> CliResult {
    // without a bundle, extract with the deployed defaults
    let config = match model {
        Some(path) => ModelContext::load(path)?.feature_config().clone(),
        None => FeatureConfig::default(),
    };
    let loader = WaveformLoader::from_config(&config);
    let extractor = FeatureExtractor::new(config)?;

    let mut all_ok = true;
    for file in files {
        let source = AudioSource::from(file.clone());
        match loader.load(&source) {
            Ok(waveform) => {
                let features = extractor.extract(&waveform);
                let line = json!({
                    "file": file.display().to_string(),
                    "label": label,
                    "features": features,
                });
                println!("{line}");
            }
            Err(e) => {
                all_ok = false;
                eprintln!("❌ {}: {}", file.display(), e);
            }
        }
    }

    Ok(all_ok)
}

fn handle_info(model: PathBuf) -> CliResult {
    let ctx = ModelContext::load(&model)?;
    let config = serde_json::to_string_pretty(ctx.feature_config())?;

    println!("name:       {}", ctx.name());
    println!("classifier: {}", describe_classifier(ctx.classifier()));
    println!("dimension:  {}", ctx.dimension());
    let labels: Vec<&str> = ctx.labels().genres().iter().map(|g| g.as_str()).collect();
    println!("labels:     {}", labels.join(", "));
    println!("features:   {config}");

    Ok(true)
}

fn describe_classifier(classifier: &ClassifierModel) -> String {
    match classifier {
        ClassifierModel::Linear(m) => format!(
            "linear ({:?}, {} classes, {} inputs)",
            m.strategy,
            m.n_classes,
            m.input_dim()
        ),
        ClassifierModel::Forest(m) => format!(
            "forest ({} trees, {} classes, {} inputs)",
            m.trees.len(),
            m.n_classes,
            m.n_features
        ),
    }
}

fn handle_prepare(manifest_url: String, quiet: bool) -> CliResult {
    if !quiet {
        eprintln!("📦 Preparing model from {}", manifest_url);
        eprintln!();
        setup_download_progress();
    }

    let handle = genre_classifier_core::ensure_model(&manifest_url)?;
    ModelContext::load(&handle.local_path)?;

    if !quiet {
        eprintln!("✅ Model prepared successfully!");
    }
    println!("{}", handle.local_path.display());

    Ok(true)
}

fn setup_download_progress() {
    set_download_progress_callback(|downloaded, total| {
        if total > 0 {
            let percent = (downloaded as f64 / total as f64 * 100.0).round() as u64;
            let downloaded_mb = downloaded as f64 / 1_000_000.0;
            let total_mb = total as f64 / 1_000_000.0;
            eprint!(
                "\r📥 Downloading model: {:>3}% ({:.2} MB / {:.2} MB)",
                percent, downloaded_mb, total_mb
            );
            if downloaded >= total {
                eprintln!();
            }
        } else {
            eprint!("\r📥 Downloading model: {:.2} MB", downloaded as f64 / 1_000_000.0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_url_is_accepted_alongside_a_model_path() {
        let cli = Cli::try_parse_from([
            "genre-classifier",
            "predict",
            "--model",
            "bundle.json",
            "--manifest-url",
            "http://localhost/manifest.json",
            "song.wav",
        ])
        .expect("both model sources should parse");

        match cli.command {
            Commands::Predict {
                model,
                manifest_url,
                ..
            } => {
                assert_eq!(model, Some(PathBuf::from("bundle.json")));
                assert_eq!(manifest_url.as_deref(), Some("http://localhost/manifest.json"));
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn missing_model_source_is_a_model_load_error() {
        let err = load_context(None, None, true).unwrap_err();
        assert!(matches!(err, GenreError::ModelLoad { .. }));
    }
}
