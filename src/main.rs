use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use emotion_insight::config::Config;
use emotion_insight::face::FaceOutcome;
use emotion_insight::registry::EmotionModels;
use emotion_insight::suggestion::suggestion_for;
use emotion_insight::web;

/// Emotion detection from text, face pictures and voice recordings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.emotion-insight/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web UI and JSON API
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Keep serving when some panels fail to load
        #[arg(long)]
        allow_partial: bool,
    },

    /// Predict the emotion of a piece of text
    Text {
        text: String,
    },

    /// Predict the emotion of the most prominent face in a picture
    Face {
        image: PathBuf,
    },

    /// Predict the emotion of a WAV or MP3 recording
    Voice {
        audio: PathBuf,
    },

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };

    if let Command::InitConfig { force } = args.command {
        return init_config(&config_path, force);
    }

    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    config.validate()?;
    info!("Using config {:?}", config_path);

    match args.command {
        Command::Serve {
            host,
            port,
            allow_partial,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let models = load_models(&config).await?;
            if allow_partial {
                for panel in models.status().iter().filter(|p| !p.ready) {
                    warn!(
                        "{} panel unavailable: {}",
                        panel.modality,
                        panel.error.as_deref().unwrap_or("unknown error")
                    );
                }
            } else {
                models
                    .ensure_all_ready()
                    .context("Model loading failed (use --allow-partial to serve anyway)")?;
            }

            web::serve(Arc::new(models), &config.server).await
        }

        Command::Text { text } => {
            let models = load_models(&config).await?;
            let label = models.predict_text_emotion(&text)?;
            print_prediction("Text", &label);
            Ok(())
        }

        Command::Face { image } => {
            let models = load_models(&config).await?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read image {:?}", image))?;
            match models.analyze_face(&bytes)? {
                FaceOutcome::NoFace => {
                    eprintln!("No face detected. Please try again.");
                }
                outcome => print_prediction("Face", outcome.label()),
            }
            Ok(())
        }

        Command::Voice { audio } => {
            let models = load_models(&config).await?;
            let label = models.predict_voice_emotion(&audio)?;
            print_prediction("Voice", &label);
            Ok(())
        }

        Command::InitConfig { .. } => Ok(()),
    }
}

/// Model loading reads and parses every artifact, so keep it off the runtime threads
async fn load_models(config: &Config) -> Result<EmotionModels> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || EmotionModels::load(&config))
        .await
        .context("Model loading task failed")
}

fn print_prediction(modality: &str, label: &str) {
    println!("Detected {} Emotion: {}", modality, label);
    println!("Suggestion: {}", suggestion_for(&label.to_lowercase()));
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists (use --force to overwrite)", path);
    }
    Config::default().save(path)?;
    println!("Wrote default config to {:?}", path);
    Ok(())
}
