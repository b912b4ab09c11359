use clap::Parser;
use recipe_backend::training::{self, TrainingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Fine-tunes the ingredient classifier head on a labelled image tree.
#[derive(Parser, Debug)]
#[command(name = "train", version)]
struct Args {
    /// Training configuration (YAML).
    #[arg(short, long, env = "TRAINING_CONFIG", default_value = "config/training.yaml")]
    config: PathBuf,

    /// Overrides the number of epochs from the config file.
    #[arg(long)]
    epochs: Option<usize>,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    let mut config = match TrainingConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }

    match training::run(&config) {
        Ok(report) => {
            log::info!("Class names: {:?}", report.artifact.class_names);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Training failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
