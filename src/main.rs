mod app;
mod color;
mod config;
mod data;
mod embed;
mod error;
mod export;
mod headless;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use app::RustyUmapApp;
use clap::Parser;
use config::AppConfig;
use eframe::egui;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "rusty-umap")]
#[command(about = "Embed a gzip IDX image dataset with UMAP and plot it by label")]
#[command(version)]
struct Args {
    /// Gzip-compressed IDX label file
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Gzip-compressed IDX image file
    #[arg(long)]
    images: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only use the first N samples
    #[arg(long)]
    limit: Option<usize>,

    /// Number of UMAP epochs (default depends on sample count)
    #[arg(long)]
    epochs: Option<usize>,

    /// Random seed of the layout
    #[arg(long)]
    seed: Option<u64>,

    /// Accept streams whose magic number does not match
    #[arg(long)]
    no_validate_magic: bool,

    /// Run without a window and write the embedding to --output
    #[arg(long, requires = "output")]
    headless: bool,

    /// Export path (.csv, .json, .parquet or .png)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    /// Load the config file (if any) and apply command-line overrides.
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_json_file(path)?,
            None => AppConfig::default(),
        };
        if let Some(path) = &self.labels {
            config.dataset.labels.path = path.clone();
        }
        if let Some(path) = &self.images {
            config.dataset.images.path = path.clone();
        }
        if self.limit.is_some() {
            config.dataset.limit = self.limit;
        }
        if self.epochs.is_some() {
            config.umap.n_epochs = self.epochs;
        }
        if let Some(seed) = self.seed {
            config.umap.seed = seed;
        }
        if self.no_validate_magic {
            config.dataset.validate_magic = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    if args.headless {
        let output = args
            .output
            .as_deref()
            .ok_or_else(|| anyhow!("--headless requires --output"))?;
        return headless::run(&config, output);
    }

    let mut state = AppState::new(config);
    let (labels, images) = (
        state.config.dataset.labels.path.clone(),
        state.config.dataset.images.path.clone(),
    );
    if labels.exists() && images.exists() {
        state.load(labels, images);
    } else {
        log::info!("No dataset at {} / {}", labels.display(), images.display());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty UMAP – MNIST Embedding Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyUmapApp::new(state)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
