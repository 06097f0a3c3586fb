use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::AppConfig;
use crate::data::loader::load_dataset;
use crate::embed::orchestrator::{self, run_with_progress};
use crate::embed::umap::Umap;
use crate::export::write_embedding;

/// Decode, embed and export without opening a window.
pub fn run(config: &AppConfig, output: &Path) -> Result<()> {
    let dataset = load_dataset(&config.dataset).context("loading dataset")?;

    let engine = Umap::new(config.umap.clone());
    let pb = progress_bar();
    // No terminal to draw on: fall back to periodic log lines.
    let result = if pb.is_hidden() {
        orchestrator::run(engine, &dataset.features)
    } else {
        run_with_progress(engine, &dataset.features, |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        })
    };
    let embedding = result.context("computing embedding")?;
    pb.finish_and_clear();

    write_embedding(output, &embedding, &dataset.labels)
        .with_context(|| format!("exporting to {}", output.display()))
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_bar} {pos}/{len} epochs ({eta})")
    {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IMAGE_MAGIC, LABEL_MAGIC};
    use crate::data::idx::tests::{image_stream, label_stream};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_gz(path: &Path, bytes: &[u8]) {
        let mut enc = GzEncoder::new(std::fs::File::create(path).unwrap(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn five_examples_end_to_end_stay_aligned() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.dataset.labels.path = dir.path().join("labels.gz");
        config.dataset.images.path = dir.path().join("images.gz");
        config.umap.n_epochs = Some(20);

        let labels = [4u8, 1, 4, 9, 1];
        let pixels: Vec<u8> = labels.iter().flat_map(|&l| [l * 20, 255 - l * 20, l, 0]).collect();
        write_gz(&config.dataset.labels.path, &label_stream(LABEL_MAGIC, 5, &labels));
        write_gz(&config.dataset.images.path, &image_stream(IMAGE_MAGIC, 5, 2, 2, &pixels));

        let output = dir.path().join("embedding.csv");
        run(&config, &output).unwrap();

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[0].parse::<usize>().unwrap(), i);
            assert_eq!(row[3].parse::<f32>().unwrap(), f32::from(labels[i]));
            assert!(row[1].parse::<f32>().unwrap().is_finite());
        }
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.dataset.labels.path = dir.path().join("nope.gz");
        let err = run(&config, &dir.path().join("out.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("loading dataset"));
    }
}
