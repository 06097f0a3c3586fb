use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::embed::umap::UmapConfig;

/// Magic number of an IDX label file (unsigned byte, 1 dimension).
pub const LABEL_MAGIC: u32 = 2049;
/// Magic number of an IDX image file (unsigned byte, 3 dimensions).
pub const IMAGE_MAGIC: u32 = 2051;

pub const LABEL_FILE_NAME: &str = "t10k-labels-idx1-ubyte.gz";
pub const IMAGE_FILE_NAME: &str = "t10k-images-idx3-ubyte.gz";

// ---------------------------------------------------------------------------
// Configuration table
// ---------------------------------------------------------------------------

/// One IDX stream: where it lives and which magic number it must carry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamSource {
    pub path: PathBuf,
    pub magic: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub labels: StreamSource,
    pub images: StreamSource,
    /// Reject streams whose magic number does not match.
    pub validate_magic: bool,
    /// Keep only the first `limit` records of both streams.
    pub limit: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            labels: StreamSource {
                path: PathBuf::from(LABEL_FILE_NAME),
                magic: LABEL_MAGIC,
            },
            images: StreamSource {
                path: PathBuf::from(IMAGE_FILE_NAME),
                magic: IMAGE_MAGIC,
            },
            validate_magic: true,
            limit: None,
        }
    }
}

impl DatasetConfig {
    /// Expected magic for the label stream, or `None` when validation is off.
    pub fn label_magic(&self) -> Option<u32> {
        self.validate_magic.then_some(self.labels.magic)
    }

    pub fn image_magic(&self) -> Option<u32> {
        self.validate_magic.then_some(self.images.magic)
    }
}

/// Top-level application settings, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub umap: UmapConfig,
    /// Engine steps the GUI runs per rendered frame.
    pub steps_per_frame: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            umap: UmapConfig::default(),
            steps_per_frame: 5,
        }
    }
}

impl AppConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_mnist_test_set() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.dataset.labels.path, PathBuf::from(LABEL_FILE_NAME));
        assert_eq!(cfg.dataset.images.magic, IMAGE_MAGIC);
        assert_eq!(cfg.dataset.label_magic(), Some(LABEL_MAGIC));
        assert_eq!(cfg.umap.n_neighbors, 15);
    }

    #[test]
    fn json_overrides_keep_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "dataset": { "validate_magic": false, "limit": 500 },
                "umap": { "n_neighbors": 8, "seed": 7 },
                "steps_per_frame": 20
            }"#,
        )
        .unwrap();

        let cfg = AppConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.dataset.limit, Some(500));
        assert_eq!(cfg.dataset.label_magic(), None);
        assert_eq!(cfg.dataset.images.path, PathBuf::from(IMAGE_FILE_NAME));
        assert_eq!(cfg.umap.n_neighbors, 8);
        assert_eq!(cfg.umap.seed, 7);
        assert_eq!(cfg.umap.learning_rate, UmapConfig::default().learning_rate);
        assert_eq!(cfg.steps_per_frame, 20);
    }

    #[test]
    fn malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::from_json_file(&path).is_err());
    }
}
