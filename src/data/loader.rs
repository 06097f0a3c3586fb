use crate::config::DatasetConfig;
use crate::error::{PipelineError, Result};

use super::archive;
use super::idx::{parse_images, parse_labels};
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode and parse the label and image archives named by `config`.
///
/// Fails with [`PipelineError::RecordCountMismatch`] if the two streams do not
/// hold the same number of records.
pub fn load_dataset(config: &DatasetConfig) -> Result<Dataset> {
    let label_bytes = archive::decode(&config.labels.path)?;
    let image_bytes = archive::decode(&config.images.path)?;
    let dataset = from_streams(&label_bytes, &image_bytes, config)?;

    log::info!(
        "Loaded {} samples of {}x{} pixels from {} and {}",
        dataset.len(),
        dataset.shape.0,
        dataset.shape.1,
        config.labels.path.display(),
        config.images.path.display()
    );
    Ok(dataset)
}

/// Parse already-inflated label and image streams into an aligned dataset.
pub fn from_streams(label_bytes: &[u8], image_bytes: &[u8], config: &DatasetConfig) -> Result<Dataset> {
    let mut labels = parse_labels(label_bytes, config.label_magic())?;
    let (header, mut features) = parse_images(image_bytes, config.image_magic())?;
    log::debug!("Image stream header: {header:?}");

    if labels.len() != features.len() {
        return Err(PipelineError::RecordCountMismatch {
            labels: labels.len(),
            images: features.len(),
        });
    }

    if let Some(limit) = config.limit {
        if limit < labels.len() {
            log::debug!("Limiting dataset to the first {limit} of {} records", labels.len());
            labels.truncate(limit);
            features.truncate(limit);
        }
    }

    Ok(Dataset {
        labels,
        features,
        shape: (header.rows, header.cols),
    })
}
