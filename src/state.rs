use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::color::ColorMap;
use crate::config::AppConfig;
use crate::data::filter::{filtered_indices, init_filter_state, FilterState};
use crate::data::loader::load_dataset;
use crate::data::model::{Dataset, Embedding, LabelValue};
use crate::embed::orchestrator::StagedRun;
use crate::embed::umap::Umap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded dataset (None until the user opens one).
    pub dataset: Option<Dataset>,

    /// Embedding in progress, advanced a few steps per frame.
    pub run: Option<StagedRun<Umap>>,

    /// Finished embedding, index-aligned with `dataset`.
    pub embedding: Option<Embedding>,

    /// Labels currently shown.
    pub filters: FilterState,

    /// Indices of samples passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Colour per label.
    pub color_map: Option<ColorMap>,

    /// Number of samples per label, counted once on load.
    pub label_counts: BTreeMap<LabelValue, usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            dataset: None,
            run: None,
            embedding: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            color_map: None,
            label_counts: BTreeMap::new(),
            status_message: None,
        }
    }

    /// Decode, parse and start embedding the given label/image archives.
    pub fn load(&mut self, labels: PathBuf, images: PathBuf) {
        self.config.dataset.labels.path = labels;
        self.config.dataset.images.path = images;

        match load_dataset(&self.config.dataset) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise filters and colour, and
    /// initialize the embedding engine on it.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.filters = init_filter_state(&dataset);
        self.color_map = Some(ColorMap::new(&dataset.unique_labels()));
        self.label_counts = BTreeMap::new();
        for &label in &dataset.labels {
            *self.label_counts.entry(LabelValue(label)).or_default() += 1;
        }
        self.embedding = None;
        self.status_message = None;
        self.refilter_labels(&dataset.labels);

        let engine = Umap::new(self.config.umap.clone());
        self.run = match StagedRun::start(engine, &dataset.features) {
            Ok(run) => Some(run),
            Err(e) => {
                log::error!("Failed to initialize embedding: {e}");
                self.status_message = Some(format!("Error: {e}"));
                None
            }
        };
        self.dataset = Some(dataset);
    }

    /// Advance the running embedding by one frame's worth of steps.
    /// Returns `true` while more steps remain.
    pub fn tick(&mut self) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };

        if let Err(e) = run.advance_by(self.config.steps_per_frame.max(1)) {
            log::error!("Embedding failed: {e}");
            self.status_message = Some(format!("Error: {e}"));
            self.run = None;
            return false;
        }
        if !run.is_complete() {
            return true;
        }

        if let Some(run) = self.run.take() {
            match run.finish() {
                Ok(embedding) => {
                    log::info!("Embedding finished ({} points)", embedding.len());
                    self.embedding = Some(embedding);
                }
                Err(e) => {
                    log::error!("Embedding failed: {e}");
                    self.status_message = Some(format!("Error: {e}"));
                }
            }
        }
        false
    }

    /// Fraction of embedding steps done, if a run is active.
    pub fn progress(&self) -> Option<f32> {
        self.run.as_ref().map(StagedRun::progress)
    }

    fn refilter_labels(&mut self, labels: &[f32]) {
        self.visible_indices = filtered_indices(labels, &self.filters);
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(&ds.labels, &self.filters);
        }
    }

    /// Toggle visibility of a single label.
    pub fn toggle_label(&mut self, label: LabelValue) {
        if !self.filters.remove(&label) {
            self.filters.insert(label);
        }
        self.refilter();
    }

    pub fn select_all(&mut self) {
        if let Some(ds) = &self.dataset {
            self.filters = ds.unique_labels();
            self.refilter();
        }
    }

    pub fn select_none(&mut self) {
        self.filters.clear();
        self.refilter();
    }

    /// Write the finished embedding to `path`.
    pub fn export(&mut self, path: &Path) {
        let (Some(ds), Some(embedding)) = (&self.dataset, &self.embedding) else {
            self.status_message = Some("Nothing to export yet".to_string());
            return;
        };
        if let Err(e) = crate::export::write_embedding(path, embedding, &ds.labels) {
            log::error!("Export failed: {e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FeatureMatrix;

    fn tiny_dataset() -> Dataset {
        let rows: Vec<Vec<f32>> = (0..6).map(|i| vec![(i / 3) as f32 * 50.0 + i as f32, 1.0]).collect();
        Dataset {
            labels: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            features: FeatureMatrix::from_rows(&rows),
            shape: (1, 2),
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.umap.n_epochs = Some(10);
        config.steps_per_frame = 4;
        config
    }

    #[test]
    fn ticks_until_embedding_is_ready() {
        let mut state = AppState::new(config());
        state.set_dataset(tiny_dataset());
        assert_eq!(state.visible_indices.len(), 6);

        assert!(state.tick());
        assert_eq!(state.progress(), Some(0.4));
        assert!(state.tick());
        assert!(!state.tick());

        assert!(state.run.is_none());
        assert_eq!(state.embedding.as_ref().map(Vec::len), Some(6));
        assert!(!state.tick());
    }

    #[test]
    fn label_filters_update_visible_indices() {
        let mut state = AppState::new(config());
        state.set_dataset(tiny_dataset());

        assert_eq!(state.label_counts.get(&LabelValue(1.0)), Some(&3));
        state.toggle_label(LabelValue(0.0));
        assert_eq!(state.visible_indices, vec![3, 4, 5]);
        state.select_none();
        assert!(state.visible_indices.is_empty());
        state.select_all();
        assert_eq!(state.visible_indices.len(), 6);
    }

    #[test]
    fn degenerate_dataset_reports_error() {
        let mut state = AppState::new(config());
        state.set_dataset(Dataset {
            labels: vec![3.0],
            features: FeatureMatrix::from_rows(&[vec![1.0]]),
            shape: (1, 1),
        });
        assert!(state.run.is_none());
        assert!(state.status_message.is_some());
    }

    #[test]
    fn missing_files_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(config());
        state.load(dir.path().join("l.gz"), dir.path().join("i.gz"));
        assert!(state.dataset.is_none());
        assert!(state.status_message.as_deref().unwrap_or("").starts_with("Error"));
    }
}
