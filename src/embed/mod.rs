/// Embedding layer: the staged reduction-engine contract and its driver.
///
/// ```text
///   FeatureMatrix
///        │
///        ▼
///   ┌──────────────┐  initialize ─► step × N ─► embedding
///   │ orchestrator │ ─────────────────────────────────────► ReductionEngine
///   └──────────────┘
///        │
///        ▼
///   Embedding (one [x, y] per row, input order)
/// ```
pub mod orchestrator;
pub mod umap;

use crate::data::model::{Embedding, FeatureMatrix};

/// Failures raised by a reduction engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no feature vectors to embed")]
    EmptyInput,

    #[error("need at least 2 feature vectors, got {0}")]
    TooFewPoints(usize),

    #[error("non-finite value in row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    #[error("step called before initialize")]
    NotInitialized,

    #[error("all {0} steps have already been run")]
    Exhausted(usize),

    #[error("layout diverged at step {epoch}")]
    Diverged { epoch: usize },

    #[error("{0}")]
    Engine(String),
}

/// A dimensionality-reduction engine driven in explicit stages.
///
/// Callers run [`initialize`](Self::initialize) once, then
/// [`step`](Self::step) exactly as many times as it returned, then read
/// [`embedding`](Self::embedding) once.
pub trait ReductionEngine {
    /// Prepare for `features` and return the number of steps to run.
    fn initialize(&mut self, features: &FeatureMatrix) -> Result<usize, EngineError>;

    /// Advance the layout by one iteration.
    fn step(&mut self) -> Result<(), EngineError>;

    /// Current 2D coordinate of every input row, in input order.
    fn embedding(&self) -> Embedding;
}
