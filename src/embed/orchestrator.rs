use crate::data::model::{Embedding, FeatureMatrix};
use crate::error::{PipelineError, Result};

use super::ReductionEngine;

// ---------------------------------------------------------------------------
// StagedRun – the initialize → step × N → embedding protocol as a value
// ---------------------------------------------------------------------------

/// An engine that has been initialized and is being stepped.
///
/// `finish` consumes the run, so the embedding is read exactly once.
pub struct StagedRun<E> {
    engine: E,
    rows: usize,
    total: usize,
    completed: usize,
}

impl<E: ReductionEngine> StagedRun<E> {
    /// Initialize `engine` on `features`. Engine failures propagate unchanged.
    pub fn start(mut engine: E, features: &FeatureMatrix) -> Result<Self> {
        let total = engine.initialize(features)?;
        log::debug!("Engine initialized on {} rows, {total} steps to run", features.len());
        Ok(Self {
            engine,
            rows: features.len(),
            total,
            completed: 0,
        })
    }

    pub fn total_steps(&self) -> usize {
        self.total
    }

    pub fn completed_steps(&self) -> usize {
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Fraction of steps run, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }

    /// Run the next step.
    pub fn advance(&mut self) -> Result<()> {
        if self.is_complete() {
            return Err(PipelineError::ProtocolViolation(
                "advance called after the last step",
            ));
        }
        self.engine.step()?;
        self.completed += 1;
        Ok(())
    }

    /// Run up to `max` steps; returns how many ran.
    pub fn advance_by(&mut self, max: usize) -> Result<usize> {
        let n = max.min(self.total - self.completed);
        for _ in 0..n {
            self.advance()?;
        }
        Ok(n)
    }

    /// Read the final embedding.
    pub fn finish(self) -> Result<Embedding> {
        if !self.is_complete() {
            return Err(PipelineError::ProtocolViolation(
                "finish called before all steps ran",
            ));
        }
        let embedding = self.engine.embedding();
        if embedding.len() != self.rows {
            return Err(super::EngineError::Engine(format!(
                "engine returned {} coordinates for {} rows",
                embedding.len(),
                self.rows
            ))
            .into());
        }
        Ok(embedding)
    }
}

// ---------------------------------------------------------------------------
// One-shot drivers
// ---------------------------------------------------------------------------

/// Drive `engine` through the full protocol on `features`.
pub fn run<E: ReductionEngine>(engine: E, features: &FeatureMatrix) -> Result<Embedding> {
    run_with_progress(engine, features, |done, total| {
        if total >= 10 && done % (total / 10) == 0 {
            log::info!("Embedding step {done}/{total}");
        }
    })
}

/// Like [`run`], reporting `(completed, total)` after every step.
pub fn run_with_progress<E, F>(engine: E, features: &FeatureMatrix, mut on_step: F) -> Result<Embedding>
where
    E: ReductionEngine,
    F: FnMut(usize, usize),
{
    let mut staged = StagedRun::start(engine, features)?;
    while !staged.is_complete() {
        staged.advance()?;
        on_step(staged.completed_steps(), staged.total_steps());
    }
    staged.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::EngineError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Initialize(usize),
        Step,
        Embedding,
    }

    /// Stub engine that records every call and asserts protocol order.
    struct RecordingEngine {
        calls: Rc<RefCell<Vec<Call>>>,
        steps: usize,
        rows: Vec<Vec<f32>>,
        reject: Option<EngineError>,
    }

    impl RecordingEngine {
        fn new(steps: usize) -> (Self, Rc<RefCell<Vec<Call>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            let engine = Self {
                calls: Rc::clone(&calls),
                steps,
                rows: Vec::new(),
                reject: None,
            };
            (engine, calls)
        }

        fn rejecting(error: EngineError) -> (Self, Rc<RefCell<Vec<Call>>>) {
            let (mut engine, calls) = Self::new(3);
            engine.reject = Some(error);
            (engine, calls)
        }
    }

    impl ReductionEngine for RecordingEngine {
        fn initialize(&mut self, features: &FeatureMatrix) -> std::result::Result<usize, EngineError> {
            assert!(self.calls.borrow().is_empty(), "initialize must come first");
            self.calls.borrow_mut().push(Call::Initialize(features.len()));
            if let Some(error) = self.reject.take() {
                return Err(error);
            }
            self.rows = features.to_rows();
            Ok(self.steps)
        }

        fn step(&mut self) -> std::result::Result<(), EngineError> {
            let calls = self.calls.borrow();
            assert!(matches!(calls.first(), Some(Call::Initialize(_))), "step before initialize");
            assert!(!calls.contains(&Call::Embedding), "step after embedding");
            let stepped = calls.iter().filter(|c| **c == Call::Step).count();
            assert!(stepped < self.steps, "too many steps");
            drop(calls);
            self.calls.borrow_mut().push(Call::Step);
            Ok(())
        }

        fn embedding(&self) -> Embedding {
            // Coordinates echo the first two features so alignment is checkable.
            self.calls.borrow_mut().push(Call::Embedding);
            self.rows.iter().map(|r| [r[0], r[1]]).collect()
        }
    }

    struct FailingEngine {
        fail_at: usize,
        stepped: usize,
    }

    impl ReductionEngine for FailingEngine {
        fn initialize(&mut self, _features: &FeatureMatrix) -> std::result::Result<usize, EngineError> {
            Ok(10)
        }

        fn step(&mut self) -> std::result::Result<(), EngineError> {
            if self.stepped == self.fail_at {
                return Err(EngineError::Diverged { epoch: self.stepped });
            }
            self.stepped += 1;
            Ok(())
        }

        fn embedding(&self) -> Embedding {
            unreachable!("embedding must not be read after a failed step")
        }
    }

    fn features(n: usize) -> FeatureMatrix {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 10.0 * i as f32, 0.5]).collect();
        FeatureMatrix::from_rows(&rows)
    }

    #[test]
    fn calls_follow_protocol_order() {
        let (engine, calls) = RecordingEngine::new(4);
        run(engine, &features(3)).unwrap();

        let mut expected = vec![Call::Initialize(3)];
        expected.extend(std::iter::repeat(Call::Step).take(4));
        expected.push(Call::Embedding);
        assert_eq!(*calls.borrow(), expected);
    }

    #[test]
    fn zero_steps_goes_straight_to_embedding() {
        let (engine, calls) = RecordingEngine::new(0);
        run(engine, &features(2)).unwrap();
        assert_eq!(*calls.borrow(), vec![Call::Initialize(2), Call::Embedding]);
    }

    #[test]
    fn embedding_is_index_aligned_with_input() {
        let feats = features(5);
        let labels: Vec<f32> = (0..5).map(|i| (i % 3) as f32).collect();
        let (engine, _) = RecordingEngine::new(7);

        let embedding = run(engine, &feats).unwrap();
        assert_eq!(embedding.len(), 5);
        assert_eq!(embedding.len(), labels.len());
        for (i, point) in embedding.iter().enumerate() {
            assert_eq!(point, &[feats.row(i)[0], feats.row(i)[1]]);
        }
    }

    #[test]
    fn progress_is_reported_per_step() {
        let (engine, _) = RecordingEngine::new(3);
        let mut seen = Vec::new();
        run_with_progress(engine, &features(2), |done, total| seen.push((done, total))).unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn engine_failure_propagates_without_retry() {
        let engine = FailingEngine { fail_at: 3, stepped: 0 };
        let err = run(engine, &features(2)).unwrap_err();
        assert!(
            matches!(err, PipelineError::EmbeddingComputation(EngineError::Diverged { epoch: 3 })),
            "{err:?}"
        );
    }

    #[test]
    fn initialize_failure_propagates_before_any_step() {
        let (engine, calls) = RecordingEngine::rejecting(EngineError::EmptyInput);
        let err = run(engine, &features(0)).unwrap_err();
        assert!(
            matches!(err, PipelineError::EmbeddingComputation(EngineError::EmptyInput)),
            "{err:?}"
        );
        assert_eq!(*calls.borrow(), vec![Call::Initialize(0)]);

        let (engine, calls) = RecordingEngine::rejecting(EngineError::TooFewPoints(1));
        assert!(matches!(
            StagedRun::start(engine, &features(1)),
            Err(PipelineError::EmbeddingComputation(EngineError::TooFewPoints(1)))
        ));
        assert_eq!(*calls.borrow(), vec![Call::Initialize(1)]);
    }

    #[test]
    fn staged_run_paces_steps_and_rejects_misuse() {
        let (engine, calls) = RecordingEngine::new(5);
        let mut staged = StagedRun::start(engine, &features(2)).unwrap();

        assert_eq!(staged.advance_by(2).unwrap(), 2);
        assert_eq!(staged.progress(), 0.4);
        assert_eq!(staged.advance_by(100).unwrap(), 3);
        assert!(staged.is_complete());
        assert!(matches!(
            staged.advance(),
            Err(PipelineError::ProtocolViolation(_))
        ));

        staged.finish().unwrap();
        assert_eq!(calls.borrow().len(), 1 + 5 + 1);
    }

    #[test]
    fn finishing_early_is_a_protocol_violation() {
        let (engine, calls) = RecordingEngine::new(5);
        let mut staged = StagedRun::start(engine, &features(2)).unwrap();
        staged.advance().unwrap();

        assert!(matches!(
            staged.finish(),
            Err(PipelineError::ProtocolViolation(_))
        ));
        assert!(!calls.borrow().contains(&Call::Embedding));
    }

    #[test]
    fn misaligned_engine_output_is_rejected() {
        struct ShortEngine;
        impl ReductionEngine for ShortEngine {
            fn initialize(&mut self, _: &FeatureMatrix) -> std::result::Result<usize, EngineError> {
                Ok(0)
            }
            fn step(&mut self) -> std::result::Result<(), EngineError> {
                Ok(())
            }
            fn embedding(&self) -> Embedding {
                vec![[0.0, 0.0]]
            }
        }

        let err = run(ShortEngine, &features(3)).unwrap_err();
        assert!(matches!(err, PipelineError::EmbeddingComputation(_)), "{err:?}");
    }
}
