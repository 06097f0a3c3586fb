//! A compact native UMAP.
//!
//! `initialize` builds an exact k-nearest-neighbour graph, turns it into a
//! fuzzy simplicial set and seeds a random layout; every `step` is one epoch
//! of stochastic gradient descent with negative sampling.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;

use crate::data::model::{Embedding, FeatureMatrix};

use super::{EngineError, ReductionEngine};

const SMOOTH_K_TOLERANCE: f32 = 1e-5;
const MIN_K_DIST_SCALE: f32 = 1e-3;
const BANDWIDTH_ITERATIONS: usize = 64;
const GRADIENT_CLIP: f32 = 4.0;
const INIT_RANGE: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UmapConfig {
    pub n_neighbors: usize,
    /// Number of epochs; `None` picks 500 for ≤ 10 000 points, else 200.
    pub n_epochs: Option<usize>,
    pub learning_rate: f32,
    pub negative_sample_rate: usize,
    /// Curve parameters of the low-dimensional similarity `1 / (1 + a·d^2b)`.
    pub a: f32,
    pub b: f32,
    pub seed: u64,
}

impl Default for UmapConfig {
    fn default() -> Self {
        // a, b fitted for min_dist = 0.1, spread = 1.0
        Self {
            n_neighbors: 15,
            n_epochs: None,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            a: 1.576_943_5,
            b: 0.895_060_9,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph construction
// ---------------------------------------------------------------------------

/// Indices and distances of the `k` nearest neighbours of every row (self excluded).
fn nearest_neighbors(features: &FeatureMatrix, k: usize) -> Vec<Vec<(usize, f32)>> {
    let n = features.len();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let row = features.row(i);
            let mut dists: Vec<(usize, f32)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let d2: f32 = row
                        .iter()
                        .zip(features.row(j))
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    (j, d2)
                })
                .collect();
            if k < dists.len() {
                dists.select_nth_unstable_by(k, |a, b| a.1.total_cmp(&b.1));
                dists.truncate(k);
            }
            dists.sort_by(|a, b| a.1.total_cmp(&b.1));
            dists.into_iter().map(|(j, d2)| (j, d2.sqrt())).collect()
        })
        .collect()
}

/// Find `rho` (distance to the nearest neighbour) and `sigma` such that the
/// memberships of `dists` sum to `log2(k)`.
fn smooth_knn_dist(dists: &[f32], mean_all: f32) -> (f32, f32) {
    let target = (dists.len() as f32).log2();
    let rho = dists.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);

    let (mut lo, mut hi, mut mid) = (0.0f32, f32::INFINITY, 1.0f32);
    for _ in 0..BANDWIDTH_ITERATIONS {
        let psum: f32 = dists
            .iter()
            .map(|&d| {
                let excess = d - rho;
                if excess > 0.0 {
                    (-excess / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SMOOTH_K_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    let mean_local = dists.iter().sum::<f32>() / dists.len().max(1) as f32;
    let floor = if rho > 0.0 { mean_local } else { mean_all };
    (rho, mid.max(MIN_K_DIST_SCALE * floor))
}

/// Symmetric fuzzy simplicial set as directed edges `(head, tail, weight)`.
fn fuzzy_edges(knn: &[Vec<(usize, f32)>]) -> Vec<(usize, usize, f32)> {
    let total: f32 = knn.iter().flatten().map(|&(_, d)| d).sum();
    let count = knn.iter().map(Vec::len).sum::<usize>().max(1);
    let mean_all = total / count as f32;

    let mut directed: HashMap<(usize, usize), f32> = HashMap::new();
    for (i, neighbors) in knn.iter().enumerate() {
        let dists: Vec<f32> = neighbors.iter().map(|&(_, d)| d).collect();
        let (rho, sigma) = smooth_knn_dist(&dists, mean_all);
        for &(j, d) in neighbors {
            let w = if d - rho <= 0.0 { 1.0 } else { (-(d - rho) / sigma).exp() };
            directed.insert((i, j), w);
        }
    }

    // Fuzzy union: w = a + b - a·b, emitted in both directions.
    let mut edges: Vec<(usize, usize, f32)> = Vec::with_capacity(directed.len() * 2);
    for (&(i, j), &w_ij) in &directed {
        let w_ji = directed.get(&(j, i)).copied().unwrap_or(0.0);
        let w = w_ij + w_ji - w_ij * w_ji;
        edges.push((i, j, w));
        if !directed.contains_key(&(j, i)) {
            edges.push((j, i, w));
        }
    }
    edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    edges
}

// ---------------------------------------------------------------------------
// Layout state
// ---------------------------------------------------------------------------

struct Layout {
    heads: Vec<usize>,
    tails: Vec<usize>,
    epochs_per_sample: Vec<f32>,
    epoch_of_next_sample: Vec<f32>,
    epochs_per_negative_sample: Vec<f32>,
    epoch_of_next_negative_sample: Vec<f32>,
    n_epochs: usize,
    epoch: usize,
}

/// Staged UMAP engine.
pub struct Umap {
    config: UmapConfig,
    rng: StdRng,
    coords: Embedding,
    layout: Option<Layout>,
}

impl Umap {
    pub fn new(config: UmapConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            coords: Vec::new(),
            layout: None,
        }
    }

    fn default_epochs(n: usize) -> usize {
        if n <= 10_000 {
            500
        } else {
            200
        }
    }
}

fn clip(v: f32) -> f32 {
    v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

impl ReductionEngine for Umap {
    fn initialize(&mut self, features: &FeatureMatrix) -> Result<usize, EngineError> {
        if features.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        let n = features.len();
        if n < 2 {
            return Err(EngineError::TooFewPoints(n));
        }
        for (row, values) in features.rows().enumerate() {
            if let Some(column) = values.iter().position(|v| !v.is_finite()) {
                return Err(EngineError::NonFinite { row, column });
            }
        }

        let k = self.config.n_neighbors.clamp(1, n - 1);
        log::info!("Building {k}-nearest-neighbour graph over {n} points");
        let knn = nearest_neighbors(features, k);
        let edges = fuzzy_edges(&knn);

        let n_epochs = self.config.n_epochs.unwrap_or_else(|| Self::default_epochs(n));
        let max_w = edges.iter().map(|e| e.2).fold(0.0f32, f32::max);
        let threshold = max_w / n_epochs.max(1) as f32;
        let kept: Vec<_> = edges.into_iter().filter(|e| e.2 >= threshold && e.2 > 0.0).collect();
        log::debug!("Fuzzy graph has {} edges after pruning", kept.len());

        let epochs_per_sample: Vec<f32> = kept.iter().map(|e| max_w / e.2).collect();
        let neg_rate = self.config.negative_sample_rate.max(1) as f32;
        let epochs_per_negative_sample: Vec<f32> =
            epochs_per_sample.iter().map(|&e| e / neg_rate).collect();

        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.coords = (0..n)
            .map(|_| {
                [
                    self.rng.gen_range(-INIT_RANGE..INIT_RANGE),
                    self.rng.gen_range(-INIT_RANGE..INIT_RANGE),
                ]
            })
            .collect();

        self.layout = Some(Layout {
            heads: kept.iter().map(|e| e.0).collect(),
            tails: kept.iter().map(|e| e.1).collect(),
            epoch_of_next_sample: epochs_per_sample.clone(),
            epoch_of_next_negative_sample: epochs_per_negative_sample.clone(),
            epochs_per_sample,
            epochs_per_negative_sample,
            n_epochs,
            epoch: 0,
        });
        Ok(n_epochs)
    }

    fn step(&mut self) -> Result<(), EngineError> {
        let layout = self.layout.as_mut().ok_or(EngineError::NotInitialized)?;
        if layout.epoch >= layout.n_epochs {
            return Err(EngineError::Exhausted(layout.n_epochs));
        }

        let (a, b) = (self.config.a, self.config.b);
        let n = self.coords.len();
        let epoch = layout.epoch as f32;
        let alpha = self.config.learning_rate * (1.0 - epoch / layout.n_epochs as f32);

        for e in 0..layout.heads.len() {
            if layout.epoch_of_next_sample[e] > epoch {
                continue;
            }
            let (j, k) = (layout.heads[e], layout.tails[e]);

            let current = self.coords[j];
            let other = self.coords[k];
            let d2 = (current[0] - other[0]).powi(2) + (current[1] - other[1]).powi(2);
            let coeff = if d2 > 0.0 {
                -2.0 * a * b * d2.powf(b - 1.0) / (a * d2.powf(b) + 1.0)
            } else {
                0.0
            };
            for d in 0..2 {
                let grad = clip(coeff * (current[d] - other[d])) * alpha;
                self.coords[j][d] += grad;
                self.coords[k][d] -= grad;
            }
            layout.epoch_of_next_sample[e] += layout.epochs_per_sample[e];

            let n_neg = ((epoch - layout.epoch_of_next_negative_sample[e])
                / layout.epochs_per_negative_sample[e])
                .max(0.0) as usize;
            for _ in 0..n_neg {
                let k = self.rng.gen_range(0..n);
                if k == j {
                    continue;
                }
                let current = self.coords[j];
                let other = self.coords[k];
                let d2 = (current[0] - other[0]).powi(2) + (current[1] - other[1]).powi(2);
                let coeff = if d2 > 0.0 {
                    2.0 * b / ((0.001 + d2) * (a * d2.powf(b) + 1.0))
                } else {
                    0.0
                };
                for d in 0..2 {
                    let grad = if coeff > 0.0 {
                        clip(coeff * (current[d] - other[d]))
                    } else {
                        GRADIENT_CLIP
                    };
                    self.coords[j][d] += grad * alpha;
                }
            }
            layout.epoch_of_next_negative_sample[e] +=
                n_neg as f32 * layout.epochs_per_negative_sample[e];
        }

        layout.epoch += 1;
        if self.coords.iter().flatten().any(|v| !v.is_finite()) {
            return Err(EngineError::Diverged {
                epoch: layout.epoch - 1,
            });
        }
        Ok(())
    }

    fn embedding(&self) -> Embedding {
        self.coords.clone()
    }
}
