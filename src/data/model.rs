use std::fmt;

// ---------------------------------------------------------------------------
// LabelValue – a label usable as an ordered key
// ---------------------------------------------------------------------------

/// A label promoted to `f32`, wrapped so it can live in `BTreeMap` / `BTreeSet`.
#[derive(Debug, Clone, Copy)]
pub struct LabelValue(pub f32);

// -- Manual Eq/Ord via total ordering of the float bits --

impl PartialEq for LabelValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for LabelValue {}

impl PartialOrd for LabelValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for LabelValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureMatrix – one feature vector per record, stored contiguously
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f32>,
    dim: usize,
}

impl FeatureMatrix {
    /// Wrap a flat buffer of `values.len() / dim` rows.
    ///
    /// Panics if the buffer is not a whole number of rows.
    pub fn from_flat(values: Vec<f32>, dim: usize) -> Self {
        assert!(
            dim == 0 && values.is_empty() || dim > 0 && values.len() % dim == 0,
            "flat buffer of {} values is not a multiple of row length {dim}",
            values.len()
        );
        Self { values, dim }
    }

    #[cfg(test)]
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            assert_eq!(row.len(), dim, "ragged feature rows");
            values.extend_from_slice(row);
        }
        Self { values, dim }
    }

    /// Number of feature vectors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.values.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0; an empty matrix yields nothing either way.
        self.values.chunks_exact(self.dim.max(1))
    }

    /// Keep only the first `n` rows.
    pub fn truncate(&mut self, n: usize) {
        self.values.truncate(n * self.dim);
    }

    #[cfg(test)]
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

// ---------------------------------------------------------------------------
// Dataset – labels and images, index-aligned
// ---------------------------------------------------------------------------

/// A 2D coordinate per input vector, in input order.
pub type Embedding = Vec<[f32; 2]>;

/// Labels and feature vectors of the same records, in file order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub labels: Vec<f32>,
    pub features: FeatureMatrix,
    /// Image shape as (rows, columns).
    pub shape: (usize, usize),
}

impl Dataset {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sorted distinct labels.
    pub fn unique_labels(&self) -> std::collections::BTreeSet<LabelValue> {
        self.labels.iter().map(|&l| LabelValue(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_display_drops_fraction_for_integral_values() {
        assert_eq!(LabelValue(7.0).to_string(), "7");
        assert_eq!(LabelValue(2.5).to_string(), "2.5");
    }

    #[test]
    fn feature_rows_follow_flat_order() {
        let m = FeatureMatrix::from_flat((1..=6).map(|v| v as f32).collect(), 3);
        assert_eq!(m.len(), 2);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn empty_matrix_has_no_rows() {
        let m = FeatureMatrix::from_flat(Vec::new(), 0);
        assert!(m.is_empty());
        assert_eq!(m.rows().count(), 0);
    }

    #[test]
    fn unique_labels_are_sorted() {
        let ds = Dataset {
            labels: vec![3.0, 1.0, 3.0, 0.0],
            features: FeatureMatrix::from_flat(vec![0.0; 4], 1),
            shape: (1, 1),
        };
        let uniq: Vec<String> = ds.unique_labels().iter().map(|l| l.to_string()).collect();
        assert_eq!(uniq, vec!["0", "1", "3"]);
    }
}
