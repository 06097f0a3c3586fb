use std::collections::BTreeSet;

use super::model::{Dataset, LabelValue};

// ---------------------------------------------------------------------------
// Filter predicate: which labels are visible
// ---------------------------------------------------------------------------

/// Set of labels currently shown. An empty set hides everything.
pub type FilterState = BTreeSet<LabelValue>;

/// Initialise a [`FilterState`] with every label selected (i.e., show everything).
pub fn init_filter_state(dataset: &Dataset) -> FilterState {
    dataset.unique_labels()
}

/// Return indices of samples whose label is selected.
pub fn filtered_indices(labels: &[f32], selected: &FilterState) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, &label)| selected.contains(&LabelValue(label)))
        .map(|(i, _)| i)
        .collect()
}
