use std::collections::BTreeMap;

use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Plot, PlotPoints, Points};

use crate::data::model::LabelValue;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Embedding scatter plot (central panel)
// ---------------------------------------------------------------------------

/// Render the embedding scatter plot in the central panel.
pub fn embedding_plot(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an IDX dataset to embed it  (File → Open dataset…)");
        });
        return;
    };

    if dataset.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("The dataset holds no records.");
        });
        return;
    }

    let Some(embedding) = &state.embedding else {
        ui.centered_and_justified(|ui: &mut Ui| {
            match state.progress() {
                Some(p) => ui.heading(format!("Embedding {} samples… {:.0}%", dataset.len(), p * 100.0)),
                None => ui.heading("No embedding available."),
            };
        });
        return;
    };

    // One series per label so each gets a legend entry.
    let mut series: BTreeMap<LabelValue, Vec<[f64; 2]>> = BTreeMap::new();
    for &idx in &state.visible_indices {
        let [x, y] = embedding[idx];
        series
            .entry(LabelValue(dataset.labels[idx]))
            .or_default()
            .push([f64::from(x), f64::from(y)]);
    }

    ui.heading("MNIST embedded via UMAP");
    Plot::new("embedding_plot")
        .legend(Legend::default())
        .x_axis_label("X")
        .y_axis_label("Y")
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (label, coords) in series {
                let color = state
                    .color_map
                    .as_ref()
                    .map(|cm| cm.color_for(label))
                    .unwrap_or(Color32::LIGHT_BLUE);

                let points = Points::new(coords.into_iter().collect::<PlotPoints>())
                    .name(label.to_string())
                    .color(color)
                    .radius(1.5);

                plot_ui.points(points);
            }
        });
}
