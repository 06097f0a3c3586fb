use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – label filter widgets
// ---------------------------------------------------------------------------

/// Render the left label panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Labels");
    ui.separator();

    let Some(color_map) = state.color_map.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (label, color) in color_map.legend_entries() {
                let count = state.label_counts.get(&label).copied().unwrap_or(0);
                let mut checked = state.filters.contains(&label);
                let rich = RichText::new(format!("{label}  ({count})")).color(color);
                if ui.checkbox(&mut checked, rich).changed() {
                    state.toggle_label(label);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                open_dataset_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.embedding.is_some(), egui::Button::new("Export embedding…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} samples ({}×{}), {} visible",
                ds.len(),
                ds.shape.0,
                ds.shape.1,
                state.visible_indices.len()
            ));
        }

        if let Some(progress) = state.progress() {
            ui.separator();
            ui.add(
                egui::ProgressBar::new(progress)
                    .desired_width(200.0)
                    .text(format!("Embedding {:.0}%", progress * 100.0)),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog(state: &mut AppState) {
    let Some(labels) = rfd::FileDialog::new()
        .set_title("Open IDX label file")
        .add_filter("Gzip IDX", &["gz"])
        .pick_file()
    else {
        return;
    };
    let Some(images) = rfd::FileDialog::new()
        .set_title("Open IDX image file")
        .add_filter("Gzip IDX", &["gz"])
        .pick_file()
    else {
        return;
    };

    state.load(labels, images);
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export embedding")
        .add_filter("Supported files", &["csv", "json", "parquet", "png"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet"])
        .add_filter("PNG image", &["png"])
        .save_file();

    if let Some(path) = file {
        state.export(&path);
    }
}
