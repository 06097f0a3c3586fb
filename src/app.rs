use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyUmapApp {
    pub state: AppState,
}

impl RustyUmapApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for RustyUmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: label filters ----
        egui::SidePanel::left("label_panel")
            .default_width(180.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: scatter plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::embedding_plot(ui, &self.state);
        });

        // Keep stepping the engine while a run is active; the frame after the
        // last step shows the finished embedding.
        if self.state.run.is_some() {
            self.state.tick();
            ctx.request_repaint();
        }
    }
}
