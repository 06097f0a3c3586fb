use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::LabelValue;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            // Hues span red → magenta only.
            let hue = (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: label → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct labels of a dataset to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<LabelValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the sorted unique labels.
    pub fn new(labels: &BTreeSet<LabelValue>) -> Self {
        let palette = generate_palette(labels.len());
        let mapping: BTreeMap<LabelValue, Color32> = labels
            .iter()
            .zip(palette)
            .map(|(&label, c)| (label, c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: LabelValue) -> Color32 {
        self.mapping
            .get(&label)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → colour), sorted by label.
    pub fn legend_entries(&self) -> Vec<(LabelValue, Color32)> {
        self.mapping.iter().map(|(&label, &c)| (label, c)).collect()
    }
}
