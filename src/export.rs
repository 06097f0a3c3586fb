use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float32Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use image::{ImageFormat, Rgb, RgbImage};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use crate::color::ColorMap;
use crate::data::model::{Embedding, LabelValue};

/// Side length of the rendered PNG scatter plot.
const PNG_SIZE: u32 = 800;
const PNG_MARGIN: f32 = 20.0;

/// One exported point.
#[derive(Debug, Serialize)]
struct EmbeddingRecord {
    index: usize,
    x: f32,
    y: f32,
    label: f32,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write an embedding with its labels to a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – `index,x,y,label`
/// * `.json`    – `[{ "index": 0, "x": .., "y": .., "label": .. }, ...]`
/// * `.parquet` – columns `index`, `x`, `y`, `label`
/// * `.png`     – 800×800 scatter plot coloured by label
pub fn write_embedding(path: &Path, embedding: &Embedding, labels: &[f32]) -> Result<()> {
    if embedding.len() != labels.len() {
        bail!(
            "embedding has {} points but there are {} labels",
            embedding.len(),
            labels.len()
        );
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => write_csv(path, embedding, labels),
        "json" => write_json(path, embedding, labels),
        "parquet" | "pq" => write_parquet(path, embedding, labels),
        "png" => write_png(path, embedding, labels),
        other => bail!("Unsupported export extension: .{other}"),
    }?;

    log::info!("Wrote {} points to {}", embedding.len(), path.display());
    Ok(())
}

fn records<'a>(embedding: &'a Embedding, labels: &'a [f32]) -> impl Iterator<Item = EmbeddingRecord> + 'a {
    embedding
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (&[x, y], &label))| EmbeddingRecord { index, x, y, label })
}

// ---------------------------------------------------------------------------
// Tabular writers
// ---------------------------------------------------------------------------

fn write_csv(path: &Path, embedding: &Embedding, labels: &[f32]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for record in records(embedding, labels) {
        writer.serialize(record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_json(path: &Path, embedding: &Embedding, labels: &[f32]) -> Result<()> {
    let rows: Vec<EmbeddingRecord> = records(embedding, labels).collect();
    let file = std::fs::File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &rows).context("writing JSON")?;
    Ok(())
}

fn write_parquet(path: &Path, embedding: &Embedding, labels: &[f32]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("index", DataType::UInt32, false),
        Field::new("x", DataType::Float32, false),
        Field::new("y", DataType::Float32, false),
        Field::new("label", DataType::Float32, false),
    ]));

    let index = UInt32Array::from((0..embedding.len() as u32).collect::<Vec<_>>());
    let x = Float32Array::from(embedding.iter().map(|p| p[0]).collect::<Vec<_>>());
    let y = Float32Array::from(embedding.iter().map(|p| p[1]).collect::<Vec<_>>());
    let label = Float32Array::from(labels.to_vec());

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(index), Arc::new(x), Arc::new(y), Arc::new(label)],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// PNG scatter plot
// ---------------------------------------------------------------------------

fn write_png(path: &Path, embedding: &Embedding, labels: &[f32]) -> Result<()> {
    let image = render_scatter(embedding, labels);
    image
        .save_with_format(path, ImageFormat::Png)
        .context("writing PNG")?;
    Ok(())
}

/// Rasterise the embedding onto a white square, one colour per label.
fn render_scatter(embedding: &Embedding, labels: &[f32]) -> RgbImage {
    let mut image = RgbImage::from_pixel(PNG_SIZE, PNG_SIZE, Rgb([255, 255, 255]));
    if embedding.is_empty() {
        return image;
    }

    let unique: BTreeSet<LabelValue> = labels.iter().map(|&l| LabelValue(l)).collect();
    let color_map = ColorMap::new(&unique);

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for &[x, y] in embedding {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(f32::EPSILON);
    let scale = (PNG_SIZE as f32 - 2.0 * PNG_MARGIN) / span;

    for (&[x, y], &label) in embedding.iter().zip(labels) {
        let c = color_map.color_for(LabelValue(label));
        let px = (PNG_MARGIN + (x - min_x) * scale) as u32;
        // Image rows grow downwards.
        let py = (PNG_SIZE as f32 - PNG_MARGIN - (y - min_y) * scale) as u32;
        for dx in 0..2 {
            for dy in 0..2 {
                let (ix, iy) = (px + dx, py + dy);
                if ix < PNG_SIZE && iy < PNG_SIZE {
                    image.put_pixel(ix, iy, Rgb([c.r(), c.g(), c.b()]));
                }
            }
        }
    }
    image
}
