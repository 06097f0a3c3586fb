//! Writes a synthetic MNIST-shaped dataset (gzip IDX label + image files) so
//! the viewer can be tried without the real archives.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const LABEL_MAGIC: u32 = 2049;
const IMAGE_MAGIC: u32 = 2051;
const SIDE: usize = 28;
const CLASSES: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "generate_sample", about = "Write a synthetic gzip IDX dataset")]
struct Args {
    /// Directory receiving the label and image archives
    #[arg(default_value = ".")]
    output_dir: PathBuf,

    /// Number of samples to generate
    #[arg(default_value_t = 2000)]
    samples: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Noise sources shared by every generated image.
struct Jitter {
    centre: Normal<f64>,
    width: Normal<f64>,
    pixel: Normal<f64>,
}

impl Jitter {
    fn new() -> Result<Self> {
        Ok(Self {
            centre: Normal::new(0.0, 0.8).context("centre jitter")?,
            width: Normal::new(0.0, 0.3).context("width jitter")?,
            pixel: Normal::new(0.0, 6.0).context("pixel noise")?,
        })
    }
}

/// One 28×28 image: a blob whose position depends on the class, plus noise.
fn generate_image(class: usize, jitter: &Jitter, rng: &mut StdRng) -> Vec<u8> {
    let angle = class as f64 / CLASSES as f64 * 2.0 * std::f64::consts::PI;
    let cx = 13.5 + 8.0 * angle.cos() + jitter.centre.sample(rng);
    let cy = 13.5 + 8.0 * angle.sin() + jitter.centre.sample(rng);
    let sigma = 3.0 + jitter.width.sample(rng).abs();

    let mut pixels = Vec::with_capacity(SIDE * SIDE);
    for row in 0..SIDE {
        for col in 0..SIDE {
            let v = gaussian(col as f64, cx, sigma, 1.0) * gaussian(row as f64, cy, sigma, 255.0)
                + jitter.pixel.sample(rng);
            pixels.push(v.clamp(0.0, 255.0) as u8);
        }
    }
    pixels
}

fn write_gz(path: &Path, header: &[u32], payload: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut enc = GzEncoder::new(file, Compression::default());
    for field in header {
        enc.write_all(&field.to_be_bytes()).context("writing header")?;
    }
    enc.write_all(payload).context("writing payload")?;
    enc.finish().context("finishing gzip stream")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let samples = args.samples;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let jitter = Jitter::new()?;
    let mut labels = Vec::with_capacity(samples);
    let mut images = Vec::with_capacity(samples * SIDE * SIDE);
    for _ in 0..samples {
        let class = rng.gen_range(0..CLASSES);
        labels.push(class as u8);
        images.extend(generate_image(class, &jitter, &mut rng));
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let label_path = args.output_dir.join("t10k-labels-idx1-ubyte.gz");
    let image_path = args.output_dir.join("t10k-images-idx3-ubyte.gz");
    write_gz(&label_path, &[LABEL_MAGIC, samples as u32], &labels)?;
    write_gz(
        &image_path,
        &[IMAGE_MAGIC, samples as u32, SIDE as u32, SIDE as u32],
        &images,
    )?;

    println!(
        "Wrote {samples} samples ({SIDE}x{SIDE}) to {} and {}",
        label_path.display(),
        image_path.display()
    );
    Ok(())
}
