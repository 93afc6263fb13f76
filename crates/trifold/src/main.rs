//! trifold: render an image file as a low-poly picture.
//!
//! Reads the input image, runs the pipeline with the thresholds and
//! options given on the command line, writes the rendered image, and
//! prints per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin trifold -- [OPTIONS] <INPUT>
//! ```
//!
//! Set `RUST_LOG=debug` to see the pipeline's own log records.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use trifold_pipeline::{PipelineConfig, Thresholds};

/// Low-poly rendering of raster images.
///
/// Detects edges, triangulates the edge pixels together with a ring of
/// border points, and fills each triangle with the mean colour of the
/// pixels it covers.
#[derive(Parser)]
#[command(name = "trifold", version)]
struct Cli {
    /// Image to render: PNG, JPEG, BMP or WebP.
    input: PathBuf,

    /// Output image path. The format follows the extension.
    /// Defaults to `<input stem>-lowpoly.png` next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Lower (weak-edge) Canny threshold, 0-255.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    lower: u8,

    /// Upper (strong-edge) Canny threshold, 0-255.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD)]
    upper: u8,

    /// Derive both thresholds from the median intensity, ignoring
    /// `--lower` and `--upper`.
    #[arg(long)]
    auto: bool,

    /// Gaussian blur sigma applied before the gradient.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_SIGMA)]
    blur_sigma: f32,

    /// Spacing in pixels between synthetic border points.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BORDER_SPACING, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    border_spacing: u32,

    /// Outline every triangle in this colour, given as `R,G,B`.
    #[arg(long, value_parser = parse_rgb)]
    wireframe: Option<[u8; 3]>,

    /// Complete `PipelineConfig` as JSON. Overrides every other
    /// pipeline flag.
    #[arg(long)]
    config_json: Option<String>,

    /// Print diagnostics as JSON rather than a text table.
    #[arg(long)]
    json: bool,
}

/// Parse an `R,G,B` triple of bytes.
fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got {s:?}"));
    };
    let channel = |c: &str| {
        c.parse::<u8>()
            .map_err(|e| format!("invalid colour channel {c:?}: {e}"))
    };
    Ok([channel(r)?, channel(g)?, channel(b)?])
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags when both are given.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("invalid --config-json: {e}"));
    }

    Ok(PipelineConfig {
        thresholds: Thresholds::from_parts(cli.lower, cli.upper, cli.auto),
        blur_sigma: cli.blur_sigma,
        border_spacing: cli.border_spacing,
        wireframe: cli.wireframe,
    })
}

/// `photo.jpg` -> `photo-lowpoly.png` in the same directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}-lowpoly.png"))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("cannot read {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Rendering {} ({} bytes)", cli.input.display(), image_bytes.len());
    log::debug!("config: {config:?}");

    let staged = match trifold_pipeline::process_bytes(&image_bytes, &config) {
        Ok(staged) => staged,
        Err(e) => {
            eprintln!("trifold: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "{} points, {} triangles",
        staged.points.len(),
        staged.triangles.len(),
    );

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    if let Err(e) = staged.output.save(&output_path) {
        eprintln!("cannot write {}: {e}", output_path.display());
        return ExitCode::FAILURE;
    }
    eprintln!("Wrote {}", output_path.display());

    if cli.json {
        match serde_json::to_string_pretty(&staged.diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("cannot serialize diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", staged.diagnostics.report());
    }

    ExitCode::SUCCESS
}
