//! Per-stage timing and counts for one pipeline run.
//!
//! [`process_staged`](crate::process_staged) and
//! [`process_bytes`](crate::process_bytes) fill these in as they go.
//! Timestamps come from `web-time`, so the same code measures with
//! `performance.now()` under WASM.
//!
//! `Duration` fields go through serde as fractional seconds.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod secs {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Duration::try_from_secs_f64(f64::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

/// Everything measured during one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Present only when the run started from encoded bytes.
    pub decode: Option<StageDiagnostics>,
    /// Intensity conversion, threshold resolution and Canny.
    pub edge_detection: StageDiagnostics,
    /// Border ring construction and combination with edge points.
    pub point_set: StageDiagnostics,
    /// Delaunay triangulation of the combined points.
    pub triangulation: StageDiagnostics,
    /// Colour sampling, fill and the optional wireframe.
    pub rasterization: StageDiagnostics,
    /// Wall clock from entry to return.
    #[serde(with = "secs")]
    pub total_duration: Duration,
    /// Image size and mesh totals.
    pub summary: PipelineSummary,
}

/// Timing plus the counts one stage produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall clock spent in the stage.
    #[serde(with = "secs")]
    pub duration: Duration,
    /// What the stage produced.
    pub metrics: StageMetrics,
}

/// Counts recorded by each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Byte decoding.
    Decode {
        /// Length of the encoded input.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
    },
    /// Intensity conversion, threshold resolution and Canny.
    EdgeDetection {
        /// Thresholds came from the median intensity.
        automatic: bool,
        /// Weak-edge threshold used.
        lower_threshold: u8,
        /// Strong-edge threshold used.
        upper_threshold: u8,
        /// Non-zero pixels in the edge map.
        edge_pixel_count: usize,
        /// Denominator for edge density.
        total_pixel_count: u64,
    },
    /// Point set construction.
    PointSet {
        /// Points taken from the edge map.
        edge_points: usize,
        /// Synthetic border ring points.
        border_points: usize,
    },
    /// Delaunay triangulation.
    Triangulation {
        /// Points handed to the triangulator, duplicates included.
        input_points: usize,
        /// Triangles in the mesh.
        triangle_count: usize,
    },
    /// Colour sampling and fill.
    Rasterization {
        /// Triangles that owned at least one pixel.
        filled_triangles: usize,
        /// Degenerate or out-of-range triangles that were skipped.
        empty_triangles: usize,
        /// Pixels painted by fills.
        painted_pixels: u64,
        /// Triangle outlines were drawn over the fills.
        wireframe: bool,
    },
}

/// Whole-run totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source width in pixels.
    pub image_width: u32,
    /// Source height in pixels.
    pub image_height: u32,
    /// `image_width * image_height`.
    pub pixel_count: u64,
    /// Edge points plus border points.
    pub point_count: usize,
    /// Triangles in the final mesh.
    pub triangle_count: usize,
}

impl PipelineDiagnostics {
    /// Stages in execution order, with display names.
    pub fn stages(&self) -> impl Iterator<Item = (&'static str, &StageDiagnostics)> {
        self.decode
            .iter()
            .map(|d| ("Decode", d))
            .chain([
                ("Edge Detection", &self.edge_detection),
                ("Point Set", &self.point_set),
                ("Triangulation", &self.triangulation),
                ("Rasterization", &self.rasterization),
            ])
    }

    /// Fixed-width text table, one row per stage.
    #[must_use]
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PipelineDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = millis(self.total_duration);
        let s = &self.summary;

        writeln!(f, "trifold diagnostics")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(
            f,
            "{}x{} px ({} total), {total_ms:.3}ms",
            s.image_width, s.image_height, s.pixel_count,
        )?;
        writeln!(f)?;
        writeln!(f, "{:<16} {:>11} {:>7}  Details", "Stage", "Time", "Share")?;
        writeln!(f, "{}", "-".repeat(72))?;

        for (name, stage) in self.stages() {
            let ms = millis(stage.duration);
            let share = if total_ms > 0.0 { ms / total_ms * 100.0 } else { 0.0 };
            writeln!(f, "{name:<16} {ms:>9.3}ms {share:>6.1}%  {}", stage.metrics)?;
        }

        writeln!(f)?;
        write!(f, "{} points, {} triangles", s.point_count, s.triangle_count)
    }
}

impl fmt::Display for StageMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Decode {
                input_bytes,
                width,
                height,
            } => write!(f, "{input_bytes} bytes -> {width}x{height}"),
            Self::EdgeDetection {
                automatic,
                lower_threshold,
                upper_threshold,
                edge_pixel_count,
                total_pixel_count,
            } => {
                #[allow(clippy::cast_precision_loss)]
                let density = if total_pixel_count == 0 {
                    0.0
                } else {
                    edge_pixel_count as f64 * 100.0 / total_pixel_count as f64
                };
                let mode = if automatic { "auto" } else { "manual" };
                write!(
                    f,
                    "{mode} {lower_threshold}/{upper_threshold}, {edge_pixel_count} edge px ({density:.1}%)",
                )
            }
            Self::PointSet {
                edge_points,
                border_points,
            } => write!(f, "{edge_points} edge + {border_points} border"),
            Self::Triangulation {
                input_points,
                triangle_count,
            } => write!(f, "{input_points} points -> {triangle_count} triangles"),
            Self::Rasterization {
                filled_triangles,
                empty_triangles,
                painted_pixels,
                wireframe,
            } => {
                write!(
                    f,
                    "{filled_triangles} filled, {empty_triangles} skipped, {painted_pixels} px",
                )?;
                if wireframe {
                    write!(f, ", wireframe")?;
                }
                Ok(())
            }
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}
