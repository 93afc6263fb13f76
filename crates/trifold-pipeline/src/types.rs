//! Shared types for the trifold low-poly pipeline.

use serde::{Deserialize, Serialize};

use crate::diagnostics::PipelineDiagnostics;

/// Re-export `GrayImage` so downstream crates can reference the edge
/// map without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `DynamicImage`, the pipeline's input and output type.
pub use image::DynamicImage;

/// A pixel location in image space: row-major, `row` counts down from
/// the top edge and `col` counts right from the left edge.
///
/// This is the convention produced by edge detection and used for the
/// whole point set. Geometry (triangulation and rasterization) works in
/// [`Cartesian`] space; the only crossing between the two is
/// [`CellPoint::to_cartesian`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPoint {
    /// Vertical position (pixels from top edge).
    pub row: u32,
    /// Horizontal position (pixels from left edge).
    pub col: u32,
}

impl CellPoint {
    /// Create a new point from a row and column.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Swap into `x`/`y` orientation (`x = col`, `y = row`).
    #[must_use]
    pub const fn to_cartesian(self) -> Cartesian {
        Cartesian {
            x: self.col,
            y: self.row,
        }
    }
}

/// A vertex in cartesian space: `x` grows to the right and `y` grows
/// downward, matching pixel addressing `(x, y)` in `image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cartesian {
    /// Horizontal position.
    pub x: u32,
    /// Vertical position.
    pub y: u32,
}

impl Cartesian {
    /// Create a new vertex.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of [`CellPoint`]s fed to triangulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSet(Vec<CellPoint>);

impl PointSet {
    /// Create a point set from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<CellPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the set has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of points, duplicates included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[CellPoint] {
        &self.0
    }

    /// Consumes the set and returns the underlying vector.
    #[must_use]
    pub fn into_points(self) -> Vec<CellPoint> {
        self.0
    }

    /// Convert every point to cartesian space, preserving order so that
    /// index `i` of the result is point `i` of the set.
    #[must_use]
    pub fn to_cartesian(&self) -> Vec<Cartesian> {
        self.0.iter().map(|p| p.to_cartesian()).collect()
    }
}

impl FromIterator<CellPoint> for PointSet {
    fn from_iter<I: IntoIterator<Item = CellPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One triangulation simplex, stored as three indices into the
/// [`PointSet`] it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle(pub [usize; 3]);

impl Triangle {
    /// The three point indices.
    #[must_use]
    pub const fn indices(self) -> [usize; 3] {
        self.0
    }

    /// Look up the triangle's corners in an index-aligned vertex list.
    ///
    /// Returns `None` if any index is out of range.
    #[must_use]
    pub fn corners(self, vertices: &[Cartesian]) -> Option<[Cartesian; 3]> {
        let [a, b, c] = self.0;
        Some([*vertices.get(a)?, *vertices.get(b)?, *vertices.get(c)?])
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// How the Canny hysteresis thresholds are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Thresholds {
    /// Caller-supplied gradient thresholds.
    Manual {
        /// Weak-edge threshold.
        lower: u8,
        /// Strong-edge threshold. Must be at least `lower`.
        upper: u8,
    },
    /// Derive both thresholds from the median image intensity.
    Automatic,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::Manual {
            lower: PipelineConfig::DEFAULT_THRESHOLD,
            upper: PipelineConfig::DEFAULT_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// Build from the three user-facing parameters. `automatic`
    /// overrides the two explicit values.
    #[must_use]
    pub const fn from_parts(lower: u8, upper: u8, automatic: bool) -> Self {
        if automatic {
            Self::Automatic
        } else {
            Self::Manual { lower, upper }
        }
    }
}

/// Thresholds after automatic derivation, as handed to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedThresholds {
    /// Weak-edge threshold.
    pub lower: u8,
    /// Strong-edge threshold.
    pub upper: u8,
}

/// Configuration for one pipeline invocation.
///
/// Threshold values are `u8`, so the `[0, 255]` range is enforced by
/// the type at every surface (serde and clap both reject values that
/// do not fit). The remaining invariants are checked by
/// [`validate`](Self::validate), which every entry point calls first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Manual or automatic threshold selection.
    pub thresholds: Thresholds,

    /// Gaussian sigma applied inside the edge detector before the
    /// gradient is taken.
    pub blur_sigma: f32,

    /// Target spacing in pixels between synthetic border points.
    pub border_spacing: u32,

    /// Optional RGB colour used to outline every triangle after filling.
    /// Grayscale renders use the colour's luma.
    pub wireframe: Option<[u8; 3]>,
}

impl PipelineConfig {
    /// Initial value for both manual thresholds.
    pub const DEFAULT_THRESHOLD: u8 = 255;

    /// Smoothing applied before the gradient, the usual Canny choice.
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.4;

    /// One border subdivision per hundred pixels of edge length.
    pub const DEFAULT_BORDER_SPACING: u32 = 100;

    /// Check the invariants the type system does not cover.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ThresholdOrder`] when manual
    /// thresholds have `lower > upper`,
    /// [`ValidationError::InvalidBlurSigma`] for a negative or
    /// non-finite sigma, and [`ValidationError::InvalidBorderSpacing`]
    /// for a zero spacing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Thresholds::Manual { lower, upper } = self.thresholds
            && lower > upper
        {
            return Err(ValidationError::ThresholdOrder { lower, upper });
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(ValidationError::InvalidBlurSigma(self.blur_sigma));
        }
        if self.border_spacing == 0 {
            return Err(ValidationError::InvalidBorderSpacing);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            border_spacing: Self::DEFAULT_BORDER_SPACING,
            wireframe: None,
        }
    }
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Does not derive serde traits: the raster fields are only inspected
/// in-process (CLI reporting and tests).
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Binary edge map (255 = edge) from the detector.
    pub edges: GrayImage,
    /// Thresholds the detector actually used.
    pub thresholds: ResolvedThresholds,
    /// How many of `points` came from the edge map; the rest are the
    /// border ring.
    pub edge_point_count: usize,
    /// Edge points followed by border points.
    pub points: PointSet,
    /// Delaunay triangles indexing into `points`.
    pub triangles: Vec<Triangle>,
    /// The rendered low-poly image.
    pub output: DynamicImage,
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
    /// Per-stage timing and counts.
    pub diagnostics: PipelineDiagnostics,
}

/// A configuration or input that the pipeline refuses to run on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Manual thresholds with the weak threshold above the strong one.
    #[error("lower threshold {lower} exceeds upper threshold {upper}")]
    ThresholdOrder {
        /// Requested lower threshold.
        lower: u8,
        /// Requested upper threshold.
        upper: u8,
    },

    /// The image has no pixels.
    #[error("image has zero area ({width}x{height})")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Blur sigma is negative, infinite or NaN.
    #[error("blur sigma must be finite and non-negative, got {0}")]
    InvalidBlurSigma(f32),

    /// Border spacing of zero pixels.
    #[error("border spacing must be at least one pixel")]
    InvalidBorderSpacing,
}

/// The point set cannot be triangulated.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Fewer than three distinct points.
    #[error("triangulation needs at least 3 distinct points, got {count}")]
    TooFewPoints {
        /// Number of distinct points supplied.
        count: usize,
    },

    /// All points lie on one line, so no triangle has positive area.
    #[error("all {count} points are collinear")]
    Collinear {
        /// Number of distinct points supplied.
        count: usize,
    },

    /// The triangulation backend rejected a coordinate.
    #[error("point rejected by triangulation: {0:?}")]
    InvalidCoordinate(spade::InsertionError),
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Configuration or image rejected before processing.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Triangulation was impossible.
    #[error("triangulation failed: {0}")]
    Geometry(#[from] GeometryError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point conversions ---

    #[test]
    fn cell_point_to_cartesian_swaps_axes() {
        let p = CellPoint::new(3, 7);
        assert_eq!(p.to_cartesian(), Cartesian::new(7, 3));
    }

    #[test]
    fn point_set_to_cartesian_preserves_order() {
        let set = PointSet::new(vec![
            CellPoint::new(0, 1),
            CellPoint::new(2, 3),
            CellPoint::new(4, 5),
        ]);
        assert_eq!(
            set.to_cartesian(),
            vec![
                Cartesian::new(1, 0),
                Cartesian::new(3, 2),
                Cartesian::new(5, 4)
            ],
        );
    }

    #[test]
    fn point_set_from_iterator() {
        let set: PointSet = (0..4).map(|i| CellPoint::new(i, i)).collect();
        assert_eq!(set.len(), 4);
        assert!(!set.is_empty());
        assert_eq!(set.points()[2], CellPoint::new(2, 2));
    }

    #[test]
    fn triangle_corners_out_of_range_is_none() {
        let verts = vec![Cartesian::new(0, 0), Cartesian::new(1, 0)];
        assert!(Triangle([0, 1, 2]).corners(&verts).is_none());
    }

    // --- Thresholds ---

    #[test]
    fn automatic_flag_overrides_manual_values() {
        assert_eq!(Thresholds::from_parts(10, 20, true), Thresholds::Automatic);
        assert_eq!(
            Thresholds::from_parts(10, 20, false),
            Thresholds::Manual {
                lower: 10,
                upper: 20
            },
        );
    }

    // --- PipelineConfig ---

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.thresholds,
            Thresholds::Manual {
                lower: 255,
                upper: 255
            },
        );
        assert!((config.blur_sigma - 1.4).abs() < f32::EPSILON);
        assert_eq!(config.border_spacing, 100);
        assert!(config.wireframe.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        let config = PipelineConfig {
            thresholds: Thresholds::Manual {
                lower: 200,
                upper: 100,
            },
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ThresholdOrder {
                lower: 200,
                upper: 100
            }),
        );
    }

    #[test]
    fn validate_ignores_manual_values_in_automatic_mode() {
        let config = PipelineConfig {
            thresholds: Thresholds::Automatic,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_sigma_and_spacing() {
        let nan_sigma = PipelineConfig {
            blur_sigma: f32::NAN,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            nan_sigma.validate(),
            Err(ValidationError::InvalidBlurSigma(_))
        ));

        let zero_spacing = PipelineConfig {
            border_spacing: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(
            zero_spacing.validate(),
            Err(ValidationError::InvalidBorderSpacing)
        );
    }

    #[test]
    fn pipeline_config_serde_round_trip() {
        let config = PipelineConfig {
            thresholds: Thresholds::Manual {
                lower: 30,
                upper: 120,
            },
            blur_sigma: 2.0,
            border_spacing: 50,
            wireframe: Some([31, 32, 35]),
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn pipeline_config_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"thresholds":{"mode":"automatic"}}"#).unwrap();
        assert_eq!(config.thresholds, Thresholds::Automatic);
        assert_eq!(config.border_spacing, PipelineConfig::DEFAULT_BORDER_SPACING);
    }

    #[test]
    fn out_of_range_threshold_rejected_by_serde() {
        let result: Result<PipelineConfig, _> =
            serde_json::from_str(r#"{"thresholds":{"mode":"manual","lower":0,"upper":256}}"#);
        assert!(result.is_err());
    }

    // --- Errors ---

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            PipelineError::from(ValidationError::ThresholdOrder {
                lower: 9,
                upper: 3
            })
            .to_string(),
            "invalid input: lower threshold 9 exceeds upper threshold 3",
        );
        assert_eq!(
            PipelineError::from(GeometryError::TooFewPoints { count: 2 }).to_string(),
            "triangulation failed: triangulation needs at least 3 distinct points, got 2",
        );
    }
}
