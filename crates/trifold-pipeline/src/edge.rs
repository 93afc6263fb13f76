//! Edge detection: intensity conversion, threshold resolution, and
//! extraction of edge-pixel coordinates.
//!
//! Produces the first half of the point set. Coordinates come out in
//! [`CellPoint`] (row, column) form, in row-major order.

use image::{DynamicImage, GrayImage};

use crate::canny;
use crate::types::{CellPoint, PointSet, ResolvedThresholds, Thresholds, ValidationError};

/// Relative width of the automatic threshold band around the median
/// intensity: thresholds land at `(1 - σ)·median` and `(1 + σ)·median`.
///
/// 0.33 is the widely used "zero-parameter Canny" setting, which keeps
/// enough weak edges to link contours without picking up texture noise
/// on typical photographs.
pub const AUTO_THRESHOLD_SIGMA: f64 = 0.33;

/// Output of [`detect`].
#[derive(Debug, Clone)]
pub struct EdgeDetection {
    /// Binary edge map (255 = edge).
    pub edges: GrayImage,
    /// Thresholds the detector ran with.
    pub thresholds: ResolvedThresholds,
    /// Coordinates of every edge pixel, row-major.
    pub points: PointSet,
}

/// Detect edges in `image` and return their coordinates.
///
/// The image is reduced to a single intensity channel, thresholds are
/// resolved (see [`resolve_thresholds`]), the Canny detector runs with
/// `blur_sigma` smoothing, and every non-zero pixel of the resulting
/// mask becomes a point. There is no cap on the number of points.
///
/// # Errors
///
/// Returns [`ValidationError::ThresholdOrder`] for manual thresholds
/// with `lower > upper`.
pub fn detect(
    image: &DynamicImage,
    thresholds: Thresholds,
    blur_sigma: f32,
) -> Result<EdgeDetection, ValidationError> {
    let gray = to_intensity(image);
    let resolved = resolve_thresholds(thresholds, &gray)?;
    let edges = canny::canny(
        &gray,
        blur_sigma,
        f32::from(resolved.lower),
        f32::from(resolved.upper),
    );
    let points = edge_points(&edges);
    log::debug!(
        "edge detection: thresholds {}..{}, {} edge points",
        resolved.lower,
        resolved.upper,
        points.len(),
    );
    Ok(EdgeDetection {
        edges,
        thresholds: resolved,
        points,
    })
}

/// Convert to a single intensity channel. Grayscale input is used as is.
#[must_use]
pub fn to_intensity(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Turn a [`Thresholds`] choice into concrete detector thresholds.
///
/// # Errors
///
/// Returns [`ValidationError::ThresholdOrder`] for manual thresholds
/// with `lower > upper`. Automatic thresholds never fail.
pub fn resolve_thresholds(
    thresholds: Thresholds,
    gray: &GrayImage,
) -> Result<ResolvedThresholds, ValidationError> {
    match thresholds {
        Thresholds::Manual { lower, upper } if lower > upper => {
            Err(ValidationError::ThresholdOrder { lower, upper })
        }
        Thresholds::Manual { lower, upper } => Ok(ResolvedThresholds { lower, upper }),
        Thresholds::Automatic => {
            let resolved = auto_thresholds(median_intensity(gray));
            log::trace!("automatic thresholds: {resolved:?}");
            Ok(resolved)
        }
    }
}

/// Derive thresholds from a median intensity using
/// [`AUTO_THRESHOLD_SIGMA`]. Values are truncated toward zero, so
/// `0 <= lower <= upper <= 255` always holds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn auto_thresholds(median: f64) -> ResolvedThresholds {
    let lower = ((1.0 - AUTO_THRESHOLD_SIGMA) * median).max(0.0);
    let upper = ((1.0 + AUTO_THRESHOLD_SIGMA) * median).min(255.0);
    ResolvedThresholds {
        lower: lower as u8,
        upper: upper as u8,
    }
}

/// Median pixel intensity. For an even pixel count this is the mean of
/// the two middle values. An empty image has median 0.
#[must_use]
pub fn median_intensity(gray: &GrayImage) -> f64 {
    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[usize::from(p.0[0])] += 1;
    }

    let count: u64 = histogram.iter().sum();
    if count == 0 {
        return 0.0;
    }

    let upper_mid = value_at_rank(&histogram, count / 2);
    if count % 2 == 1 {
        f64::from(upper_mid)
    } else {
        let lower_mid = value_at_rank(&histogram, count / 2 - 1);
        (f64::from(lower_mid) + f64::from(upper_mid)) / 2.0
    }
}

/// The intensity at zero-based `rank` in sorted order.
fn value_at_rank(histogram: &[u64; 256], rank: u64) -> u8 {
    let mut seen = 0u64;
    for (value, &n) in (0..=u8::MAX).zip(histogram) {
        seen += n;
        if seen > rank {
            return value;
        }
    }
    u8::MAX
}

/// Collect the coordinates of every non-zero mask pixel, row by row.
#[must_use]
pub fn edge_points(edges: &GrayImage) -> PointSet {
    edges
        .enumerate_rows()
        .flat_map(|(_, row)| row)
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| CellPoint::new(y, x))
        .collect()
}
