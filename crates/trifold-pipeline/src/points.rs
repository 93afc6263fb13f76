//! Point set construction: the synthetic border ring and its
//! combination with edge points.
//!
//! Without the ring, pixels outside the convex hull of the edge points
//! would never be covered by a triangle. The ring always includes the
//! four exact image corners, so the hull is the whole canvas
//! `[0, width] x [0, height]`.

use crate::types::{CellPoint, PointSet};

/// Number of border subdivisions along an edge of `length` pixels.
///
/// Images shorter than `spacing` along an axis would get zero
/// subdivisions; the count is clamped to one instead, which leaves
/// only the corners on that axis.
#[must_use]
pub const fn subdivisions(length: u32, spacing: u32) -> u32 {
    let count = if spacing == 0 { 1 } else { length / spacing };
    if count == 0 { 1 } else { count }
}

/// Build the border ring for a `width x height` image, in
/// [`CellPoint`] form.
///
/// Emits the four corners, then `subdivisions(width) - 1` evenly spaced
/// points along the top and bottom edges, then
/// `subdivisions(height) - 1` points along the left and right edges.
/// Corners sit at `row = height` / `col = width`, one past the last
/// pixel, so the ring encloses every pixel.
#[must_use]
pub fn border_ring(width: u32, height: u32, spacing: u32) -> PointSet {
    let w_points = subdivisions(width, spacing);
    let h_points = subdivisions(height, spacing);
    let w_delta = width / w_points;
    let h_delta = height / h_points;

    let corners = [
        CellPoint::new(0, 0),
        CellPoint::new(0, width),
        CellPoint::new(height, 0),
        CellPoint::new(height, width),
    ];
    let top = (1..w_points).map(|i| CellPoint::new(0, w_delta * i));
    let bottom = (1..w_points).map(|i| CellPoint::new(height, w_delta * i));
    let left = (1..h_points).map(|i| CellPoint::new(h_delta * i, 0));
    let right = (1..h_points).map(|i| CellPoint::new(h_delta * i, width));

    corners
        .into_iter()
        .chain(top)
        .chain(bottom)
        .chain(left)
        .chain(right)
        .collect()
}

/// Concatenate edge points and border points, edge points first.
///
/// Both sets are already in [`CellPoint`] form, so no axis swap happens
/// here.
#[must_use]
pub fn combine(edge_points: PointSet, border_points: PointSet) -> PointSet {
    let mut points = edge_points.into_points();
    points.extend(border_points.into_points());
    PointSet::new(points)
}
