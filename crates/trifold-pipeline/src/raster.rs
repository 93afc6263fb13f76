//! Rasterization: per-triangle colour sampling and solid fill.
//!
//! # Pixel ownership
//!
//! Pixel `(x, y)` is sampled at its integer coordinate. It belongs to a
//! triangle when that coordinate is strictly inside, or lies on one of
//! the triangle's *top* or *left* edges (the top-left fill rule).
//! Edge tests run in exact integer arithmetic, so triangles sharing an
//! edge never both claim a pixel and never both skip one. With the
//! border ring in place the hull is `[0, width] x [0, height]`, whose
//! left and top sides are owned by the triangles touching them, so every
//! pixel of the canvas belongs to exactly one triangle.
//!
//! The same footprint is used for sampling the source and for painting
//! the output. A degenerate triangle has an empty footprint: it is
//! skipped, and since it owns no pixels nothing is left unpainted.

use image::{ImageBuffer, Pixel};
use imageproc::drawing::draw_line_segment_mut;

use crate::types::{Cartesian, Triangle};

/// Counters gathered while rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Triangles that owned at least one pixel.
    pub filled_triangles: usize,
    /// Triangles with an empty footprint (or out-of-range indices).
    pub empty_triangles: usize,
    /// Total pixels painted by fills.
    pub painted_pixels: u64,
}

/// Render `triangles` filled with the mean colour of the `source`
/// pixels each one covers.
///
/// `vertices` is the cartesian form of the point set the triangles
/// index into. The output has the dimensions of `source` and starts
/// black; pixels outside every triangle stay black. When `outline` is
/// set, every triangle edge is drawn in that colour after all fills.
#[must_use]
pub fn render<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    vertices: &[Cartesian],
    triangles: &[Triangle],
    outline: Option<P>,
) -> (ImageBuffer<P, Vec<u8>>, RenderStats)
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = source.dimensions();
    let mut canvas: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(width, height);
    let mut stats = RenderStats::default();

    for triangle in triangles {
        let Some(corners) = triangle.corners(vertices) else {
            log::warn!("skipping triangle {triangle:?} with out-of-range index");
            stats.empty_triangles += 1;
            continue;
        };

        let pixels = footprint(corners, width, height);
        let Some(colour) = mean_colour(source, &pixels) else {
            stats.empty_triangles += 1;
            continue;
        };
        for &(x, y) in &pixels {
            canvas.put_pixel(x, y, colour);
        }
        stats.filled_triangles += 1;
        stats.painted_pixels += pixels.len() as u64;
    }

    if let Some(colour) = outline {
        draw_outlines(&mut canvas, vertices, triangles, colour);
    }

    log::debug!(
        "rendered {} triangles ({} empty), {} pixels painted",
        stats.filled_triangles,
        stats.empty_triangles,
        stats.painted_pixels,
    );
    (canvas, stats)
}

/// Pixels of a `width x height` canvas owned by the triangle, in
/// row-major order.
#[must_use]
pub fn footprint(corners: [Cartesian; 3], width: u32, height: u32) -> Vec<(u32, u32)> {
    let Some([v0, v1, v2]) = oriented(corners) else {
        return Vec::new();
    };
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let min_x = v0.x.min(v1.x).min(v2.x);
    let max_x = v0.x.max(v1.x).max(v2.x).min(width - 1);
    let min_y = v0.y.min(v1.y).min(v2.y);
    let max_y = v0.y.max(v1.y).max(v2.y).min(height - 1);

    let edges = [(v1, v2), (v2, v0), (v0, v1)];
    let mut pixels = Vec::new();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Cartesian::new(x, y);
            let owned = edges.iter().all(|&(a, b)| {
                let w = edge_function(a, b, p);
                w > 0 || (w == 0 && is_top_left(a, b))
            });
            if owned {
                pixels.push((x, y));
            }
        }
    }
    pixels
}

/// Signed area test: positive when `p` is on the interior side of
/// `a -> b` for a triangle wound so that [`oriented`] accepts it.
fn edge_function(a: Cartesian, b: Cartesian, p: Cartesian) -> i64 {
    let (ax, ay) = (i64::from(a.x), i64::from(a.y));
    let (bx, by) = (i64::from(b.x), i64::from(b.y));
    let (px, py) = (i64::from(p.x), i64::from(p.y));
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

/// Reorder corners so the interior is on the positive side of every
/// edge. `None` for zero-area triangles.
fn oriented([a, b, c]: [Cartesian; 3]) -> Option<[Cartesian; 3]> {
    match edge_function(a, b, c) {
        0 => None,
        area if area > 0 => Some([a, b, c]),
        _ => Some([a, c, b]),
    }
}

/// With y growing downward and positive winding, a top edge runs
/// horizontally to the right and a left edge runs upward.
const fn is_top_left(a: Cartesian, b: Cartesian) -> bool {
    (a.y == b.y && b.x > a.x) || b.y < a.y
}

/// Per-channel mean of `source` over `pixels`, truncated toward zero.
/// `None` for an empty footprint.
fn mean_colour<P>(source: &ImageBuffer<P, Vec<u8>>, pixels: &[(u32, u32)]) -> Option<P>
where
    P: Pixel<Subpixel = u8>,
{
    if pixels.is_empty() {
        return None;
    }

    let mut sums = vec![0u64; usize::from(P::CHANNEL_COUNT)];
    for &(x, y) in pixels {
        for (sum, &c) in sums.iter_mut().zip(source.get_pixel(x, y).channels()) {
            *sum += u64::from(c);
        }
    }

    let count = pixels.len() as u64;
    let channels: Vec<u8> = sums
        .iter()
        .map(|&s| u8::try_from(s / count).unwrap_or(u8::MAX))
        .collect();
    Some(*P::from_slice(&channels))
}

#[allow(clippy::cast_precision_loss)]
fn draw_outlines<P>(
    canvas: &mut ImageBuffer<P, Vec<u8>>,
    vertices: &[Cartesian],
    triangles: &[Triangle],
    colour: P,
) where
    P: Pixel<Subpixel = u8> + 'static,
{
    for triangle in triangles {
        let Some([a, b, c]) = triangle.corners(vertices) else {
            continue;
        };
        for (from, to) in [(a, b), (b, c), (c, a)] {
            draw_line_segment_mut(
                canvas,
                (from.x as f32, from.y as f32),
                (to.x as f32, to.y as f32),
                colour,
            );
        }
    }
}
