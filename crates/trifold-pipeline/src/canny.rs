//! Canny edge detection.
//!
//! Gaussian smoothing, Sobel gradient magnitude, non-maximum
//! suppression along the quantized gradient direction, then hysteresis
//! over all 8 neighbours.
//!
//! `imageproc::edges::canny` is not used directly: its hysteresis
//! underflows on `x - 1` when tracking reaches column or row zero and
//! skips the north and north-east neighbours
//! (<https://github.com/image-rs/imageproc/issues/705>). This module
//! keeps the same stages on top of `imageproc`'s blur and Sobel
//! filters, with bounds-checked tracking.
//!
//! Threshold comparisons are strict: a pixel is a strong edge when its
//! thinned magnitude is `> upper` and a weak edge when it is `> lower`.
//! A flat image therefore has no edges for any threshold pair.

use image::{GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Offsets of the 8 neighbours visited during hysteresis.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Run Canny edge detection on a grayscale image.
///
/// Returns a binary image of the same size: 255 for edge pixels, 0
/// elsewhere. `sigma <= 0` skips smoothing. `lower` is expected to be
/// at most `upper`; if it is not, every strong pixel is still an edge
/// but weak pixels between the two values are never linked.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, sigma: f32, lower: f32, upper: f32) -> GrayImage {
    let (width, height) = image.dimensions();

    let smoothed = if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(image, sigma)
    } else {
        image.clone()
    };

    let gx: Vec<f32> = horizontal_sobel(&smoothed)
        .iter()
        .map(|&v| f32::from(v))
        .collect();
    let gy: Vec<f32> = vertical_sobel(&smoothed)
        .iter()
        .map(|&v| f32::from(v))
        .collect();
    let magnitude: Vec<f32> = gx.iter().zip(&gy).map(|(h, v)| h.hypot(*v)).collect();

    let grid = Grid {
        width: width as usize,
        height: height as usize,
    };
    let thinned = non_maximum_suppression(grid, &magnitude, &gx, &gy);
    let marks = hysteresis(grid, &thinned, lower, upper);

    GrayImage::from_fn(width, height, |x, y| {
        Luma([marks[grid.index(x as usize, y as usize)]])
    })
}

#[derive(Clone, Copy)]
struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    const fn index(self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn neighbour(self, x: usize, y: usize, (dx, dy): (isize, isize)) -> Option<usize> {
        let nx = x.checked_add_signed(dx).filter(|&nx| nx < self.width)?;
        let ny = y.checked_add_signed(dy).filter(|&ny| ny < self.height)?;
        Some(self.index(nx, ny))
    }
}

/// Keep only pixels whose magnitude is a local maximum across the edge.
///
/// The outermost ring of pixels has an incomplete neighbourhood and is
/// always suppressed.
fn non_maximum_suppression(grid: Grid, magnitude: &[f32], gx: &[f32], gy: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0; magnitude.len()];
    if grid.width < 3 || grid.height < 3 {
        return out;
    }

    let w = grid.width;
    for y in 1..grid.height - 1 {
        for x in 1..w - 1 {
            let i = grid.index(x, y);
            let m = magnitude[i];
            if m <= 0.0 {
                continue;
            }

            let mut angle = gy[i].atan2(gx[i]).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }

            // Neighbours along the gradient direction (y grows downward).
            let (a, b) = if (22.5..67.5).contains(&angle) {
                (i + w + 1, i - w - 1)
            } else if (67.5..112.5).contains(&angle) {
                (i - w, i + w)
            } else if (112.5..157.5).contains(&angle) {
                (i + w - 1, i - w + 1)
            } else {
                (i - 1, i + 1)
            };

            if m >= magnitude[a] && m >= magnitude[b] {
                out[i] = m;
            }
        }
    }
    out
}

/// Mark strong pixels and every weak pixel 8-connected to one.
fn hysteresis(grid: Grid, thinned: &[f32], lower: f32, upper: f32) -> Vec<u8> {
    let mut marks = vec![0u8; thinned.len()];
    let mut stack = Vec::new();

    for seed in 0..thinned.len() {
        if thinned[seed] <= upper || marks[seed] != 0 {
            continue;
        }
        marks[seed] = u8::MAX;
        stack.push(seed);

        while let Some(i) = stack.pop() {
            let (x, y) = (i % grid.width, i / grid.width);
            for offset in NEIGHBOURS {
                let Some(n) = grid.neighbour(x, y, offset) else {
                    continue;
                };
                if marks[n] == 0 && thinned[n] > lower {
                    marks[n] = u8::MAX;
                    stack.push(n);
                }
            }
        }
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_count(edges: &GrayImage) -> usize {
        edges.pixels().filter(|p| p.0[0] > 0).count()
    }

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| if x < 10 { Luma([0]) } else { Luma([255]) })
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::new(17, 31);
        let edges = canny(&img, 1.4, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (17, 31));
    }

    #[test]
    fn flat_image_has_no_edges_even_with_zero_thresholds() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(edge_count(&canny(&img, 1.4, 0.0, 0.0)), 0);
    }

    #[test]
    fn sharp_edge_detected_near_boundary() {
        let edges = canny(&sharp_edge_image(), 1.4, 50.0, 150.0);
        assert!(edge_count(&edges) > 0, "expected edges at sharp boundary");
        for (x, _y, p) in edges.enumerate_pixels() {
            if p.0[0] > 0 {
                assert!((7..=12).contains(&x), "edge pixel far from boundary at x={x}");
            }
        }
    }

    #[test]
    fn output_is_binary() {
        let edges = canny(&sharp_edge_image(), 1.4, 10.0, 20.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn tracking_near_border_does_not_panic() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([0]));
        for y in 0..10 {
            img.put_pixel(1, y, Luma([255]));
        }
        let _edges = canny(&img, 0.0, 1.0, 2.0);
    }

    #[test]
    fn tiny_images_produce_empty_maps() {
        for (w, h) in [(1, 1), (2, 5), (5, 2)] {
            let img = GrayImage::from_fn(w, h, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
            let edges = canny(&img, 1.0, 1.0, 2.0);
            assert_eq!(edges.dimensions(), (w, h));
            assert_eq!(edge_count(&edges), 0);
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn raising_upper_never_adds_edges() {
        let img = GrayImage::from_fn(40, 40, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let mut previous = usize::MAX;
        for upper in [20.0, 60.0, 120.0, 250.0, 600.0] {
            let count = edge_count(&canny(&img, 1.0, 20.0, upper));
            assert!(count <= previous, "upper={upper} produced {count} > {previous}");
            previous = count;
        }
    }

    #[test]
    fn neighbour_rejects_out_of_bounds() {
        let grid = Grid {
            width: 3,
            height: 3,
        };
        assert_eq!(grid.neighbour(0, 0, (-1, 0)), None);
        assert_eq!(grid.neighbour(2, 2, (1, 1)), None);
        assert_eq!(grid.neighbour(1, 1, (1, -1)), Some(2));
    }
}
