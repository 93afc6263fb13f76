//! trifold-pipeline: Pure low-poly rendering pipeline (sans-IO).
//!
//! Converts a raster image into a low-poly rendering through:
//! intensity -> Canny edges -> edge points + border ring ->
//! Delaunay triangulation -> per-triangle mean colour fill.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images or byte slices and returns in-memory images. Reading and
//! writing files lives in the `trifold` binary.

pub mod canny;
pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod points;
pub mod raster;
pub mod triangulate;
pub mod types;

use image::{DynamicImage, Pixel, Rgb};
use web_time::Instant;

pub use diagnostics::{PipelineDiagnostics, PipelineSummary, StageDiagnostics, StageMetrics};
pub use types::{
    Cartesian, CellPoint, Dimensions, GeometryError, PipelineConfig, PipelineError, PointSet,
    ResolvedThresholds, StagedResult, Thresholds, Triangle, ValidationError,
};

/// Run the full pipeline and return only the rendered image.
///
/// The output has the same dimensions as `image`. Grayscale (`Luma8`)
/// input renders to grayscale; every other pixel format renders to
/// 8-bit RGB.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for an invalid configuration
/// or a zero-sized image, and [`PipelineError::Geometry`] when the
/// point set cannot be triangulated.
pub fn process(
    image: &DynamicImage,
    config: &PipelineConfig,
) -> Result<DynamicImage, PipelineError> {
    process_staged(image, config).map(|staged| staged.output)
}

/// Decode raw image bytes (PNG, JPEG, BMP, WebP) and run the pipeline,
/// keeping every intermediate.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if they are not a supported image,
/// and otherwise the same errors as [`process_staged`].
pub fn process_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    let start = Instant::now();
    config.validate()?;

    let image = decode::decode(bytes)?;
    let decode = StageDiagnostics {
        duration: start.elapsed(),
        metrics: StageMetrics::Decode {
            input_bytes: bytes.len(),
            width: image.width(),
            height: image.height(),
        },
    };
    log::debug!(
        "decoded {} bytes into {}x{} image",
        bytes.len(),
        image.width(),
        image.height(),
    );

    run(&image, config, start, Some(decode))
}

/// Run the full pipeline, keeping every intermediate.
///
/// # Pipeline steps
///
/// 1. Validate the configuration and image size
/// 2. Intensity conversion, threshold resolution, Canny edge detection
/// 3. Edge points followed by the synthetic border ring
/// 4. Conversion to cartesian vertices and Delaunay triangulation
/// 5. Per-triangle mean colour fill, then the optional wireframe
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for an invalid configuration
/// or a zero-sized image, and [`PipelineError::Geometry`] when the
/// point set cannot be triangulated.
pub fn process_staged(
    image: &DynamicImage,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    let start = Instant::now();
    config.validate()?;
    run(image, config, start, None)
}

fn run(
    image: &DynamicImage,
    config: &PipelineConfig,
    start: Instant,
    decode: Option<StageDiagnostics>,
) -> Result<StagedResult, PipelineError> {
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if dimensions.width == 0 || dimensions.height == 0 {
        return Err(ValidationError::EmptyImage {
            width: dimensions.width,
            height: dimensions.height,
        }
        .into());
    }
    let pixel_count = u64::from(dimensions.width) * u64::from(dimensions.height);

    // 1. Edge detection.
    let t = Instant::now();
    let detection = edge::detect(image, config.thresholds, config.blur_sigma)?;
    let edge_point_count = detection.points.len();
    let edge_detection = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::EdgeDetection {
            automatic: config.thresholds == Thresholds::Automatic,
            lower_threshold: detection.thresholds.lower,
            upper_threshold: detection.thresholds.upper,
            edge_pixel_count: edge_point_count,
            total_pixel_count: pixel_count,
        },
    };

    // 2. Point set.
    let t = Instant::now();
    let border = points::border_ring(dimensions.width, dimensions.height, config.border_spacing);
    let border_point_count = border.len();
    let point_set = points::combine(detection.points, border);
    let vertices = point_set.to_cartesian();
    let point_set_diag = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::PointSet {
            edge_points: edge_point_count,
            border_points: border_point_count,
        },
    };
    log::debug!("point set: {edge_point_count} edge + {border_point_count} border");

    // 3. Triangulation.
    let t = Instant::now();
    let triangles = triangulate::triangulate(&vertices)?;
    let triangulation = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Triangulation {
            input_points: vertices.len(),
            triangle_count: triangles.len(),
        },
    };

    // 4. Rasterization.
    let t = Instant::now();
    let (output, stats) = match image {
        DynamicImage::ImageLuma8(gray) => {
            let outline = config.wireframe.map(|c| Rgb(c).to_luma());
            let (out, stats) = raster::render(gray, &vertices, &triangles, outline);
            (DynamicImage::ImageLuma8(out), stats)
        }
        other => {
            let rgb = other.to_rgb8();
            let outline = config.wireframe.map(Rgb);
            let (out, stats) = raster::render(&rgb, &vertices, &triangles, outline);
            (DynamicImage::ImageRgb8(out), stats)
        }
    };
    let rasterization = StageDiagnostics {
        duration: t.elapsed(),
        metrics: StageMetrics::Rasterization {
            filled_triangles: stats.filled_triangles,
            empty_triangles: stats.empty_triangles,
            painted_pixels: stats.painted_pixels,
            wireframe: config.wireframe.is_some(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        edge_detection,
        point_set: point_set_diag,
        triangulation,
        rasterization,
        total_duration: start.elapsed(),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count,
            point_count: point_set.len(),
            triangle_count: triangles.len(),
        },
    };

    Ok(StagedResult {
        edges: detection.edges,
        thresholds: detection.thresholds,
        edge_point_count,
        points: point_set,
        triangles,
        output,
        dimensions,
        diagnostics,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn manual(lower: u8, upper: u8) -> PipelineConfig {
        PipelineConfig {
            thresholds: Thresholds::Manual { lower, upper },
            ..PipelineConfig::default()
        }
    }

    /// Dark disc on a light background: plenty of curved edges.
    fn disc(width: u32, height: u32) -> DynamicImage {
        let (cx, cy) = (i64::from(width / 2), i64::from(height / 2));
        let r = i64::from(width.min(height) / 3);
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
            if dx * dx + dy * dy < r * r {
                Rgb([30, 60, 90])
            } else {
                Rgb([230, 210, 190])
            }
        }))
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn uniform_image_at_maximum_thresholds_is_unchanged() {
        let source = RgbImage::from_pixel(400, 300, Rgb([128, 128, 128]));
        let staged =
            process_staged(&DynamicImage::ImageRgb8(source.clone()), &manual(255, 255)).unwrap();

        assert_eq!(staged.edge_point_count, 0);
        assert_eq!(staged.points.len(), 14);
        assert_eq!(staged.output.as_rgb8().unwrap(), &source);
    }

    #[test]
    fn output_preserves_dimensions() {
        let out = process(&disc(123, 77), &manual(20, 60)).unwrap();
        assert_eq!((out.width(), out.height()), (123, 77));
    }

    #[test]
    fn gray_input_renders_gray() {
        let gray = GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 20 } else { 220 }]));
        let out = process(&DynamicImage::ImageLuma8(gray), &manual(20, 60)).unwrap();
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn rgba_input_renders_rgb() {
        let rgba = RgbaImage::from_pixel(30, 30, Rgba([10, 20, 30, 40]));
        let out = process(&DynamicImage::ImageRgba8(rgba), &PipelineConfig::default()).unwrap();
        assert_eq!(out.as_rgb8().unwrap().get_pixel(5, 5).0, [10, 20, 30]);
    }

    #[test]
    fn process_is_deterministic() {
        let img = disc(90, 70);
        let config = PipelineConfig {
            thresholds: Thresholds::Automatic,
            ..PipelineConfig::default()
        };
        let a = process(&img, &config).unwrap();
        let b = process(&img, &config).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn edges_become_vertices() {
        let staged = process_staged(&disc(80, 80), &manual(20, 60)).unwrap();
        assert!(staged.edge_point_count > 0);
        let border = points::border_ring(80, 80, PipelineConfig::DEFAULT_BORDER_SPACING);
        assert_eq!(staged.points.len(), staged.edge_point_count + border.len());
        assert_eq!(&staged.points.points()[staged.edge_point_count..], border.points());
        assert!(staged.triangles.len() > 2);
        assert_eq!(
            staged.diagnostics.summary.triangle_count,
            staged.triangles.len()
        );
    }

    #[test]
    fn image_smaller_than_border_spacing_still_renders() {
        for (w, h) in [(100, 100), (99, 40), (3, 3), (1, 1)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([1, 2, 3])));
            let out = process(&img, &PipelineConfig::default()).unwrap();
            assert_eq!(out.as_rgb8().unwrap().get_pixel(0, 0).0, [1, 2, 3]);
        }
    }

    #[test]
    fn automatic_thresholds_on_uniform_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([200, 100, 0])));
        let config = PipelineConfig {
            thresholds: Thresholds::Automatic,
            ..PipelineConfig::default()
        };
        let staged = process_staged(&img, &config).unwrap();
        assert_eq!(staged.edge_point_count, 0);
        assert_eq!(staged.output.as_rgb8().unwrap().get_pixel(49, 49).0, [200, 100, 0]);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let result = process(&disc(40, 40), &manual(200, 100));
        assert!(matches!(
            result,
            Err(PipelineError::Validation(ValidationError::ThresholdOrder {
                lower: 200,
                upper: 100
            }))
        ));
    }

    #[test]
    fn empty_image_is_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(matches!(
            process(&img, &PipelineConfig::default()),
            Err(PipelineError::Validation(ValidationError::EmptyImage { width: 0, height: 10 }))
        ));
    }

    #[test]
    fn wireframe_draws_hull_edges() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 40, Rgb([9, 9, 9])));
        let config = PipelineConfig {
            wireframe: Some([31, 32, 35]),
            ..PipelineConfig::default()
        };
        let out = process(&img, &config).unwrap();
        assert_eq!(out.as_rgb8().unwrap().get_pixel(20, 0).0, [31, 32, 35]);
    }

    #[test]
    fn process_bytes_records_decode_stage() {
        let bytes = png_bytes(&RgbImage::from_pixel(20, 20, Rgb([50, 60, 70])));
        let staged = process_bytes(&bytes, &PipelineConfig::default()).unwrap();
        assert!(matches!(
            staged.diagnostics.decode,
            Some(StageDiagnostics {
                metrics: StageMetrics::Decode {
                    width: 20,
                    height: 20,
                    ..
                },
                ..
            })
        ));
        assert_eq!(staged.output.as_rgb8().unwrap().get_pixel(10, 10).0, [50, 60, 70]);
    }

    #[test]
    fn process_bytes_empty_input() {
        assert!(matches!(
            process_bytes(&[], &PipelineConfig::default()),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn process_bytes_corrupt_input() {
        assert!(matches!(
            process_bytes(&[0xFF, 0x00], &PipelineConfig::default()),
            Err(PipelineError::ImageDecode(_))
        ));
    }
}
