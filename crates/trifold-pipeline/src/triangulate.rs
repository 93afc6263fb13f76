//! Delaunay triangulation of the point set.
//!
//! Backed by [`spade`]'s incremental Delaunay triangulation. The result
//! is expressed as [`Triangle`]s indexing the caller's vertex list, so
//! geometry and colour sampling can share one index space.

use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::types::{Cartesian, GeometryError, Triangle};

/// Triangulate `vertices`.
///
/// Triangles cover the convex hull of the input without overlap, and
/// every distinct input position is a vertex of at least one triangle.
/// A position that appears more than once is referenced through its
/// first occurrence. Triangle order is deterministic for a given input.
///
/// # Errors
///
/// Returns [`GeometryError::TooFewPoints`] for fewer than three distinct
/// positions and [`GeometryError::Collinear`] when no triangle of
/// positive area exists.
pub fn triangulate(vertices: &[Cartesian]) -> Result<Vec<Triangle>, GeometryError> {
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();

    // Backend vertex index -> first input index at that position.
    let mut origin: Vec<usize> = Vec::with_capacity(vertices.len());
    for (i, v) in vertices.iter().enumerate() {
        let handle = triangulation
            .insert(Point2::new(f64::from(v.x), f64::from(v.y)))
            .map_err(GeometryError::InvalidCoordinate)?;
        if handle.index() == origin.len() {
            origin.push(i);
        }
    }

    let distinct = origin.len();
    if distinct < 3 {
        return Err(GeometryError::TooFewPoints { count: distinct });
    }
    if triangulation.num_inner_faces() == 0 {
        return Err(GeometryError::Collinear { count: distinct });
    }

    let triangles: Vec<Triangle> = triangulation
        .inner_faces()
        .map(|face| Triangle(face.vertices().map(|v| origin[v.fix().index()])))
        .collect();

    log::debug!(
        "triangulated {distinct} distinct points into {} triangles",
        triangles.len()
    );
    Ok(triangles)
}
