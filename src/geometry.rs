//! Tessellation of semantic primitives into vertex positions and draw topology.
//!
//! Every builder in this module is a pure function of its arguments. Builders never produce an
//! empty or partially valid [`Geometry`]: degenerate input is rejected with
//! [`ShapeError::InvalidArgument`] so callers can keep their previous state.
//!
//! Positions are expressed in shape space: the origin is the top-left corner and y grows
//! downward. Texture coordinates are derived from each primitive's axis-aligned bounding box, so
//! a texture always spans the whole primitive.
//!
//! # Examples
//!
//! ```rust
//! use lyon::math::point;
//! use vecshape::geometry::{self, Topology};
//!
//! let circle = geometry::circle(point(0.5, 0.5), 0.25, 16).unwrap();
//! assert_eq!(circle.positions.len(), 17);
//! assert_eq!(circle.topology, Topology::TriangleList);
//! ```

use crate::error::ShapeError;
use lyon::geom::euclid::default::{Point2D, Point3D};
use lyon::math::{Point, Size};
use std::f32::consts::TAU;

/// How the index sequence of a [`Geometry`] is assembled into primitives.
///
/// There is no fan or loop variant. Fans are written out as explicit triangle lists and closed
/// line loops repeat their first index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    TriangleList,
    #[default]
    TriangleStrip,
}

impl Topology {
    pub const ALL: [Topology; 5] = [
        Topology::Points,
        Topology::Lines,
        Topology::LineStrip,
        Topology::TriangleList,
        Topology::TriangleStrip,
    ];

    pub fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(value: Topology) -> Self {
        match value {
            Topology::Points => wgpu::PrimitiveTopology::PointList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

/// Output of a builder: positions with matching texture coordinates, plus the index sequence
/// and the topology it is meant for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub positions: Vec<Point3D<f32>>,
    pub texture_coordinates: Vec<Point2D<f32>>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    /// Builds geometry from 2D positions, generating bounding-box texture coordinates.
    fn from_points(points: &[Point], indices: Vec<u32>, topology: Topology) -> Self {
        let texture_coordinates = bounding_box_uvs(points);
        let positions = points.iter().map(|p| Point3D::new(p.x, p.y, 0.0)).collect();
        Self {
            positions,
            texture_coordinates,
            indices,
            topology,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Checks that every position has a texture coordinate and every index names a vertex.
    /// Builders always pass; hand-assembled geometry may not.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.positions.len() != self.texture_coordinates.len() {
            return Err(ShapeError::invalid(
                "geometry",
                format!(
                    "{} positions but {} texture coordinates",
                    self.positions.len(),
                    self.texture_coordinates.len()
                ),
            ));
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(ShapeError::invalid(
                "geometry",
                format!(
                    "index {index} is out of range for {} vertices",
                    self.positions.len()
                ),
            ));
        }
        Ok(())
    }
}

fn bounding_box_uvs(points: &[Point]) -> Vec<Point2D<f32>> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let w = (max_x - min_x).max(1e-6);
    let h = (max_y - min_y).max(1e-6);

    points
        .iter()
        .map(|p| Point2D::new((p.x - min_x) / w, (p.y - min_y) / h))
        .collect()
}

fn sequential_indices(n: usize) -> Vec<u32> {
    (0..n as u32).collect()
}

fn require_finite(primitive: &'static str, points: &[Point]) -> Result<(), ShapeError> {
    if points.iter().all(|p| p.x.is_finite() && p.y.is_finite()) {
        Ok(())
    } else {
        Err(ShapeError::invalid(primitive, "positions must be finite"))
    }
}

fn require_at_least(
    primitive: &'static str,
    what: &str,
    actual: usize,
    minimum: usize,
) -> Result<(), ShapeError> {
    if actual < minimum {
        Err(ShapeError::invalid(
            primitive,
            format!("needs at least {minimum} {what}, got {actual}"),
        ))
    } else {
        Ok(())
    }
}

fn require_non_negative(primitive: &'static str, what: &str, value: f32) -> Result<(), ShapeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ShapeError::invalid(
            primitive,
            format!("{what} must be finite and non-negative, got {value}"),
        ))
    }
}

pub fn point(position: Point) -> Result<Geometry, ShapeError> {
    points(&[position])
}

pub fn points(positions: &[Point]) -> Result<Geometry, ShapeError> {
    require_at_least("points", "point", positions.len(), 1)?;
    require_finite("points", positions)?;
    Ok(Geometry::from_points(
        positions,
        sequential_indices(positions.len()),
        Topology::Points,
    ))
}

/// Three vertices in input order; the caller controls the winding.
pub fn triangle(a: Point, b: Point, c: Point) -> Result<Geometry, ShapeError> {
    let corners = [a, b, c];
    require_finite("triangle", &corners)?;
    Ok(Geometry::from_points(
        &corners,
        vec![0, 1, 2],
        Topology::TriangleList,
    ))
}

/// Axis-aligned rectangle emitted as a four-vertex strip: top-left, top-right, bottom-left,
/// bottom-right.
pub fn rectangle(top_left: Point, size: Size) -> Result<Geometry, ShapeError> {
    require_non_negative("rectangle", "width", size.width)?;
    require_non_negative("rectangle", "height", size.height)?;
    quad(
        top_left,
        Point::new(top_left.x + size.width, top_left.y),
        Point::new(top_left.x + size.width, top_left.y + size.height),
        Point::new(top_left.x, top_left.y + size.height),
    )
}

/// Arbitrary quad from four corners given clockwise from the top-left. The corners are stored
/// in strip order (top-left, top-right, bottom-left, bottom-right).
pub fn quad(
    top_left: Point,
    top_right: Point,
    bottom_right: Point,
    bottom_left: Point,
) -> Result<Geometry, ShapeError> {
    let corners = [top_left, top_right, bottom_left, bottom_right];
    require_finite("quad", &corners)?;
    Ok(Geometry::from_points(
        &corners,
        vec![0, 1, 2, 3],
        Topology::TriangleStrip,
    ))
}

pub fn circle(center: Point, radius: f32, n_outer_vertices: usize) -> Result<Geometry, ShapeError> {
    ellipse(center, radius, radius, n_outer_vertices)
}

/// Center vertex followed by `n_outer_vertices` perimeter vertices at angles `2π·i/n`,
/// triangulated as a fan around the center.
pub fn ellipse(
    center: Point,
    x_radius: f32,
    y_radius: f32,
    n_outer_vertices: usize,
) -> Result<Geometry, ShapeError> {
    require_at_least("ellipse", "outer vertices", n_outer_vertices, 3)?;
    require_finite("ellipse", &[center])?;
    require_non_negative("ellipse", "x radius", x_radius)?;
    require_non_negative("ellipse", "y radius", y_radius)?;

    let mut positions = Vec::with_capacity(n_outer_vertices + 1);
    positions.push(center);
    positions.extend(perimeter(center, x_radius, y_radius, n_outer_vertices));

    let n = n_outer_vertices as u32;
    let mut indices = Vec::with_capacity(n_outer_vertices * 3);
    for i in 0..n {
        indices.extend_from_slice(&[0, 1 + i, 1 + (i + 1) % n]);
    }

    Ok(Geometry::from_points(
        &positions,
        indices,
        Topology::TriangleList,
    ))
}

fn perimeter(
    center: Point,
    x_radius: f32,
    y_radius: f32,
    n: usize,
) -> impl Iterator<Item = Point> {
    (0..n).map(move |i| {
        let angle = TAU * i as f32 / n as f32;
        Point::new(
            center.x + x_radius * angle.cos(),
            center.y + y_radius * angle.sin(),
        )
    })
}

pub fn line(a: Point, b: Point) -> Result<Geometry, ShapeError> {
    lines(&[(a, b)])
}

/// Independent segments; consecutive pairs share no vertices.
pub fn lines(segments: &[(Point, Point)]) -> Result<Geometry, ShapeError> {
    require_at_least("lines", "segment", segments.len(), 1)?;
    let positions: Vec<Point> = segments.iter().flat_map(|(a, b)| [*a, *b]).collect();
    require_finite("lines", &positions)?;
    Ok(Geometry::from_points(
        &positions,
        sequential_indices(positions.len()),
        Topology::Lines,
    ))
}

pub fn line_strip(positions: &[Point]) -> Result<Geometry, ShapeError> {
    require_at_least("line strip", "points", positions.len(), 2)?;
    require_finite("line strip", positions)?;
    Ok(Geometry::from_points(
        positions,
        sequential_indices(positions.len()),
        Topology::LineStrip,
    ))
}

/// Arithmetic mean of `points`, or the origin for an empty slice.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::origin();
    }
    let n = points.len() as f32;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    Point::new(sum_x / n, sum_y / n)
}

/// Orders `points` by the angle of `point - centroid`. The sort is stable, so points at the
/// same angle keep their input order, and sorting an already sorted set is a no-op.
pub fn sort_by_angle(points: &[Point]) -> Vec<Point> {
    let center = centroid(points);
    let mut keyed: Vec<(f32, Point)> = points
        .iter()
        .map(|p| ((p.y - center.y).atan2(p.x - center.x), *p))
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Polygon through `positions`, reordered by [`sort_by_angle`] and triangulated as a fan around
/// the centroid, which is stored as vertex 0 ahead of the sorted points.
///
/// The fill is exact for any input that is star-shaped around its centroid, convex input
/// included. Other concave input keeps the angular ordering, so its outline is not the one the
/// points were given in.
pub fn polygon(positions: &[Point]) -> Result<Geometry, ShapeError> {
    require_at_least("polygon", "points", positions.len(), 3)?;
    require_finite("polygon", positions)?;

    let sorted = sort_by_angle(positions);
    let mut fan = Vec::with_capacity(sorted.len() + 1);
    fan.push(centroid(positions));
    fan.extend_from_slice(&sorted);

    let n = sorted.len() as u32;
    let mut indices = Vec::with_capacity(sorted.len() * 3);
    for i in 0..n {
        indices.extend_from_slice(&[0, 1 + i, 1 + (i + 1) % n]);
    }

    Ok(Geometry::from_points(&fan, indices, Topology::TriangleList))
}

/// Border of a rectangle: the outer rectangle and the rectangle inset by `x_width` and
/// `y_width`, joined by two triangles per side.
///
/// Vertices 0-3 are the outer corners and 4-7 the inner corners, both clockwise from the
/// top-left.
pub fn rectangle_frame(
    top_left: Point,
    outer_size: Size,
    x_width: f32,
    y_width: f32,
) -> Result<Geometry, ShapeError> {
    require_finite("rectangle frame", &[top_left])?;
    require_non_negative("rectangle frame", "width", outer_size.width)?;
    require_non_negative("rectangle frame", "height", outer_size.height)?;
    require_non_negative("rectangle frame", "x border width", x_width)?;
    require_non_negative("rectangle frame", "y border width", y_width)?;
    if 2.0 * x_width > outer_size.width || 2.0 * y_width > outer_size.height {
        return Err(ShapeError::invalid(
            "rectangle frame",
            format!(
                "border {x_width}x{y_width} does not fit into {}x{}",
                outer_size.width, outer_size.height
            ),
        ));
    }

    let (x0, y0) = (top_left.x, top_left.y);
    let (x1, y1) = (x0 + outer_size.width, y0 + outer_size.height);
    let positions = [
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
        Point::new(x0 + x_width, y0 + y_width),
        Point::new(x1 - x_width, y0 + y_width),
        Point::new(x1 - x_width, y1 - y_width),
        Point::new(x0 + x_width, y1 - y_width),
    ];

    let mut indices = Vec::with_capacity(24);
    for side in 0..4u32 {
        let next = (side + 1) % 4;
        indices.extend_from_slice(&[side, next, 4 + side, 4 + side, next, 4 + next]);
    }

    Ok(Geometry::from_points(&positions, indices, Topology::TriangleList))
}

pub fn circular_ring(
    center: Point,
    outer_radius: f32,
    thickness: f32,
    n_outer_vertices: usize,
) -> Result<Geometry, ShapeError> {
    elliptic_ring(
        center,
        outer_radius,
        outer_radius,
        thickness,
        thickness,
        n_outer_vertices,
    )
}

/// Two concentric vertex rings joined into a band of quads. Vertex `2i` lies on the outer ring
/// and vertex `2i + 1` on the inner ring at the same angle.
pub fn elliptic_ring(
    center: Point,
    x_radius: f32,
    y_radius: f32,
    x_thickness: f32,
    y_thickness: f32,
    n_outer_vertices: usize,
) -> Result<Geometry, ShapeError> {
    const PRIMITIVE: &str = "elliptic ring";
    require_at_least(PRIMITIVE, "outer vertices", n_outer_vertices, 3)?;
    require_finite(PRIMITIVE, &[center])?;
    require_non_negative(PRIMITIVE, "x radius", x_radius)?;
    require_non_negative(PRIMITIVE, "y radius", y_radius)?;
    require_non_negative(PRIMITIVE, "x thickness", x_thickness)?;
    require_non_negative(PRIMITIVE, "y thickness", y_thickness)?;
    if x_thickness > x_radius || y_thickness > y_radius {
        return Err(ShapeError::invalid(
            PRIMITIVE,
            "thickness cannot exceed the outer radius",
        ));
    }

    let outer = perimeter(center, x_radius, y_radius, n_outer_vertices);
    let inner = perimeter(
        center,
        x_radius - x_thickness,
        y_radius - y_thickness,
        n_outer_vertices,
    );
    let positions: Vec<Point> = outer.zip(inner).flat_map(|(o, i)| [o, i]).collect();

    let n = n_outer_vertices as u32;
    let mut indices = Vec::with_capacity(n_outer_vertices * 6);
    for i in 0..n {
        let outer_current = 2 * i;
        let inner_current = 2 * i + 1;
        let outer_next = 2 * ((i + 1) % n);
        let inner_next = outer_next + 1;
        indices.extend_from_slice(&[
            outer_current,
            inner_current,
            outer_next,
            inner_current,
            inner_next,
            outer_next,
        ]);
    }

    Ok(Geometry::from_points(&positions, indices, Topology::TriangleList))
}

/// Closed outline through `positions` in the given order. The loop is closed by repeating the
/// first index at the end of the strip.
pub fn wireframe(positions: &[Point]) -> Result<Geometry, ShapeError> {
    require_at_least("wireframe", "points", positions.len(), 2)?;
    require_finite("wireframe", positions)?;
    Ok(Geometry::from_points(
        positions,
        closed_loop_indices(positions.len()),
        Topology::LineStrip,
    ))
}

pub(crate) fn closed_loop_indices(n: usize) -> Vec<u32> {
    let mut indices = sequential_indices(n);
    if n > 0 {
        indices.push(0);
    }
    indices
}
