//! The `shape` module ties tessellation, per-vertex state and drawing together.
//!
//! A [`Shape`] is re-tessellated by one of the `as_*` methods, edited vertex by vertex, moved as
//! a whole, and drawn with [`Shape::render`]. Only the vertex channels that changed since the
//! last draw are uploaded again.
//!
//! # Examples
//!
//! ```rust
//! use vecshape::lyon::math::{point, Angle, Size};
//! use vecshape::{Color, Shape, Topology};
//!
//! let mut shape = Shape::circle(point(0.5, 0.5), 0.25, 32).unwrap();
//! assert_eq!(shape.n_vertices(), 33);
//!
//! // Re-tessellate in place.
//! shape
//!     .as_rectangle(point(0.1, 0.1), Size::new(0.2, 0.4))
//!     .unwrap();
//! assert_eq!(shape.topology(), Topology::TriangleStrip);
//!
//! shape.set_vertex_color(0, Color::rgb(1.0, 0.0, 0.0)).unwrap();
//! shape.set_centroid(point(0.5, 0.5));
//! shape.rotate(Angle::degrees(45.0), None);
//!
//! // Invalid input is rejected and the shape keeps its geometry.
//! assert!(shape.as_circle(point(0.0, 0.0), 1.0, 2).is_err());
//! assert_eq!(shape.n_vertices(), 4);
//! ```

use crate::buffer_sync::{BufferSync, DirtyFlags};
use crate::context::RenderContext;
use crate::error::ShapeError;
use crate::geometry::{self, closed_loop_indices, Geometry, Topology};
use crate::shader::{Shader, ShapeUniforms};
use crate::texture::Texture;
use crate::transform::GlTransform;
use crate::vertex::{Channel, Vertex};
use crate::Color;
use lyon::geom::euclid::default::{Point2D, Point3D};
use lyon::math::{Angle, Box2D, Point, Size};
use std::sync::Arc;
use tracing::{trace, warn};

/// A tessellated 2D primitive with its own GPU buffers.
///
/// A fresh shape has no vertices, is visible, has a white color multiplier and no texture.
#[derive(Debug)]
pub struct Shape {
    sync: BufferSync,
    color: Color,
    visible: bool,
    texture: Option<Arc<Texture>>,
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}

impl Shape {
    pub fn new() -> Self {
        Self {
            sync: BufferSync::new(),
            color: Color::WHITE,
            visible: true,
            texture: None,
        }
    }

    fn from_geometry(geometry: Result<Geometry, ShapeError>) -> Result<Self, ShapeError> {
        let mut shape = Self::new();
        shape.apply(geometry)?;
        Ok(shape)
    }

    fn apply(&mut self, geometry: Result<Geometry, ShapeError>) -> Result<(), ShapeError> {
        geometry
            .and_then(|geometry| {
                trace!(
                    "Re-tessellated shape into {} vertices ({:?})",
                    geometry.len(),
                    geometry.topology
                );
                self.sync.replace_geometry(geometry)
            })
            .inspect_err(|error| warn!("{}", error))
    }

    // ===== Constructors =====

    pub fn point(position: Point) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::point(position))
    }

    pub fn points(positions: &[Point]) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::points(positions))
    }

    pub fn triangle(a: Point, b: Point, c: Point) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::triangle(a, b, c))
    }

    pub fn rectangle(top_left: Point, size: Size) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::rectangle(top_left, size))
    }

    pub fn quad(
        top_left: Point,
        top_right: Point,
        bottom_right: Point,
        bottom_left: Point,
    ) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::quad(
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        ))
    }

    pub fn circle(center: Point, radius: f32, n_outer_vertices: usize) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::circle(center, radius, n_outer_vertices))
    }

    pub fn ellipse(
        center: Point,
        x_radius: f32,
        y_radius: f32,
        n_outer_vertices: usize,
    ) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::ellipse(
            center,
            x_radius,
            y_radius,
            n_outer_vertices,
        ))
    }

    pub fn line(a: Point, b: Point) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::line(a, b))
    }

    pub fn lines(segments: &[(Point, Point)]) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::lines(segments))
    }

    pub fn line_strip(positions: &[Point]) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::line_strip(positions))
    }

    pub fn polygon(positions: &[Point]) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::polygon(positions))
    }

    pub fn rectangle_frame(
        top_left: Point,
        outer_size: Size,
        x_width: f32,
        y_width: f32,
    ) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::rectangle_frame(
            top_left, outer_size, x_width, y_width,
        ))
    }

    pub fn circular_ring(
        center: Point,
        outer_radius: f32,
        thickness: f32,
        n_outer_vertices: usize,
    ) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::circular_ring(
            center,
            outer_radius,
            thickness,
            n_outer_vertices,
        ))
    }

    pub fn elliptic_ring(
        center: Point,
        x_radius: f32,
        y_radius: f32,
        x_thickness: f32,
        y_thickness: f32,
        n_outer_vertices: usize,
    ) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::elliptic_ring(
            center,
            x_radius,
            y_radius,
            x_thickness,
            y_thickness,
            n_outer_vertices,
        ))
    }

    pub fn wireframe(positions: &[Point]) -> Result<Self, ShapeError> {
        Self::from_geometry(geometry::wireframe(positions))
    }

    // ===== Re-tessellation =====
    //
    // Every `as_*` method either replaces the whole geometry and resets vertex colors to white,
    // or fails with `ShapeError::InvalidArgument` and leaves the shape untouched.

    pub fn as_point(&mut self, position: Point) -> Result<(), ShapeError> {
        self.apply(geometry::point(position))
    }

    pub fn as_points(&mut self, positions: &[Point]) -> Result<(), ShapeError> {
        self.apply(geometry::points(positions))
    }

    pub fn as_triangle(&mut self, a: Point, b: Point, c: Point) -> Result<(), ShapeError> {
        self.apply(geometry::triangle(a, b, c))
    }

    pub fn as_rectangle(&mut self, top_left: Point, size: Size) -> Result<(), ShapeError> {
        self.apply(geometry::rectangle(top_left, size))
    }

    /// Quad from four explicit corners, clockwise from the top-left.
    pub fn as_quad(
        &mut self,
        top_left: Point,
        top_right: Point,
        bottom_right: Point,
        bottom_left: Point,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::quad(
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        ))
    }

    pub fn as_circle(
        &mut self,
        center: Point,
        radius: f32,
        n_outer_vertices: usize,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::circle(center, radius, n_outer_vertices))
    }

    pub fn as_ellipse(
        &mut self,
        center: Point,
        x_radius: f32,
        y_radius: f32,
        n_outer_vertices: usize,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::ellipse(
            center,
            x_radius,
            y_radius,
            n_outer_vertices,
        ))
    }

    pub fn as_line(&mut self, a: Point, b: Point) -> Result<(), ShapeError> {
        self.apply(geometry::line(a, b))
    }

    pub fn as_lines(&mut self, segments: &[(Point, Point)]) -> Result<(), ShapeError> {
        self.apply(geometry::lines(segments))
    }

    pub fn as_line_strip(&mut self, positions: &[Point]) -> Result<(), ShapeError> {
        self.apply(geometry::line_strip(positions))
    }

    /// See [`geometry::polygon`] for how the points are ordered and triangulated.
    pub fn as_polygon(&mut self, positions: &[Point]) -> Result<(), ShapeError> {
        self.apply(geometry::polygon(positions))
    }

    pub fn as_rectangle_frame(
        &mut self,
        top_left: Point,
        outer_size: Size,
        x_width: f32,
        y_width: f32,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::rectangle_frame(
            top_left, outer_size, x_width, y_width,
        ))
    }

    pub fn as_circular_ring(
        &mut self,
        center: Point,
        outer_radius: f32,
        thickness: f32,
        n_outer_vertices: usize,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::circular_ring(
            center,
            outer_radius,
            thickness,
            n_outer_vertices,
        ))
    }

    pub fn as_elliptic_ring(
        &mut self,
        center: Point,
        x_radius: f32,
        y_radius: f32,
        x_thickness: f32,
        y_thickness: f32,
        n_outer_vertices: usize,
    ) -> Result<(), ShapeError> {
        self.apply(geometry::elliptic_ring(
            center,
            x_radius,
            y_radius,
            x_thickness,
            y_thickness,
            n_outer_vertices,
        ))
    }

    pub fn as_wireframe(&mut self, positions: &[Point]) -> Result<(), ShapeError> {
        self.apply(geometry::wireframe(positions))
    }

    /// Outline of `other`: its vertices, with their colors and texture coordinates, connected
    /// in order and closed back to the first one.
    ///
    /// The loop follows the vertex order of `other`, not its visual outline. A rectangle is
    /// stored in strip order (top-left, top-right, bottom-left, bottom-right), so its wireframe
    /// crosses itself along a diagonal. Circles, ellipses and polygons store their center first,
    /// so their loop starts and ends at the center.
    pub fn as_wireframe_of(&mut self, other: &Shape) -> Result<(), ShapeError> {
        let vertices = other.sync.store().vertices();
        if vertices.len() < 2 {
            let error = ShapeError::invalid(
                "wireframe",
                format!("needs at least 2 points, got {}", vertices.len()),
            );
            warn!("{}", error);
            return Err(error);
        }

        let indices = closed_loop_indices(vertices.len());
        self.sync
            .replace_vertices(vertices.to_vec(), indices, Topology::LineStrip);
        Ok(())
    }

    // ===== Vertices =====

    pub fn n_vertices(&self) -> usize {
        self.sync.store().len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.sync.store().vertices()
    }

    pub fn indices(&self) -> &[u32] {
        self.sync.store().indices()
    }

    pub fn topology(&self) -> Topology {
        self.sync.store().topology()
    }

    pub fn vertex_position(&self, index: usize) -> Result<Point3D<f32>, ShapeError> {
        Ok(self.checked_vertex(index)?.position)
    }

    pub fn vertex_color(&self, index: usize) -> Result<Color, ShapeError> {
        Ok(self.checked_vertex(index)?.color)
    }

    pub fn vertex_texture_coordinate(&self, index: usize) -> Result<Point2D<f32>, ShapeError> {
        Ok(self.checked_vertex(index)?.texture_coordinate)
    }

    fn checked_vertex(&self, index: usize) -> Result<&Vertex, ShapeError> {
        self.sync
            .store()
            .vertex(index)
            .inspect_err(|error| warn!("{}", error))
    }

    pub fn set_vertex_position(
        &mut self,
        index: usize,
        position: Point3D<f32>,
    ) -> Result<(), ShapeError> {
        self.sync
            .set_vertex_position(index, position)
            .inspect_err(|error| warn!("{}", error))
    }

    pub fn set_vertex_color(&mut self, index: usize, color: Color) -> Result<(), ShapeError> {
        self.sync
            .set_vertex_color(index, color)
            .inspect_err(|error| warn!("{}", error))
    }

    pub fn set_vertex_texture_coordinate(
        &mut self,
        index: usize,
        texture_coordinate: Point2D<f32>,
    ) -> Result<(), ShapeError> {
        self.sync
            .set_vertex_texture_coordinate(index, texture_coordinate)
            .inspect_err(|error| warn!("{}", error))
    }

    /// Channels whose GPU copy is out of date.
    pub fn dirty(&self) -> DirtyFlags {
        self.sync.dirty()
    }

    pub fn buffer_sync(&self) -> &BufferSync {
        &self.sync
    }

    // ===== Placement =====

    /// Axis-aligned bounds of all positions; a zero box at the origin when there are none.
    pub fn bounding_box(&self) -> Box2D {
        if self.n_vertices() == 0 {
            return Box2D::zero();
        }
        Box2D::from_points(self.vertices().iter().map(|v| v.position.to_2d()))
    }

    /// Mean of all positions, or the origin when there are none.
    pub fn centroid(&self) -> Point {
        let positions: Vec<Point> = self.vertices().iter().map(|v| v.position.to_2d()).collect();
        geometry::centroid(&positions)
    }

    pub fn size(&self) -> Size {
        self.bounding_box().size()
    }

    pub fn top_left(&self) -> Point {
        self.bounding_box().min
    }

    /// Moves every vertex so the centroid ends up at `position`.
    pub fn set_centroid(&mut self, position: Point) {
        let delta = position - self.centroid();
        self.sync.translate_all(delta);
    }

    /// Moves every vertex so the bounding box's top-left corner ends up at `position`.
    pub fn set_top_left(&mut self, position: Point) {
        let delta = position - self.top_left();
        self.sync.translate_all(delta);
    }

    /// Rotates every position around `pivot`, or around the centroid when `pivot` is `None`.
    pub fn rotate(&mut self, angle: Angle, pivot: Option<Point>) {
        let pivot = pivot.unwrap_or_else(|| self.centroid());
        let rotation = GlTransform::identity().then_rotate(angle, pivot);
        self.sync
            .map_positions(|position| rotation.apply_to(position).unwrap_or(position));
    }

    // ===== Appearance =====

    /// Color every fragment of the shape is multiplied with. Does not touch vertex colors.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_texture(&mut self, texture: Option<Arc<Texture>>) {
        self.texture = texture;
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    // ===== Drawing =====

    /// Records one indexed draw of this shape into `pass`.
    ///
    /// Dirty channels are uploaded first. `transform` and the shape color are written to the
    /// shape's uniform buffer, so the values in effect are the ones written last before the
    /// command buffer is submitted.
    ///
    /// Returns `false` without touching the GPU when the shape is invisible, and without
    /// drawing when it has no vertices.
    pub fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        shader: &Shader,
        transform: &GlTransform,
    ) -> bool {
        if !self.visible {
            return false;
        }

        self.sync.flush(ctx);
        let index_count = self.indices().len() as u32;
        if index_count == 0 {
            return false;
        }

        let uniforms = ShapeUniforms::new(transform, self.color);
        self.sync.write_uniforms(
            ctx,
            shader.shape_uniform_layout(),
            bytemuck::bytes_of(&uniforms),
        );

        let Some(gpu) = self.sync.gpu() else {
            return false;
        };
        let (Some(indices), Some(uniform_binding)) = (gpu.indices(), gpu.uniforms()) else {
            return false;
        };

        pass.set_pipeline(shader.pipeline(self.topology()));
        pass.set_bind_group(0, &uniform_binding.bind_group, &[]);
        match &self.texture {
            Some(texture) => texture.bind(pass, 1),
            None => shader.fallback_texture().bind(pass, 1),
        }
        pass.set_bind_group(2, shader.uniform_bind_group(), &[]);

        for channel in Channel::ALL {
            let Some(buffer) = gpu.channel(channel) else {
                return false;
            };
            pass.set_vertex_buffer(channel.location(), buffer.slice(..));
        }
        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..index_count, 0, 0..1);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_sync::ChannelSink;
    use lyon::math::point;
    use std::f32::consts::TAU;

    const EPSILON: f32 = 1e-4;

    #[derive(Default)]
    struct RecordingSink {
        channels: Vec<Channel>,
        index_uploads: usize,
    }

    impl ChannelSink for RecordingSink {
        fn upload_channel(&mut self, channel: Channel, _data: &[f32]) {
            self.channels.push(channel);
        }

        fn upload_indices(&mut self, _indices: &[u32]) {
            self.index_uploads += 1;
        }
    }

    fn flush(shape: &mut Shape) -> RecordingSink {
        let mut sink = RecordingSink::default();
        shape.sync.flush_into(&mut sink);
        sink
    }

    fn sample_shapes() -> Vec<Shape> {
        vec![
            Shape::point(point(0.3, 0.7)).unwrap(),
            Shape::triangle(point(0.0, 0.0), point(1.0, 0.2), point(0.4, 0.9)).unwrap(),
            Shape::rectangle(point(0.1, 0.2), Size::new(0.3, 0.4)).unwrap(),
            Shape::circle(point(0.5, 0.5), 0.25, 32).unwrap(),
            Shape::polygon(&[
                point(0.1, 0.1),
                point(0.9, 0.2),
                point(0.8, 0.8),
                point(0.2, 0.7),
            ])
            .unwrap(),
            Shape::circular_ring(point(0.0, 0.0), 1.0, 0.2, 8).unwrap(),
            Shape::rectangle_frame(point(0.0, 0.0), Size::new(1.0, 1.0), 0.1, 0.2).unwrap(),
        ]
    }

    #[test]
    fn new_shape_defaults() {
        let shape = Shape::new();
        assert_eq!(shape.n_vertices(), 0);
        assert!(shape.is_visible());
        assert_eq!(shape.color(), Color::WHITE);
        assert!(shape.texture().is_none());
    }

    #[test]
    fn bounding_box_contains_every_vertex() {
        for shape in sample_shapes() {
            let bounds = shape.bounding_box();
            for vertex in shape.vertices() {
                let p = vertex.position;
                assert!(
                    bounds.min.x <= p.x
                        && p.x <= bounds.max.x
                        && bounds.min.y <= p.y
                        && p.y <= bounds.max.y,
                    "{:?} outside {:?}",
                    p,
                    bounds
                );
            }
            assert_eq!(shape.size(), bounds.size());
            assert_eq!(shape.top_left(), bounds.min);
        }
    }

    #[test]
    fn empty_shape_has_zero_bounds() {
        let shape = Shape::new();
        assert_eq!(shape.bounding_box(), Box2D::zero());
        assert_eq!(shape.centroid(), Point::origin());
        assert_eq!(shape.size(), Size::zero());
    }

    #[test]
    fn set_centroid_round_trips() {
        for mut shape in sample_shapes() {
            let target = point(0.42, -1.5);
            shape.set_centroid(target);
            assert!((shape.centroid() - target).length() < EPSILON);
        }
    }

    #[test]
    fn set_top_left_moves_bounds() {
        let mut shape = Shape::circle(point(0.5, 0.5), 0.25, 16).unwrap();
        let size = shape.size();
        shape.set_top_left(point(0.0, 0.0));
        assert!((shape.top_left() - point(0.0, 0.0)).length() < EPSILON);
        assert!((shape.size().width - size.width).abs() < EPSILON);
    }

    #[test]
    fn full_turns_leave_positions_in_place() {
        let mut shape = Shape::rectangle(point(0.2, 0.3), Size::new(0.4, 0.1)).unwrap();
        let original: Vec<Point3D<f32>> = shape.vertices().iter().map(|v| v.position).collect();

        shape.rotate(Angle::radians(0.0), None);
        for (vertex, before) in shape.vertices().iter().zip(&original) {
            assert!((vertex.position - *before).length() < EPSILON);
        }

        shape.rotate(Angle::radians(TAU), None);
        for (vertex, before) in shape.vertices().iter().zip(&original) {
            assert!((vertex.position - *before).length() < EPSILON);
        }
    }

    #[test]
    fn rotation_about_pivot() {
        let mut shape = Shape::line(point(1.0, 0.0), point(2.0, 0.0)).unwrap();
        flush(&mut shape);
        shape.rotate(Angle::degrees(90.0), Some(point(0.0, 0.0)));
        let p = shape.vertex_position(1).unwrap();
        assert!((p - Point3D::new(0.0, 2.0, 0.0)).length() < EPSILON);
        assert_eq!(
            shape.dirty(),
            DirtyFlags {
                position: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn vertex_color_change_uploads_only_colors() {
        let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
        let first = flush(&mut shape);
        assert_eq!(first.channels, Channel::ALL.to_vec());
        assert_eq!(first.index_uploads, 1);

        let positions: Vec<Point3D<f32>> = shape.vertices().iter().map(|v| v.position).collect();
        let uvs: Vec<Point2D<f32>> = shape
            .vertices()
            .iter()
            .map(|v| v.texture_coordinate)
            .collect();

        shape.set_vertex_color(2, Color::BLACK).unwrap();
        let second = flush(&mut shape);
        assert_eq!(second.channels, vec![Channel::Color]);
        assert_eq!(second.index_uploads, 0);

        assert_eq!(shape.vertex_color(2).unwrap(), Color::BLACK);
        for (i, vertex) in shape.vertices().iter().enumerate() {
            assert_eq!(vertex.position, positions[i]);
            assert_eq!(vertex.texture_coordinate, uvs[i]);
        }

        assert!(flush(&mut shape).channels.is_empty());
    }

    #[test]
    fn shape_color_does_not_touch_vertices() {
        let mut shape = Shape::triangle(point(0.0, 0.0), point(1.0, 0.0), point(0.0, 1.0)).unwrap();
        flush(&mut shape);
        shape.set_color(Color::rgba(1.0, 0.0, 0.0, 0.5));
        shape.set_visible(false);
        assert!(!shape.dirty().any());
        assert!(shape.vertices().iter().all(|v| v.color == Color::WHITE));
        assert!(!shape.is_visible());
    }

    #[test]
    fn ring_end_to_end() {
        let mut shape = Shape::new();
        shape
            .as_circular_ring(point(0.0, 0.0), 1.0, 0.2, 8)
            .unwrap();
        assert_eq!(shape.n_vertices(), 16);
        assert_eq!(shape.topology(), Topology::TriangleList);
        assert_eq!(shape.indices().len(), 48);

        for (i, vertex) in shape.vertices().iter().enumerate() {
            let radius = vertex.position.to_2d().to_vector().length();
            let expected = if i % 2 == 0 { 1.0 } else { 0.8 };
            assert!((radius - expected).abs() < EPSILON, "vertex {}", i);
        }
        assert!(shape.centroid().to_vector().length() < EPSILON);
    }

    #[test]
    fn rejected_input_keeps_previous_state() {
        let mut shape = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
        shape.set_vertex_color(1, Color::BLACK).unwrap();
        flush(&mut shape);
        let before = shape.vertices().to_vec();

        assert!(matches!(
            shape.as_circle(point(0.0, 0.0), 1.0, 2),
            Err(ShapeError::InvalidArgument { .. })
        ));
        assert!(shape.as_polygon(&[point(0.0, 0.0), point(1.0, 1.0)]).is_err());
        assert!(shape.as_circle(point(0.0, 0.0), -1.0, 8).is_err());
        assert!(shape.as_line_strip(&[point(0.0, 0.0)]).is_err());
        assert!(shape
            .as_circular_ring(point(0.0, 0.0), 1.0, 2.0, 8)
            .is_err());

        assert_eq!(shape.vertices(), before.as_slice());
        assert_eq!(shape.topology(), Topology::TriangleStrip);
        assert!(!shape.dirty().any());
    }

    #[test]
    fn out_of_bounds_vertex_access_fails() {
        let mut shape = Shape::triangle(point(0.0, 0.0), point(1.0, 0.0), point(0.0, 1.0)).unwrap();
        flush(&mut shape);
        assert_eq!(
            shape.vertex_position(3),
            Err(ShapeError::VertexOutOfBounds { index: 3, len: 3 })
        );
        assert!(shape.set_vertex_color(3, Color::BLACK).is_err());
        assert!(shape
            .set_vertex_texture_coordinate(7, Point2D::new(0.0, 0.0))
            .is_err());
        assert!(!shape.dirty().any());
    }

    #[test]
    fn wireframe_of_other_shape_closes_loop() {
        let mut source = Shape::rectangle(point(0.0, 0.0), Size::new(1.0, 1.0)).unwrap();
        source.set_vertex_color(3, Color::BLACK).unwrap();

        let mut outline = Shape::new();
        outline.as_wireframe_of(&source).unwrap();
        assert_eq!(outline.topology(), Topology::LineStrip);
        assert_eq!(outline.indices(), &[0, 1, 2, 3, 0]);
        assert_eq!(outline.vertices(), source.vertices());
        assert_eq!(outline.vertex_color(3).unwrap(), Color::BLACK);

        assert!(outline.as_wireframe_of(&Shape::new()).is_err());
        assert_eq!(outline.n_vertices(), 4);
    }

    #[test]
    fn wireframe_of_fan_shape_starts_at_center() {
        let circle = Shape::circle(point(0.5, 0.5), 0.25, 6).unwrap();
        let mut outline = Shape::new();
        outline.as_wireframe_of(&circle).unwrap();

        assert_eq!(outline.n_vertices(), 7);
        assert_eq!(
            outline.vertex_position(0).unwrap(),
            Point3D::new(0.5, 0.5, 0.0)
        );
        assert_eq!(outline.indices().first(), Some(&0));
        assert_eq!(outline.indices().last(), Some(&0));
        assert_eq!(outline.indices().len(), 8);
    }

    #[test]
    fn retessellation_resets_vertex_colors_and_marks_everything() {
        let mut shape = Shape::point(point(0.0, 0.0)).unwrap();
        shape.set_vertex_color(0, Color::BLACK).unwrap();
        flush(&mut shape);

        shape
            .as_ellipse(point(0.5, 0.5), 0.4, 0.2, 12)
            .unwrap();
        assert_eq!(shape.n_vertices(), 13);
        assert!(shape.vertices().iter().all(|v| v.color == Color::WHITE));
        assert_eq!(shape.dirty(), DirtyFlags::all());
        assert_eq!(flush(&mut shape).index_uploads, 1);
    }
}
