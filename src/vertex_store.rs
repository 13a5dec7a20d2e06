use crate::error::ShapeError;
use crate::geometry::{Geometry, Topology};
use crate::vertex::Vertex;
use crate::Color;
use lyon::geom::euclid::default::{Point2D, Point3D};

/// CPU-side truth for one shape: vertices in draw order, the index sequence and its topology.
///
/// Every index is smaller than the number of vertices. Vertex indices stay valid until the
/// geometry is replaced.
#[derive(Debug, Clone, Default)]
pub struct VertexStore {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    topology: Topology,
}

impl VertexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole geometry. Inconsistent geometry is rejected and the store is left as
    /// it was.
    pub(crate) fn replace(&mut self, geometry: Geometry) -> Result<(), ShapeError> {
        geometry.validate()?;
        let Geometry {
            positions,
            texture_coordinates,
            indices,
            topology,
        } = geometry;

        self.vertices.clear();
        self.vertices.extend(
            positions
                .into_iter()
                .zip(texture_coordinates)
                .map(|(position, texture_coordinate)| Vertex::new(position, texture_coordinate)),
        );
        self.indices = indices;
        self.topology = topology;
        Ok(())
    }

    pub(crate) fn replace_vertices(
        &mut self,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        topology: Topology,
    ) {
        debug_assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        self.vertices = vertices;
        self.indices = indices;
        self.topology = topology;
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex(&self, index: usize) -> Result<&Vertex, ShapeError> {
        let len = self.vertices.len();
        self.vertices
            .get(index)
            .ok_or(ShapeError::VertexOutOfBounds { index, len })
    }

    fn vertex_mut(&mut self, index: usize) -> Result<&mut Vertex, ShapeError> {
        let len = self.vertices.len();
        self.vertices
            .get_mut(index)
            .ok_or(ShapeError::VertexOutOfBounds { index, len })
    }

    pub(crate) fn set_position(
        &mut self,
        index: usize,
        position: Point3D<f32>,
    ) -> Result<(), ShapeError> {
        self.vertex_mut(index)?.position = position;
        Ok(())
    }

    pub(crate) fn set_color(&mut self, index: usize, color: Color) -> Result<(), ShapeError> {
        self.vertex_mut(index)?.color = color;
        Ok(())
    }

    pub(crate) fn set_texture_coordinate(
        &mut self,
        index: usize,
        texture_coordinate: Point2D<f32>,
    ) -> Result<(), ShapeError> {
        self.vertex_mut(index)?.texture_coordinate = texture_coordinate;
        Ok(())
    }

    pub(crate) fn map_positions(&mut self, mut f: impl FnMut(Point3D<f32>) -> Point3D<f32>) {
        for vertex in self.vertices.iter_mut() {
            vertex.position = f(vertex.position);
        }
    }
}
