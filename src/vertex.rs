//! Per-vertex data and the GPU layout it is uploaded in.
//!
//! Vertices are kept on the CPU as [`Vertex`] records and uploaded as three separate flat
//! buffers, one per [`Channel`]. Every channel buffer is bound at the vertex buffer slot equal to
//! its shader location, so a shader only has to agree on the three locations below.

use crate::Color;
use lyon::geom::euclid::default::{Point2D, Point3D};

/// Shader location of the position attribute (`vec3<f32>`).
pub const POSITION_LOCATION: u32 = 0;
/// Shader location of the color attribute (`vec4<f32>`).
pub const COLOR_LOCATION: u32 = 1;
/// Shader location of the texture coordinate attribute (`vec2<f32>`).
pub const TEXTURE_COORDINATE_LOCATION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3D<f32>,
    pub color: Color,
    pub texture_coordinate: Point2D<f32>,
}

impl Vertex {
    pub fn new(position: Point3D<f32>, texture_coordinate: Point2D<f32>) -> Self {
        Self {
            position,
            color: Color::WHITE,
            texture_coordinate,
        }
    }
}

/// One independently uploaded per-vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    Color,
    TextureCoordinate,
}

impl Channel {
    pub const ALL: [Channel; 3] = [
        Channel::Position,
        Channel::Color,
        Channel::TextureCoordinate,
    ];

    /// Number of `f32` components a single vertex contributes to this channel.
    pub const fn components(self) -> usize {
        match self {
            Channel::Position => 3,
            Channel::Color => 4,
            Channel::TextureCoordinate => 2,
        }
    }

    pub const fn location(self) -> u32 {
        match self {
            Channel::Position => POSITION_LOCATION,
            Channel::Color => COLOR_LOCATION,
            Channel::TextureCoordinate => TEXTURE_COORDINATE_LOCATION,
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Channel::Position => "Position Channel Buffer",
            Channel::Color => "Color Channel Buffer",
            Channel::TextureCoordinate => "Texture Coordinate Channel Buffer",
        }
    }

    /// Appends this channel's components for `vertex` to `out`.
    pub(crate) fn pack_into(self, vertex: &Vertex, out: &mut Vec<f32>) {
        match self {
            Channel::Position => {
                out.extend_from_slice(&[vertex.position.x, vertex.position.y, vertex.position.z])
            }
            Channel::Color => out.extend_from_slice(&vertex.color.0),
            Channel::TextureCoordinate => out.extend_from_slice(&[
                vertex.texture_coordinate.x,
                vertex.texture_coordinate.y,
            ]),
        }
    }

    /// Layout of the flat buffer for this channel.
    pub fn desc(self) -> wgpu::VertexBufferLayout<'static> {
        const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![POSITION_LOCATION => Float32x3];
        const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![COLOR_LOCATION => Float32x4];
        const TEXTURE_COORDINATE_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
            wgpu::vertex_attr_array![TEXTURE_COORDINATE_LOCATION => Float32x2];

        let attributes: &'static [wgpu::VertexAttribute] = match self {
            Channel::Position => &POSITION_ATTRIBUTES,
            Channel::Color => &COLOR_ATTRIBUTES,
            Channel::TextureCoordinate => &TEXTURE_COORDINATE_ATTRIBUTES,
        };

        wgpu::VertexBufferLayout {
            array_stride: (self.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// Buffer layouts for all channels, indexed by vertex buffer slot.
pub fn channel_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    [
        Channel::Position.desc(),
        Channel::Color.desc(),
        Channel::TextureCoordinate.desc(),
    ]
}
