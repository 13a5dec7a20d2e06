//! 2D vector shapes tessellated on the CPU and drawn with `wgpu`.
//!
//! A [`Shape`] keeps its vertices on the CPU and mirrors them into one GPU vertex buffer per
//! attribute. Edits mark only the attribute they touch, so changing a vertex color re-uploads
//! the color buffer and nothing else.

pub use lyon;
pub use wgpu;

pub mod buffer_sync;
mod color;
mod context;
mod error;
pub mod geometry;
mod image;
mod shader;
mod shape;
mod texture;
mod transform;
pub mod util;
mod vertex;
pub mod vertex_store;

pub use buffer_sync::{BufferSync, ChannelSink, DirtyFlags};
pub use color::Color;
pub use context::{ContextOptions, RenderContext};
pub use error::{ContextError, ImageError, ShaderError, ShapeError, TextureError};
pub use geometry::{Geometry, Topology};
pub use crate::image::Image;
pub use shader::{Shader, UniformKind};
pub use shape::Shape;
pub use texture::{ScaleMode, Texture, WrapMode, TEXTURE_FORMAT};
pub use transform::GlTransform;
pub use vertex::{
    channel_layouts, Channel, Vertex, COLOR_LOCATION, POSITION_LOCATION,
    TEXTURE_COORDINATE_LOCATION,
};

#[cfg(feature = "upload_metrics")]
pub use buffer_sync::UploadMetrics;
