use std::path::PathBuf;

/// Errors returned by shape construction and per-vertex access.
///
/// A call that fails with any of these leaves the shape exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    /// Degenerate primitive parameters: too few points or subdivisions, negative or
    /// non-finite radii and widths.
    #[error("invalid argument for {primitive}: {reason}")]
    InvalidArgument {
        primitive: &'static str,
        reason: String,
    },
    /// A vertex index outside the current geometry.
    #[error("vertex index {index} is out of bounds for a shape with {len} vertices")]
    VertexOutOfBounds { index: usize, len: usize },
}

impl ShapeError {
    pub(crate) fn invalid(primitive: &'static str, reason: impl Into<String>) -> Self {
        ShapeError::InvalidArgument {
            primitive,
            reason: reason.into(),
        }
    }
}

/// Errors produced by [`crate::Image`]. None of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("pixel ({x}, {y}) is out of bounds for an image of size {width}x{height}")]
    PixelOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("pixel index {index} is out of bounds for an image with {len} pixels")]
    PixelIndexOutOfBounds { index: usize, len: usize },
    #[error("unable to load image from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    #[error("unable to save image to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    #[error("refusing to save an image of size 0x0")]
    EmptyImage,
    #[error("pixel buffer of {actual} bytes does not match {width}x{height} RGBA8")]
    BufferSizeMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroSized { width: u32, height: u32 },
    #[error("texture dimensions {width}x{height} exceed the device limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
    #[error("failed to map texture readback buffer: {0}")]
    Readback(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    /// The WGSL source failed validation. Contains the message from wgpu/naga.
    #[error("shader compilation failed: {0}")]
    Compilation(String),
    #[error("uniform `{0}` is declared more than once")]
    DuplicateUniform(String),
    #[error("uniform `{0}` is not declared by this shader")]
    UnknownUniform(String),
    #[error("uniform `{name}` is declared as {declared:?}, cannot set it as {given:?}")]
    UniformKindMismatch {
        name: String,
        declared: crate::shader::UniformKind,
        given: crate::shader::UniformKind,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("no suitable GPU adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to request a GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}
