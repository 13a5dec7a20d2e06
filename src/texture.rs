use crate::context::RenderContext;
use crate::error::TextureError;
use crate::image::Image;
use crate::util::{compute_padded_bytes_per_row, copy_padded_readback_rows};
use std::sync::Arc;
use tracing::{debug, warn};

/// All textures are stored as linear RGBA8 so uploads and downloads are byte exact.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Transparent black outside the texture.
    Zero,
    /// Opaque white outside the texture.
    One,
    Repeat,
    Mirror,
    /// Edge pixels are extended.
    #[default]
    Stretch,
}

impl WrapMode {
    /// Address mode and border color for this wrap mode. `Zero` and `One` need
    /// `ADDRESS_MODE_CLAMP_TO_BORDER`; when `clamp_to_border` is false they degrade to
    /// clamp-to-edge.
    pub fn address_mode(
        self,
        clamp_to_border: bool,
    ) -> (wgpu::AddressMode, Option<wgpu::SamplerBorderColor>) {
        match self {
            WrapMode::Stretch => (wgpu::AddressMode::ClampToEdge, None),
            WrapMode::Repeat => (wgpu::AddressMode::Repeat, None),
            WrapMode::Mirror => (wgpu::AddressMode::MirrorRepeat, None),
            WrapMode::Zero if clamp_to_border => (
                wgpu::AddressMode::ClampToBorder,
                Some(wgpu::SamplerBorderColor::TransparentBlack),
            ),
            WrapMode::One if clamp_to_border => (
                wgpu::AddressMode::ClampToBorder,
                Some(wgpu::SamplerBorderColor::OpaqueWhite),
            ),
            WrapMode::Zero | WrapMode::One => (wgpu::AddressMode::ClampToEdge, None),
        }
    }
}

/// Filtering used when a texture is magnified or minified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    #[default]
    Nearest,
    Linear,
}

impl From<ScaleMode> for wgpu::FilterMode {
    fn from(value: ScaleMode) -> Self {
        match value {
            ScaleMode::Nearest => wgpu::FilterMode::Nearest,
            ScaleMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

fn check_dimensions(width: u32, height: u32, max: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        Err(TextureError::ZeroSized { width, height })
    } else if width > max || height > max {
        Err(TextureError::TooLarge { width, height, max })
    } else {
        Ok(())
    }
}

/// Layout of bind group 1: the texture view at binding 0 and its sampler at binding 1.
pub fn texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// A GPU texture together with its sampler.
///
/// Shapes refer to textures through `Arc<Texture>`; set the wrap and scale modes before sharing.
/// A texture can also be used as a render target through [`Texture::view`].
#[derive(Debug)]
pub struct Texture {
    device: Arc<wgpu::Device>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
    layout: wgpu::BindGroupLayout,
    size: (u32, u32),
    wrap_mode: WrapMode,
    scale_mode: ScaleMode,
    clamp_to_border: bool,
}

impl Texture {
    /// Allocates an uninitialized `width` x `height` texture.
    ///
    /// Both dimensions must be non-zero and within the device's `max_texture_dimension_2d`.
    pub fn create(ctx: &RenderContext, width: u32, height: u32) -> Result<Self, TextureError> {
        let max = ctx.device.limits().max_texture_dimension_2d;
        check_dimensions(width, height, max).inspect_err(|error| warn!("{}", error))?;
        Ok(Self::allocate(ctx, width, height))
    }

    /// A 1x1 texture of a single color.
    pub(crate) fn solid(ctx: &RenderContext, color: crate::Color) -> Self {
        let texture = Self::allocate(ctx, 1, 1);
        texture.write_rgba8(ctx, &color.to_rgba8());
        texture
    }

    fn allocate(ctx: &RenderContext, width: u32, height: u32) -> Self {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vecshape_texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            // TEXTURE_BINDING to sample, COPY_DST to upload, COPY_SRC to download, RENDER_ATTACHMENT
            // to draw into it
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let wrap_mode = WrapMode::default();
        let scale_mode = ScaleMode::default();
        let clamp_to_border = ctx.supports_clamp_to_border();
        let sampler = create_sampler(&ctx.device, wrap_mode, scale_mode, clamp_to_border);
        let layout = texture_bind_group_layout(&ctx.device);
        let bind_group = create_bind_group(&ctx.device, &layout, &view, &sampler);

        debug!("Allocated {}x{} texture", width, height);

        Self {
            device: ctx.device.clone(),
            texture,
            view,
            bind_group,
            layout,
            size: (width, height),
            wrap_mode,
            scale_mode,
            clamp_to_border,
        }
    }

    /// Allocates a texture the size of `image` and uploads its pixels.
    pub fn from_image(ctx: &RenderContext, image: &Image) -> Result<Self, TextureError> {
        let (width, height) = image.size();
        let texture = Self::create(
            ctx,
            u32::try_from(width).unwrap_or(u32::MAX),
            u32::try_from(height).unwrap_or(u32::MAX),
        )?;
        texture.write_rgba8(ctx, &image.to_rgba8());
        Ok(texture)
    }

    fn write_rgba8(&self, ctx: &RenderContext, bytes: &[u8]) {
        let (width, height) = self.size;
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn wgpu_texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn set_wrap_mode(&mut self, mode: WrapMode) {
        if matches!(mode, WrapMode::Zero | WrapMode::One) && !self.clamp_to_border {
            warn!(
                "Wrap mode {:?} requires ADDRESS_MODE_CLAMP_TO_BORDER, falling back to clamp to edge",
                mode
            );
        }
        self.wrap_mode = mode;
        self.rebuild_sampler();
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.scale_mode = mode;
        self.rebuild_sampler();
    }

    fn rebuild_sampler(&mut self) {
        let sampler = create_sampler(
            &self.device,
            self.wrap_mode,
            self.scale_mode,
            self.clamp_to_border,
        );
        self.bind_group = create_bind_group(&self.device, &self.layout, &self.view, &sampler);
    }

    /// Binds texture and sampler at `group` of the current pipeline.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, group: u32) {
        pass.set_bind_group(group, &self.bind_group, &[]);
    }

    /// Copies the texture back into CPU memory. Blocks until the GPU is done.
    pub fn download(&self, ctx: &RenderContext) -> Result<Image, TextureError> {
        let (width, height) = self.size;
        let (unpadded_bytes_per_row, padded_bytes_per_row) = compute_padded_bytes_per_row(width, 4);

        let readback_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("texture_readback_buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("texture_download_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let mapped = map_readback_buffer(&ctx.device, &readback_buffer)?;
        let mut pixels = Vec::new();
        copy_padded_readback_rows(
            &mapped,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
            &mut pixels,
        );

        Image::from_rgba8(width as usize, height as usize, &pixels)
            .map_err(|error| TextureError::Readback(error.to_string()))
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn create_sampler(
    device: &wgpu::Device,
    wrap_mode: WrapMode,
    scale_mode: ScaleMode,
    clamp_to_border: bool,
) -> wgpu::Sampler {
    let (address_mode, border_color) = wrap_mode.address_mode(clamp_to_border);
    let filter = wgpu::FilterMode::from(scale_mode);
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("vecshape_sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("texture_bind_group"),
    })
}

fn map_readback_buffer(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, TextureError> {
    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        if sender.send(result).is_err() {
            warn!("Failed to send map_async result from callback");
        }
    });

    let _ = device.poll(wgpu::MaintainBase::Wait);

    receiver
        .recv()
        .map_err(|error| TextureError::Readback(error.to_string()))?
        .map_err(|error| TextureError::Readback(error.to_string()))?;

    let mapped_range = buffer_slice.get_mapped_range();
    let bytes = mapped_range.to_vec();
    drop(mapped_range);
    buffer.unmap();
    Ok(bytes)
}
