//! Shader programs shapes are drawn with.
//!
//! Every program sees the same interface:
//!
//! - vertex inputs at [`POSITION_LOCATION`](crate::POSITION_LOCATION) (`vec3<f32>`),
//!   [`COLOR_LOCATION`](crate::COLOR_LOCATION) (`vec4<f32>`) and
//!   [`TEXTURE_COORDINATE_LOCATION`](crate::TEXTURE_COORDINATE_LOCATION) (`vec2<f32>`);
//! - `@group(0) @binding(0)`: per-shape `{ transform: mat4x4<f32>, color: vec4<f32> }`;
//! - `@group(1)`: the shape texture at binding 0 and its sampler at binding 1;
//! - `@group(2) @binding(0)`: the user uniform block declared through [`Shader::from_wgsl`].
//!
//! Entry points are `vs_main` and `fs_main`. One pipeline is built per [`Topology`].

use crate::color::Color;
use crate::context::RenderContext;
use crate::error::ShaderError;
use crate::geometry::Topology;
use crate::texture::{texture_bind_group_layout, Texture};
use crate::transform::GlTransform;
use crate::vertex::channel_layouts;
use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_SHADER_SOURCE: &str = include_str!("./shader.wgsl");

/// Type of a user uniform, with WGSL uniform address space layout rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Transform,
}

impl UniformKind {
    pub const fn size(self) -> u64 {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::UInt => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Transform => 64,
        }
    }

    pub const fn align(self) -> u64 {
        match self {
            UniformKind::Float | UniformKind::Int | UniformKind::UInt => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 | UniformKind::Transform => 16,
        }
    }

    /// The WGSL type to declare the member with.
    pub const fn wgsl_type(self) -> &'static str {
        match self {
            UniformKind::Float => "f32",
            UniformKind::Int => "i32",
            UniformKind::UInt => "u32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Transform => "mat4x4<f32>",
        }
    }
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Per-shape uniforms at group 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ShapeUniforms {
    pub transform: [f32; 16],
    pub color: [f32; 4],
}

impl ShapeUniforms {
    pub fn new(transform: &GlTransform, color: Color) -> Self {
        Self {
            transform: transform.to_uniform(),
            color: color.to_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct UniformSlot {
    kind: UniformKind,
    offset: u64,
}

/// CPU mirror of the user uniform block, members laid out in declaration order.
#[derive(Debug, Clone)]
struct UniformBlock {
    slots: HashMap<String, UniformSlot>,
    data: Vec<u8>,
}

impl UniformBlock {
    fn default_block() -> Self {
        Self {
            slots: HashMap::new(),
            data: vec![0; 16],
        }
    }

    fn new(uniforms: &[(&str, UniformKind)]) -> Result<Self, ShaderError> {
        let mut slots = HashMap::with_capacity(uniforms.len());
        let mut cursor = 0;

        for &(name, kind) in uniforms {
            let offset = align_to(cursor, kind.align());
            if slots
                .insert(name.to_string(), UniformSlot { kind, offset })
                .is_some()
            {
                return Err(ShaderError::DuplicateUniform(name.to_string()));
            }
            cursor = offset + kind.size();
        }

        // Uniform structs are padded to 16 bytes, and an empty binding still needs a buffer.
        let size = align_to(cursor, 16).max(16);
        Ok(Self {
            slots,
            data: vec![0; size as usize],
        })
    }

    fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    /// Copies `bytes` into the member `name` and returns its offset.
    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) -> Result<u64, ShaderError> {
        let slot = self
            .slot(name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;
        if slot.kind != kind {
            return Err(ShaderError::UniformKindMismatch {
                name: name.to_string(),
                declared: slot.kind,
                given: kind,
            });
        }

        let offset = slot.offset as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(slot.offset)
    }
}

fn uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn alpha_blending() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn primitive_state(topology: Topology) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: topology.into(),
        strip_index_format: topology.is_strip().then_some(wgpu::IndexFormat::Uint32),
        cull_mode: None,
        ..Default::default()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: Topology,
) -> wgpu::RenderPipeline {
    let buffers = channel_layouts();
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("vecshape_render_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(alpha_blending()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: primitive_state(topology),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// A compiled program with one render pipeline per topology and a block of named uniforms.
#[derive(Debug)]
pub struct Shader {
    queue: Arc<wgpu::Queue>,
    pipelines: [wgpu::RenderPipeline; 5],
    shape_uniform_layout: wgpu::BindGroupLayout,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    fallback_texture: Texture,
}

impl Shader {
    /// The built-in program: vertex color times texture sample times shape color.
    pub fn new(ctx: &RenderContext) -> Self {
        Self::build(ctx, DEFAULT_SHADER_SOURCE, UniformBlock::default_block())
    }

    /// Compiles `source` and declares its user uniform block. `uniforms` lists the members of
    /// the `@group(2) @binding(0)` struct in declaration order.
    ///
    /// ```wgsl
    /// struct Params { time: f32, tint: vec4<f32> };
    /// @group(2) @binding(0) var<uniform> params: Params;
    /// ```
    ///
    /// matches `&[("time", UniformKind::Float), ("tint", UniformKind::Vec4)]`.
    pub async fn from_wgsl(
        ctx: &RenderContext,
        source: &str,
        uniforms: &[(&str, UniformKind)],
    ) -> Result<Self, ShaderError> {
        let block = UniformBlock::new(uniforms)?;

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = Self::build(ctx, source, block);
        if let Some(error) = ctx.device.pop_error_scope().await {
            warn!("Shader compilation failed: {}", error);
            return Err(ShaderError::Compilation(error.to_string()));
        }

        Ok(shader)
    }

    fn build(ctx: &RenderContext, source: &str, uniforms: UniformBlock) -> Self {
        let device = &ctx.device;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vecshape_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let shape_uniform_layout = uniform_bind_group_layout(device, "shape_uniform_layout");
        let texture_layout = texture_bind_group_layout(device);
        let user_uniform_layout = uniform_bind_group_layout(device, "user_uniform_layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vecshape_pipeline_layout"),
            bind_group_layouts: &[
                &shape_uniform_layout,
                &texture_layout,
                &user_uniform_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipelines = Topology::ALL.map(|topology| {
            create_pipeline(
                device,
                &pipeline_layout,
                &module,
                ctx.target_format(),
                topology,
            )
        });

        let uniform_buffer = crate::util::create_buffer_init(
            device,
            Some("User Uniform Buffer"),
            &uniforms.data,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("user_uniform_bind_group"),
            layout: &user_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let fallback_texture = Texture::solid(ctx, Color::WHITE);

        debug!(
            "Built shader with {} user uniforms ({} bytes)",
            uniforms.slots.len(),
            uniforms.data.len()
        );

        Self {
            queue: ctx.queue.clone(),
            pipelines,
            shape_uniform_layout,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            fallback_texture,
        }
    }

    pub(crate) fn pipeline(&self, topology: Topology) -> &wgpu::RenderPipeline {
        let index = match topology {
            Topology::Points => 0,
            Topology::Lines => 1,
            Topology::LineStrip => 2,
            Topology::TriangleList => 3,
            Topology::TriangleStrip => 4,
        };
        &self.pipelines[index]
    }

    pub(crate) fn shape_uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.shape_uniform_layout
    }

    pub(crate) fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bind_group
    }

    pub(crate) fn fallback_texture(&self) -> &Texture {
        &self.fallback_texture
    }

    /// The declared kind of `name`, if it is a member of the user uniform block.
    pub fn uniform_kind(&self, name: &str) -> Option<UniformKind> {
        self.uniforms.slot(name).map(|slot| slot.kind)
    }

    /// Current CPU-side contents of the user uniform block.
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.uniforms.data
    }

    fn set_uniform(
        &mut self,
        name: &str,
        kind: UniformKind,
        bytes: &[u8],
    ) -> Result<(), ShaderError> {
        let offset = self.uniforms.write(name, kind, bytes)?;
        self.queue.write_buffer(&self.uniform_buffer, offset, bytes);
        Ok(())
    }

    pub fn set_uniform_float(&mut self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Float, bytemuck::bytes_of(&value))
    }

    pub fn set_uniform_int(&mut self, name: &str, value: i32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Int, bytemuck::bytes_of(&value))
    }

    pub fn set_uniform_uint(&mut self, name: &str, value: u32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::UInt, bytemuck::bytes_of(&value))
    }

    pub fn set_uniform_vec2(&mut self, name: &str, value: [f32; 2]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Vec2, bytemuck::cast_slice(&value))
    }

    pub fn set_uniform_vec3(&mut self, name: &str, value: [f32; 3]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Vec3, bytemuck::cast_slice(&value))
    }

    pub fn set_uniform_vec4(&mut self, name: &str, value: [f32; 4]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Vec4, bytemuck::cast_slice(&value))
    }

    pub fn set_uniform_transform(
        &mut self,
        name: &str,
        value: &GlTransform,
    ) -> Result<(), ShaderError> {
        self.set_uniform(
            name,
            UniformKind::Transform,
            bytemuck::cast_slice(&value.to_uniform()),
        )
    }
}
