//! Keeps a [`VertexStore`] and its GPU copy in sync.
//!
//! Each per-vertex channel has its own dirty flag. Mutating a single field only raises the flag
//! of the channel it belongs to, and [`BufferSync::flush`] re-uploads only flagged channels.
//! Replacing the geometry raises every flag, including an internal one for the index buffer.
//!
//! GPU buffers are created on the first flush, never on construction, so a `BufferSync` can be
//! built and edited before any device exists.

use crate::context::RenderContext;
use crate::error::ShapeError;
use crate::geometry::{Geometry, Topology};
use crate::util::upsert_gpu_buffer;
use crate::vertex::{Channel, Vertex};
use crate::vertex_store::VertexStore;
use crate::Color;
use lyon::geom::euclid::default::{Point2D, Point3D};
use smallvec::SmallVec;
use tracing::{debug, trace};
use wgpu::BufferUsages;

/// Per-channel dirty flags. A flag is set exactly when the GPU copy of that channel is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlags {
    pub position: bool,
    pub color: bool,
    pub texture_coordinate: bool,
}

impl DirtyFlags {
    pub const fn all() -> Self {
        Self {
            position: true,
            color: true,
            texture_coordinate: true,
        }
    }

    pub fn is_set(&self, channel: Channel) -> bool {
        match channel {
            Channel::Position => self.position,
            Channel::Color => self.color,
            Channel::TextureCoordinate => self.texture_coordinate,
        }
    }

    pub fn any(&self) -> bool {
        self.position || self.color || self.texture_coordinate
    }

    fn flag_mut(&mut self, channel: Channel) -> &mut bool {
        match channel {
            Channel::Position => &mut self.position,
            Channel::Color => &mut self.color,
            Channel::TextureCoordinate => &mut self.texture_coordinate,
        }
    }

    pub(crate) fn mark(&mut self, channel: Channel) {
        *self.flag_mut(channel) = true;
    }

    pub(crate) fn clear(&mut self, channel: Channel) {
        *self.flag_mut(channel) = false;
    }
}

/// Destination of a flush. The GPU implementation writes wgpu buffers; anything else (a test
/// recorder, a debug dump) can observe exactly what would be uploaded.
pub trait ChannelSink {
    /// Receives the flat, tightly packed data of one channel for all vertices.
    fn upload_channel(&mut self, channel: Channel, data: &[f32]);
    fn upload_indices(&mut self, indices: &[u32]);
}

/// Packs one channel of every vertex into a flat `f32` buffer: `[x, y, z]` per position,
/// `[r, g, b, a]` per color, `[u, v]` per texture coordinate.
pub fn pack_channel(vertices: &[Vertex], channel: Channel) -> Vec<f32> {
    let mut data = Vec::with_capacity(vertices.len() * channel.components());
    for vertex in vertices {
        channel.pack_into(vertex, &mut data);
    }
    data
}

/// Channels uploaded by one flush, in upload order.
pub type FlushedChannels = SmallVec<[Channel; 3]>;

fn flush_dirty<S: ChannelSink>(
    store: &VertexStore,
    dirty: &mut DirtyFlags,
    indices_dirty: &mut bool,
    sink: &mut S,
) -> FlushedChannels {
    let mut flushed = FlushedChannels::new();

    // Nothing to mirror; the stale GPU contents are never drawn because the draw is skipped.
    if store.is_empty() {
        *dirty = DirtyFlags::default();
        *indices_dirty = false;
        return flushed;
    }

    for channel in Channel::ALL {
        if dirty.is_set(channel) {
            let data = pack_channel(store.vertices(), channel);
            sink.upload_channel(channel, &data);
            dirty.clear(channel);
            flushed.push(channel);
        }
    }

    if *indices_dirty {
        sink.upload_indices(store.indices());
        *indices_dirty = false;
    }

    flushed
}

/// GPU-side handles owned by exactly one [`BufferSync`]. Dropping it releases the buffers.
#[derive(Debug, Default)]
pub(crate) struct GpuBuffers {
    channels: [Option<wgpu::Buffer>; 3],
    indices: Option<wgpu::Buffer>,
    uniforms: Option<UniformBinding>,
}

#[derive(Debug)]
pub(crate) struct UniformBinding {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

impl GpuBuffers {
    pub(crate) fn channel(&self, channel: Channel) -> Option<&wgpu::Buffer> {
        self.channels[channel.location() as usize].as_ref()
    }

    pub(crate) fn indices(&self) -> Option<&wgpu::Buffer> {
        self.indices.as_ref()
    }

    pub(crate) fn uniforms(&self) -> Option<&UniformBinding> {
        self.uniforms.as_ref()
    }
}

struct NullSink;

impl ChannelSink for NullSink {
    fn upload_channel(&mut self, _channel: Channel, _data: &[f32]) {}
    fn upload_indices(&mut self, _indices: &[u32]) {}
}

struct GpuUploader<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    buffers: &'a mut GpuBuffers,
}

impl ChannelSink for GpuUploader<'_> {
    fn upload_channel(&mut self, channel: Channel, data: &[f32]) {
        upsert_gpu_buffer(
            self.device,
            self.queue,
            &mut self.buffers.channels[channel.location() as usize],
            channel.label(),
            bytemuck::cast_slice(data),
            BufferUsages::VERTEX | BufferUsages::COPY_DST,
        );
    }

    fn upload_indices(&mut self, indices: &[u32]) {
        if indices.is_empty() {
            return;
        }
        upsert_gpu_buffer(
            self.device,
            self.queue,
            &mut self.buffers.indices,
            "Index Buffer",
            bytemuck::cast_slice(indices),
            BufferUsages::INDEX | BufferUsages::COPY_DST,
        );
    }
}

/// Bytes and upload counts per channel, collected when the `upload_metrics` feature is on.
#[cfg(feature = "upload_metrics")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadMetrics {
    pub channel_uploads: [u64; 3],
    pub channel_bytes: [u64; 3],
}

/// Vertex store plus its GPU mirror.
#[derive(Debug, Default)]
pub struct BufferSync {
    store: VertexStore,
    dirty: DirtyFlags,
    indices_dirty: bool,
    gpu: Option<GpuBuffers>,
    #[cfg(feature = "upload_metrics")]
    metrics: UploadMetrics,
}

impl BufferSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &VertexStore {
        &self.store
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn needs_flush(&self) -> bool {
        self.dirty.any() || self.indices_dirty
    }

    /// Whether GPU handles have been created yet.
    pub fn has_gpu_buffers(&self) -> bool {
        self.gpu.is_some()
    }

    #[cfg(feature = "upload_metrics")]
    pub fn metrics(&self) -> UploadMetrics {
        self.metrics
    }

    /// Replaces vertices, indices and topology and marks everything dirty.
    ///
    /// Geometry whose indices point past its vertices, or whose texture coordinates do not match
    /// its positions, is rejected with [`ShapeError::InvalidArgument`]. Neither the store nor
    /// the dirty flags change in that case.
    pub fn replace_geometry(&mut self, geometry: Geometry) -> Result<(), ShapeError> {
        self.store.replace(geometry)?;
        self.mark_all();
        Ok(())
    }

    pub(crate) fn replace_vertices(
        &mut self,
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
        topology: Topology,
    ) {
        self.store.replace_vertices(vertices, indices, topology);
        self.mark_all();
    }

    fn mark_all(&mut self) {
        self.dirty = DirtyFlags::all();
        self.indices_dirty = true;
    }

    pub fn set_vertex_position(
        &mut self,
        index: usize,
        position: Point3D<f32>,
    ) -> Result<(), ShapeError> {
        self.store.set_position(index, position)?;
        self.dirty.mark(Channel::Position);
        Ok(())
    }

    pub fn set_vertex_color(&mut self, index: usize, color: Color) -> Result<(), ShapeError> {
        self.store.set_color(index, color)?;
        self.dirty.mark(Channel::Color);
        Ok(())
    }

    pub fn set_vertex_texture_coordinate(
        &mut self,
        index: usize,
        texture_coordinate: Point2D<f32>,
    ) -> Result<(), ShapeError> {
        self.store
            .set_texture_coordinate(index, texture_coordinate)?;
        self.dirty.mark(Channel::TextureCoordinate);
        Ok(())
    }

    /// Applies `f` to every position. Marks the position channel once, and only if there is
    /// at least one vertex.
    pub fn map_positions(&mut self, f: impl FnMut(Point3D<f32>) -> Point3D<f32>) {
        if self.store.is_empty() {
            return;
        }
        self.store.map_positions(f);
        self.dirty.mark(Channel::Position);
    }

    pub fn translate_all(&mut self, delta: lyon::math::Vector) {
        self.map_positions(|p| Point3D::new(p.x + delta.x, p.y + delta.y, p.z));
    }

    /// Uploads every dirty channel to the GPU, creating the buffers on first use.
    ///
    /// A no-op when nothing is dirty. Requires `ctx` to refer to a live device.
    pub fn flush(&mut self, ctx: &RenderContext) -> FlushedChannels {
        if !self.needs_flush() {
            return FlushedChannels::new();
        }
        if self.store.is_empty() {
            return flush_dirty(
                &self.store,
                &mut self.dirty,
                &mut self.indices_dirty,
                &mut NullSink,
            );
        }

        let buffers = self.gpu.get_or_insert_with(|| {
            debug!("Creating GPU buffers for {} vertices", self.store.len());
            GpuBuffers::default()
        });
        let mut uploader = GpuUploader {
            device: &ctx.device,
            queue: &ctx.queue,
            buffers,
        };
        let flushed = flush_dirty(
            &self.store,
            &mut self.dirty,
            &mut self.indices_dirty,
            &mut uploader,
        );
        trace!("Flushed channels {:?}", flushed);

        #[cfg(feature = "upload_metrics")]
        self.record_uploads(&flushed);

        flushed
    }

    /// Runs the flush protocol against an arbitrary sink instead of the GPU.
    pub fn flush_into<S: ChannelSink>(&mut self, sink: &mut S) -> FlushedChannels {
        let flushed = flush_dirty(&self.store, &mut self.dirty, &mut self.indices_dirty, sink);

        #[cfg(feature = "upload_metrics")]
        self.record_uploads(&flushed);

        flushed
    }

    #[cfg(feature = "upload_metrics")]
    fn record_uploads(&mut self, flushed: &FlushedChannels) {
        for channel in flushed.iter() {
            let slot = channel.location() as usize;
            self.metrics.channel_uploads[slot] += 1;
            self.metrics.channel_bytes[slot] +=
                (self.store.len() * channel.components() * std::mem::size_of::<f32>()) as u64;
        }
    }

    pub(crate) fn gpu(&self) -> Option<&GpuBuffers> {
        self.gpu.as_ref()
    }

    /// Writes `bytes` into the per-shape uniform buffer, creating it and its bind group against
    /// `layout` the first time.
    pub(crate) fn write_uniforms(
        &mut self,
        ctx: &RenderContext,
        layout: &wgpu::BindGroupLayout,
        bytes: &[u8],
    ) {
        let buffers = self.gpu.get_or_insert_with(GpuBuffers::default);
        match buffers.uniforms.as_ref() {
            Some(binding) if binding.buffer.size() >= bytes.len() as u64 => {
                ctx.queue.write_buffer(&binding.buffer, 0, bytes);
            }
            _ => {
                let buffer = crate::util::create_buffer_init(
                    &ctx.device,
                    Some("Shape Uniform Buffer"),
                    bytes,
                    BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                );
                let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shape_uniform_bind_group"),
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                buffers.uniforms = Some(UniformBinding { buffer, bind_group });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;
    use lyon::math::{point, Size};

    #[derive(Default)]
    struct RecordingSink {
        channels: Vec<(Channel, Vec<f32>)>,
        indices: Vec<Vec<u32>>,
    }

    impl ChannelSink for RecordingSink {
        fn upload_channel(&mut self, channel: Channel, data: &[f32]) {
            self.channels.push((channel, data.to_vec()));
        }

        fn upload_indices(&mut self, indices: &[u32]) {
            self.indices.push(indices.to_vec());
        }
    }

    fn rectangle_sync() -> BufferSync {
        let mut sync = BufferSync::new();
        sync.replace_geometry(
            geometry::rectangle(point(0.0, 0.0), Size::new(10.0, 10.0)).unwrap(),
        )
        .unwrap();
        sync
    }

    #[test]
    fn replace_geometry_marks_every_channel() {
        let mut sync = rectangle_sync();
        assert_eq!(sync.dirty(), DirtyFlags::all());

        let mut sink = RecordingSink::default();
        let flushed = sync.flush_into(&mut sink);
        assert_eq!(flushed.as_slice(), &Channel::ALL);
        assert_eq!(sink.indices, vec![vec![0, 1, 2, 3]]);
        assert_eq!(sync.dirty(), DirtyFlags::default());
        assert!(!sync.needs_flush());
    }

    #[test]
    fn color_change_uploads_only_color() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());

        let before: Vec<Vertex> = sync.store().vertices().to_vec();
        sync.set_vertex_color(2, Color::rgb(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(
            sync.dirty(),
            DirtyFlags {
                color: true,
                ..Default::default()
            }
        );

        let mut sink = RecordingSink::default();
        let flushed = sync.flush_into(&mut sink);
        assert_eq!(flushed.as_slice(), &[Channel::Color]);
        assert_eq!(sink.channels.len(), 1);
        assert!(sink.indices.is_empty());

        let (channel, data) = &sink.channels[0];
        assert_eq!(*channel, Channel::Color);
        assert_eq!(data.len(), 16);
        assert_eq!(&data[8..12], &[1.0, 0.0, 0.0, 1.0]);

        for (old, new) in before.iter().zip(sync.store().vertices()) {
            assert_eq!(old.position, new.position);
            assert_eq!(old.texture_coordinate, new.texture_coordinate);
        }
        assert!(!sync.dirty().position && !sync.dirty().texture_coordinate);
    }

    #[test]
    fn flush_without_changes_is_a_no_op() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());

        let mut sink = RecordingSink::default();
        assert!(sync.flush_into(&mut sink).is_empty());
        assert!(sink.channels.is_empty());
        assert!(sink.indices.is_empty());
    }

    #[test]
    fn failed_mutation_leaves_flags_untouched() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());

        assert!(sync
            .set_vertex_position(10, Point3D::new(0.0, 0.0, 0.0))
            .is_err());
        assert_eq!(sync.dirty(), DirtyFlags::default());
    }

    #[test]
    fn inconsistent_geometry_is_rejected() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());
        let before = sync.store().vertices().to_vec();

        let dangling_index = Geometry {
            positions: vec![Point3D::new(0.0, 0.0, 0.0)],
            texture_coordinates: vec![Point2D::new(0.0, 0.0)],
            indices: vec![0, 7],
            topology: Topology::Points,
        };
        let missing_uvs = Geometry {
            positions: vec![Point3D::new(0.0, 0.0, 0.0)],
            texture_coordinates: vec![],
            indices: vec![0],
            topology: Topology::Points,
        };

        for geometry in [dangling_index, missing_uvs] {
            assert!(matches!(
                sync.replace_geometry(geometry),
                Err(ShapeError::InvalidArgument { .. })
            ));
        }
        assert_eq!(sync.store().vertices(), before.as_slice());
        assert_eq!(sync.store().indices(), &[0, 1, 2, 3]);
        assert_eq!(sync.store().topology(), Topology::TriangleStrip);
        assert!(!sync.needs_flush());
    }

    #[cfg(feature = "upload_metrics")]
    #[test]
    fn metrics_count_only_uploaded_channels() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());
        assert_eq!(sync.metrics().channel_uploads, [1, 1, 1]);
        assert_eq!(sync.metrics().channel_bytes, [4 * 3 * 4, 4 * 4 * 4, 4 * 2 * 4]);

        sync.set_vertex_color(0, Color::BLACK).unwrap();
        sync.flush_into(&mut RecordingSink::default());
        sync.flush_into(&mut RecordingSink::default());
        assert_eq!(sync.metrics().channel_uploads, [1, 2, 1]);
        assert_eq!(sync.metrics().channel_bytes[1], 2 * 4 * 4 * 4);
    }

    #[test]
    fn packed_channels_are_tightly_laid_out() {
        let sync = rectangle_sync();
        let vertices = sync.store().vertices();

        let positions = pack_channel(vertices, Channel::Position);
        assert_eq!(positions.len(), 12);
        assert_eq!(&positions[3..6], &[10.0, 0.0, 0.0]);

        let uvs = pack_channel(vertices, Channel::TextureCoordinate);
        assert_eq!(uvs, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn map_positions_marks_only_position() {
        let mut sync = rectangle_sync();
        sync.flush_into(&mut RecordingSink::default());

        sync.map_positions(|p| Point3D::new(p.x + 1.0, p.y, p.z));
        assert_eq!(
            sync.dirty(),
            DirtyFlags {
                position: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn empty_store_flush_clears_flags_without_uploading() {
        let mut sync = BufferSync::new();
        sync.replace_vertices(Vec::new(), Vec::new(), Topology::Points);
        let mut sink = RecordingSink::default();
        assert!(sync.flush_into(&mut sink).is_empty());
        assert!(sink.channels.is_empty());
        assert!(!sync.needs_flush());
        assert!(!sync.has_gpu_buffers());
    }
}
