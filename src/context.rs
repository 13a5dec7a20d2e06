use crate::error::ContextError;
use std::sync::Arc;
use tracing::{debug, info};
use wgpu::InstanceDescriptor;

/// Options used by [`RenderContext::new_headless`].
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub power_preference: wgpu::PowerPreference,
    /// Format of the render targets shapes are drawn into. Shader pipelines are built for it.
    pub target_format: wgpu::TextureFormat,
    pub force_fallback_adapter: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            target_format: wgpu::TextureFormat::Rgba8Unorm,
            force_fallback_adapter: false,
        }
    }
}

/// An explicit handle to an active rendering context.
///
/// Every operation that touches the GPU takes a `&RenderContext`, so there is no process-wide
/// "is initialized" state to consult. Cloning is cheap: the device and queue are shared.
///
/// Creating a context is the caller's business when a window is involved; use
/// [`RenderContext::from_parts`] with the device and queue you already own. Device loss is not
/// detected here, using a context whose device was lost is a precondition violation.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
    target_format: wgpu::TextureFormat,
}

impl RenderContext {
    pub fn from_parts(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            target_format,
        }
    }

    /// Creates a context without a surface, for offscreen rendering and tests.
    ///
    /// Requests `ADDRESS_MODE_CLAMP_TO_BORDER` when the adapter offers it, which the
    /// [`crate::WrapMode::Zero`] and [`crate::WrapMode::One`] wrap modes depend on.
    pub async fn new_headless(options: ContextOptions) -> Result<Self, ContextError> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface: None,
                force_fallback_adapter: options.force_fallback_adapter,
            })
            .await?;

        info!("Using adapter {:?}", adapter.get_info().name);

        let required_features =
            adapter.features() & wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vecshape device"),
                required_features,
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        debug!("Created headless context with features {:?}", required_features);

        Ok(Self::from_parts(
            Arc::new(device),
            Arc::new(queue),
            options.target_format,
        ))
    }

    /// Like [`RenderContext::new_headless`], but returns `None` when no adapter or device is
    /// available.
    pub async fn try_new_headless(options: ContextOptions) -> Option<Self> {
        Self::new_headless(options).await.ok()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn supports_clamp_to_border(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
    }
}
