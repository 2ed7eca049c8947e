use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

use crate::coords::Extent2d;

use super::GpuInit;
use super::surface;

/// Owns wgpu core objects and the surface configuration.
///
/// This type is the low-level device context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates the Surface and applies its configuration
///
/// Frame acquisition, recording and synchronization live in
/// [`WgpuBackend`](crate::backend::WgpuBackend), which owns a `Gpu`.
pub struct Gpu {
    /// Kept alive for the lifetime of the surface.
    _instance: wgpu::Instance,

    /// Surface bound to the window.
    surface: wgpu::Surface<'static>,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,

    /// Surface configuration; applied by [`Gpu::configure`].
    config: wgpu::SurfaceConfiguration,

    /// Whether `config` is currently applied to the surface.
    configured: bool,
}

impl Gpu {
    /// Creates a device context bound to a window.
    ///
    /// The surface is not configured yet; the swapchain manager does that
    /// when it builds the chain.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let GpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("glint device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps.formats, prefer_srgb)
            .context("no supported surface formats")?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps.alpha_modes, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            configured: false,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the configured surface extent.
    pub fn surface_extent(&self) -> Extent2d {
        Extent2d::new(self.config.width, self.config.height)
    }

    /// Number of images the presentation engine rotates through.
    pub fn chain_length(&self) -> usize {
        self.config.desired_maximum_frame_latency as usize + 1
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface(&self) -> &wgpu::Surface<'static> {
        &self.surface
    }

    /// Applies the surface configuration at `extent`.
    ///
    /// wgpu rejects a 0x0 surface; callers must not pass an empty extent.
    pub fn configure(&mut self, extent: Extent2d) {
        debug_assert!(!extent.is_empty(), "configure called with an empty extent");
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.surface.configure(&self.device, &self.config);
        self.configured = true;
    }

    /// Marks the surface as unconfigured.
    ///
    /// wgpu has no explicit "destroy swapchain"; the next `configure` replaces it.
    pub fn unconfigure(&mut self) {
        self.configured = false;
    }
}
