use crate::backend::{GpuBackend, ImageDesc};
use crate::coords::Extent2d;
use crate::text::{FontAtlasBaker, GlyphCache, GlyphRasterizer};

use super::batch::FrameBatch;
use super::cache::ResourceCache;
use super::swapchain::SwapchainManager;
use super::{GlobalData, ImageId, PixelFormat, RenderError, RendererConfig};

const WHITE_TEXEL: [u8; 4] = [255; 4];

/// Owns every piece of renderer state for one surface.
///
/// There is no global state; the frame loop holds the renderer by `&mut`.
pub struct Renderer<B: GpuBackend> {
    pub(super) backend: B,
    pub(super) config: RendererConfig,
    pub(super) cache: ResourceCache<B>,
    pub(super) batch: FrameBatch,
    pub(super) swapchain: SwapchainManager<B>,
    pub(super) glyphs: GlyphCache,
    pub(super) client_extent: Extent2d,
}

impl<B: GpuBackend> Renderer<B> {
    /// Builds the swapchain, the white texel image and the font atlas.
    pub fn new(
        mut backend: B,
        config: RendererConfig,
        extent: Extent2d,
        rasterizer: &dyn GlyphRasterizer,
    ) -> Result<Self, RenderError> {
        let (cache, swapchain, glyphs) = startup(&mut backend, &config, extent, rasterizer)?;
        let batch = FrameBatch::new(
            config.max_transforms,
            config.max_materials,
            config.max_render_commands,
        );

        log::info!(
            "renderer ready: {}x{}, font {}px in a {}px atlas",
            extent.width,
            extent.height,
            config.font_size,
            config.atlas_size
        );

        Ok(Self {
            backend,
            config,
            cache,
            batch,
            swapchain,
            glyphs,
            client_extent: extent,
        })
    }

    /// Records a new client size; the chain is rebuilt on the next frame.
    pub fn resize(&mut self, extent: Extent2d) {
        if extent == self.client_extent {
            return;
        }
        log::debug!("client area resized to {}x{}", extent.width, extent.height);
        self.client_extent = extent;
        self.swapchain.mark_stale();
    }

    pub fn client_extent(&self) -> Extent2d {
        self.client_extent
    }

    pub fn glyphs(&self) -> &GlyphCache {
        &self.glyphs
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Waits for the device, then releases the swapchain and every cached resource.
    ///
    /// The renderer draws nothing afterwards; call once before dropping it.
    pub fn shutdown(&mut self) -> Result<(), RenderError> {
        let idle = self.backend.wait_idle();
        if let Err(e) = &idle {
            log::error!("device did not go idle before shutdown: {e}");
        }
        self.swapchain.destroy(&mut self.backend);
        self.cache.destroy_all(&mut self.backend);
        log::info!("renderer shut down");
        idle
    }
}

type Startup<B> = (ResourceCache<B>, SwapchainManager<B>, GlyphCache);

/// Creates the chain and the two built-in images.
///
/// On failure everything created so far is released again.
fn startup<B: GpuBackend>(
    backend: &mut B,
    config: &RendererConfig,
    extent: Extent2d,
    rasterizer: &dyn GlyphRasterizer,
) -> Result<Startup<B>, RenderError> {
    let mut cache = ResourceCache::new(config.max_images, config.max_descriptors);

    backend.write_globals(&GlobalData::from(extent));

    let mut swapchain = SwapchainManager::new();
    swapchain.create(backend, extent)?;

    match create_builtin_images(backend, &mut cache, config, rasterizer) {
        Ok(glyphs) => Ok((cache, swapchain, glyphs)),
        Err(e) => {
            log::error!("renderer startup failed: {e}");
            swapchain.destroy(backend);
            cache.destroy_all(backend);
            Err(e)
        }
    }
}

fn create_builtin_images<B: GpuBackend>(
    backend: &mut B,
    cache: &mut ResourceCache<B>,
    config: &RendererConfig,
    rasterizer: &dyn GlyphRasterizer,
) -> Result<GlyphCache, RenderError> {
    cache.get_or_create_image(
        backend,
        &ImageDesc {
            id: ImageId::White,
            pixels: &WHITE_TEXEL,
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
        },
    )?;

    let atlas = FontAtlasBaker::new(config.atlas_size, config.font_size).bake(rasterizer)?;
    cache.get_or_create_image(
        backend,
        &ImageDesc {
            id: ImageId::Font,
            pixels: &atlas.bitmap,
            width: config.atlas_size,
            height: config.atlas_size,
            format: PixelFormat::R8,
        },
    )?;

    Ok(atlas.glyphs)
}
