//! GPU backend seam.
//!
//! The renderer core (cache, batch builder, swapchain manager, frame driver)
//! is written against [`GpuBackend`]. Handles are opaque associated types so
//! the core never touches API objects directly.
//!
//! Every synchronization point is an explicit call: the frame fence
//! ([`GpuBackend::wait_for_frame`]), the device-idle barrier
//! ([`GpuBackend::wait_idle`]), image acquisition, submission and present.

mod wgpu_backend;

#[cfg(test)]
pub(crate) mod mock;

pub use wgpu_backend::{ChainFramebuffer, ChainSlot, ChainView, WgpuBackend, WgpuDescriptor, WgpuImage};

use crate::coords::{ColorRgba, Extent2d};
use crate::render::{GlobalData, ImageId, MaterialData, PixelFormat, RenderCommand, RenderError, Transform};

/// Pixel upload request for [`GpuBackend::create_image`].
#[derive(Debug, Copy, Clone)]
pub struct ImageDesc<'a> {
    pub id: ImageId,
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl ImageDesc<'_> {
    /// Byte length `pixels` must have.
    #[inline]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel() as usize
    }
}

/// Result of asking the presentation engine for the next image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Acquire {
    /// Index into the swapchain's image list.
    Ready(u32),
    /// Usable this frame, but the chain should be rebuilt before the next one.
    Suboptimal(u32),
    /// The chain no longer matches the surface and must be rebuilt.
    OutOfDate,
}

/// Everything the backend needs to record one frame's command buffer.
pub struct FrameRecording<'a, D, F> {
    pub image_index: u32,
    pub framebuffer: &'a F,
    pub extent: Extent2d,
    pub clear_color: ColorRgba,
    pub commands: &'a [RenderCommand],
    /// Descriptor table, indexed by [`RenderCommand::descriptor`].
    pub descriptors: &'a [D],
}

/// Explicit GPU API used by the renderer core.
pub trait GpuBackend {
    /// Device image + view + backing memory.
    type Image;
    /// Bound descriptor set for one image.
    type Descriptor;
    /// Presentable image owned by the presentation engine.
    type ChainImage;
    /// View onto a presentable image.
    type View;
    /// Render target for one presentable image.
    type Framebuffer;

    // ── allocation ─────────────────────────────────────────────────────────

    /// Allocates an image and uploads `desc.pixels` through the staging buffer.
    ///
    /// Blocks until the transfer has completed on the device.
    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<Self::Image, RenderError>;
    fn destroy_image(&mut self, image: Self::Image);

    /// Allocates a descriptor set from the bounded pool and writes its bindings.
    fn create_descriptor(&mut self, image: &Self::Image) -> Result<Self::Descriptor, RenderError>;
    fn destroy_descriptor(&mut self, descriptor: Self::Descriptor);

    // ── host → device data ─────────────────────────────────────────────────

    fn write_globals(&mut self, globals: &GlobalData);
    fn write_transforms(&mut self, transforms: &[Transform]);
    fn write_materials(&mut self, materials: &[MaterialData]);

    // ── synchronization ────────────────────────────────────────────────────

    /// Blocks until the previous frame's submission has completed.
    fn wait_for_frame(&mut self) -> Result<(), RenderError>;
    /// Blocks until the device has no work in flight.
    fn wait_idle(&mut self) -> Result<(), RenderError>;

    // ── swapchain ──────────────────────────────────────────────────────────

    fn create_chain(&mut self, extent: Extent2d) -> Result<Vec<Self::ChainImage>, RenderError>;
    fn destroy_chain(&mut self);
    fn create_view(&mut self, image: &Self::ChainImage) -> Result<Self::View, RenderError>;
    fn destroy_view(&mut self, view: Self::View);
    fn create_framebuffer(&mut self, view: &Self::View, extent: Extent2d) -> Result<Self::Framebuffer, RenderError>;
    fn destroy_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    // ── frame ──────────────────────────────────────────────────────────────

    /// Waits (unbounded) for the next presentable image.
    fn acquire(&mut self) -> Result<Acquire, RenderError>;
    /// Records and submits the frame; the submission signals the frame fence.
    fn submit(&mut self, frame: &FrameRecording<'_, Self::Descriptor, Self::Framebuffer>) -> Result<(), RenderError>;
    fn present(&mut self, image_index: u32) -> Result<(), RenderError>;
}
