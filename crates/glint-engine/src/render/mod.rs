//! Renderer core: resource cache, batch builder, swapchain manager and frame driver.
//!
//! Everything here is generic over [`GpuBackend`](crate::backend::GpuBackend).
//!
//! Convention:
//! - CPU geometry is in physical pixels (top-left origin, +Y down).
//! - The vertex shader converts to NDC using the screen size in the global uniform.

mod batch;
mod cache;
mod config;
mod error;
mod frame;
mod renderer;
mod swapchain;
mod types;

pub use batch::FrameBatch;
pub use cache::ResourceCache;
pub use config::{MAX_SWAPCHAIN_IMAGES, RendererConfig};
pub use error::RenderError;
pub use frame::{FrameDraw, FrameOutcome, FrameStats, SkipReason};
pub use renderer::Renderer;
pub use swapchain::SwapchainManager;
pub use types::{
    DescriptorIndex, GlobalData, ImageId, MaterialData, PixelFormat, PushData, QUAD_INDICES,
    RenderCommand, Transform, UvRect,
};
