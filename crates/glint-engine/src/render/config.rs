use std::path::PathBuf;

use crate::coords::ColorRgba;

/// Most presentable images the swapchain manager will track.
pub const MAX_SWAPCHAIN_IMAGES: usize = 5;

/// Renderer configuration.
///
/// Every table is bounded; capacities are fixed for the renderer's lifetime.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Managed images (white texel, font atlas, ...).
    pub max_images: usize,
    /// Descriptor sets; one per image that has been drawn.
    pub max_descriptors: usize,
    /// Instanced draws per frame.
    pub max_render_commands: usize,
    /// Quads per frame; also sizes the transform storage buffer.
    pub max_transforms: usize,
    /// Distinct tint colors per frame; also sizes the material storage buffer.
    pub max_materials: usize,

    /// Size of the persistent upload staging buffer in bytes.
    pub staging_size: u64,

    /// Edge length of the square font atlas, in texels.
    pub atlas_size: u32,
    /// Target glyph pixel height.
    pub font_size: u32,

    /// Color the render pass clears to.
    pub clear_color: ColorRgba,

    /// WGSL file used instead of the built-in quad shader.
    pub shader_override: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_images: 10,
            max_descriptors: 10,
            max_render_commands: 10,
            max_transforms: 5000,
            max_materials: 100,
            staging_size: 1024 * 1024,
            atlas_size: 512,
            font_size: 32,
            clear_color: ColorRgba::black(),
            shader_override: None,
        }
    }
}
