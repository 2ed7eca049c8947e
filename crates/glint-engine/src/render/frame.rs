use crate::backend::{Acquire, FrameRecording, GpuBackend};
use crate::coords::{ColorRgba, Vec2};
use crate::text::GlyphCache;

use super::batch::FrameBatch;
use super::renderer::Renderer;
use super::{ImageId, RenderError, Transform, UvRect};

/// Per-frame draw surface handed to the application.
///
/// Positions and sizes are physical pixels, origin top-left.
pub struct FrameDraw<'a> {
    batch: &'a mut FrameBatch,
    glyphs: &'a GlyphCache,
}

impl<'a> FrameDraw<'a> {
    pub(crate) fn new(batch: &'a mut FrameBatch, glyphs: &'a GlyphCache) -> Self {
        Self { batch, glyphs }
    }

    /// Queues one quad. Returns `false` if it was dropped.
    ///
    /// For [`ImageId::Font`], `animation_idx` is the character code and
    /// selects the glyph's UV rectangle; other images use the full texture.
    pub fn draw_quad(
        &mut self,
        image: ImageId,
        pos: Vec2,
        size: Vec2,
        color: ColorRgba,
        animation_idx: u32,
    ) -> bool {
        if !pos.is_finite() || !size.is_finite() || !color.is_finite() {
            log::debug!("dropping non-finite quad for {image:?}");
            return false;
        }

        let uv = match image {
            ImageId::Font => u8::try_from(animation_idx)
                .ok()
                .and_then(|code| self.glyphs.glyph(code))
                .map(|g| g.uv)
                .unwrap_or(UvRect::FULL),
            ImageId::White => UvRect::FULL,
        };

        let material_idx = self.batch.material_index(color);
        self.batch
            .push(Transform::new(image, pos, size, uv, material_idx, animation_idx))
    }

    pub fn draw_rect(&mut self, image: ImageId, pos: Vec2, size: Vec2, color: ColorRgba) -> bool {
        self.draw_quad(image, pos, size, color, 0)
    }

    /// Lays out ASCII `text` starting at `origin` (top-left of the first line's baseline box).
    ///
    /// Space advances half the font size; `\n` and `\r` return to the origin
    /// column one line down. Returns the final pen position.
    pub fn draw_text(&mut self, text: &[u8], origin: Vec2, color: ColorRgba) -> Vec2 {
        let font_size = self.font_size();
        let glyphs = self.glyphs;
        let mut pen = origin;

        for &c in text {
            match c {
                b' ' => pen.x += font_size / 2.0,
                b'\n' | b'\r' => {
                    pen.x = origin.x;
                    pen.y += font_size;
                }
                _ => {
                    let Some(g) = glyphs.glyph(c) else {
                        continue;
                    };
                    self.draw_quad(
                        ImageId::Font,
                        pen + Vec2::new(g.x_off, g.y_off),
                        g.size,
                        color,
                        c as u32,
                    );
                    pen.x += g.size.x;
                }
            }
        }
        pen
    }

    pub fn font_size(&self) -> f32 {
        self.glyphs.font_size() as f32
    }
}

/// Why a frame was not submitted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// Acquire reported a stale chain; it has been rebuilt.
    SwapchainOutOfDate,
    /// The client area is empty (minimized window).
    ZeroExtent,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub transforms: usize,
    pub materials: usize,
    pub draw_calls: usize,
    pub instances: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented(FrameStats),
    Skipped(SkipReason),
}

impl<B: GpuBackend> Renderer<B> {
    /// Runs one frame.
    ///
    /// Order: wait on the previous frame's fence, rebuild a stale chain,
    /// run `draw`, build commands and upload the per-frame tables, acquire,
    /// record + submit, present.
    pub fn render_frame<F>(&mut self, draw: F) -> Result<FrameOutcome, RenderError>
    where
        F: FnOnce(&mut FrameDraw<'_>),
    {
        if !self.swapchain.is_active() {
            return Err(RenderError::SwapchainInactive);
        }

        self.backend.wait_for_frame()?;

        if self.client_extent.is_empty() {
            return Ok(FrameOutcome::Skipped(SkipReason::ZeroExtent));
        }
        if self.swapchain.is_stale() || self.swapchain.extent() != self.client_extent {
            if !self.swapchain.rebuild(&mut self.backend, self.client_extent)? {
                return Ok(FrameOutcome::Skipped(SkipReason::ZeroExtent));
            }
        }

        let Renderer {
            backend,
            config,
            cache,
            batch,
            swapchain,
            glyphs,
            client_extent,
        } = self;

        draw(&mut FrameDraw::new(batch, glyphs));

        batch.build_commands(|id| cache.get_or_create_descriptor(backend, id).ok());

        backend.write_transforms(batch.transforms());
        backend.write_materials(batch.materials());

        let stats = FrameStats {
            transforms: batch.transforms().len(),
            materials: batch.materials().len(),
            draw_calls: batch.commands().len(),
            instances: batch.commands().iter().map(|c| c.instance_count).sum(),
        };
        batch.reset_tables();

        let (image_index, suboptimal) = match backend.acquire() {
            Ok(Acquire::Ready(index)) => (index, false),
            Ok(Acquire::Suboptimal(index)) => (index, true),
            Ok(Acquire::OutOfDate) => {
                log::warn!("swapchain out of date; rebuilding and skipping frame");
                batch.reset_commands();
                swapchain.rebuild(backend, *client_extent)?;
                return Ok(FrameOutcome::Skipped(SkipReason::SwapchainOutOfDate));
            }
            Err(e) => {
                batch.reset_commands();
                return Err(e);
            }
        };

        let Some(framebuffer) = swapchain.framebuffer(image_index) else {
            batch.reset_commands();
            return Err(RenderError::SwapchainInactive);
        };

        let submitted = backend.submit(&FrameRecording {
            image_index,
            framebuffer,
            extent: swapchain.extent(),
            clear_color: config.clear_color,
            commands: batch.commands(),
            descriptors: cache.descriptors(),
        });
        batch.reset_commands();
        submitted?;

        backend.present(image_index)?;

        if suboptimal {
            log::debug!("swapchain suboptimal; rebuilding before next frame");
            swapchain.mark_stale();
        }

        log::trace!(
            "frame presented: {} quads, {} draws",
            stats.transforms,
            stats.draw_calls
        );
        Ok(FrameOutcome::Presented(stats))
    }
}
