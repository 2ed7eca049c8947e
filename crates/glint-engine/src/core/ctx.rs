use winit::window::Window;

use crate::backend::WgpuBackend;
use crate::render::{FrameDraw, FrameOutcome, Renderer};

use super::app::AppControl;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
pub struct FrameCtx<'a> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer<WgpuBackend>,
}

impl FrameCtx<'_> {
    /// Runs one frame, calling `draw` to queue this frame's quads.
    ///
    /// Skipped frames are not errors. Device loss, out-of-memory and a lost
    /// surface end the run; other failures are logged.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut FrameDraw<'_>),
    {
        self.window.pre_present_notify();

        match self.renderer.render_frame(draw) {
            Ok(FrameOutcome::Presented(_)) => AppControl::Continue,
            Ok(FrameOutcome::Skipped(reason)) => {
                log::debug!("frame skipped: {reason:?}");
                AppControl::Continue
            }
            Err(e) if e.is_fatal() => {
                log::error!("unrecoverable render error: {e}");
                AppControl::Exit
            }
            Err(e) => {
                log::error!("frame failed: {e}");
                if cfg!(debug_assertions) {
                    panic!("frame failed: {e}");
                }
                AppControl::Continue
            }
        }
    }

    pub fn font_size(&self) -> f32 {
        self.renderer.glyphs().font_size() as f32
    }
}
