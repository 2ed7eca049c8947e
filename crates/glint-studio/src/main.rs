mod text_buffer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use glint_engine::coords::{ColorRgba, Vec2};
use glint_engine::core::{App, AppControl, FrameCtx};
use glint_engine::device::GpuInit;
use glint_engine::logging::{init_logging, LoggingConfig};
use glint_engine::render::{ImageId, RendererConfig};
use glint_engine::text::FontdueRasterizer;
use glint_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use text_buffer::TextBuffer;

const FONT_ENV: &str = "GLINT_FONT";
const DEFAULT_FONT: &str = "fonts/arial.ttf";

const TEXT_ORIGIN: Vec2 = Vec2::new(40.0, 40.0);
const CARET_COLOR: ColorRgba = ColorRgba::new(1.0, 1.0, 1.0, 0.5);

/// Text typed into the window, followed by a caret.
struct Studio {
    buffer: TextBuffer,
}

impl App for Studio {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed {
            return AppControl::Continue;
        }

        match &event.logical_key {
            Key::Named(NamedKey::Backspace) => self.buffer.backspace(),
            Key::Named(NamedKey::Enter) => self.buffer.newline(),
            _ => {
                if let Some(text) = &event.text {
                    self.buffer.push_str(text);
                }
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let text = self.buffer.as_bytes();
        ctx.render(|frame| {
            let font_size = frame.font_size();
            let pen = frame.draw_text(text, TEXT_ORIGIN, ColorRgba::white());
            frame.draw_rect(
                ImageId::White,
                pen + Vec2::new(0.0, -font_size * 0.8),
                Vec2::new(font_size / 2.0, font_size),
                CARET_COLOR,
            );
        })
    }
}

/// `$GLINT_FONT`, then `fonts/arial.ttf`, then common system fonts.
fn load_font() -> Result<Vec<u8>> {
    if let Ok(path) = std::env::var(FONT_ENV) {
        return std::fs::read(&path).with_context(|| format!("failed to read font {path} (from {FONT_ENV})"));
    }

    let candidates = [
        DEFAULT_FONT,
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    ];

    candidates
        .iter()
        .map(PathBuf::from)
        .find_map(|p| {
            let bytes = std::fs::read(&p).ok()?;
            log::info!("using font {}", p.display());
            Some(bytes)
        })
        .with_context(|| format!("no font found; set {FONT_ENV} or provide {DEFAULT_FONT}"))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let font = load_font()?;
    let rasterizer = FontdueRasterizer::from_bytes(&font).context("failed to parse font")?;

    Runtime::run(
        RuntimeConfig {
            title: "Glint Studio".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        },
        GpuInit::default(),
        RendererConfig::default(),
        rasterizer,
        Studio {
            buffer: TextBuffer::new(),
        },
    )
}
