use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::WgpuBackend;
use crate::coords::Extent2d;
use crate::core::{App as CoreApp, AppControl, FrameCtx};
use crate::device::GpuInit;
use crate::render::{Renderer, RendererConfig};
use crate::text::GlyphRasterizer;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` until it exits or the window closes.
    ///
    /// `rasterizer` is used once, to bake the font atlas when the window's
    /// renderer is created.
    pub fn run<A, R>(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        renderer_config: RendererConfig,
        rasterizer: R,
        app: A,
    ) -> Result<()>
    where
        A: 'static + CoreApp,
        R: 'static + GlyphRasterizer,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, renderer_config, rasterizer, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct WindowEntry {
    window: Arc<Window>,
    renderer: Renderer<WgpuBackend>,
}

struct AppState<A, R> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    renderer_config: RendererConfig,
    rasterizer: R,
    app: A,

    entry: Option<WindowEntry>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<A, R> AppState<A, R>
where
    A: CoreApp + 'static,
    R: GlyphRasterizer + 'static,
{
    fn new(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        renderer_config: RendererConfig,
        rasterizer: R,
        app: A,
    ) -> Self {
        Self {
            config,
            gpu_init,
            renderer_config,
            rasterizer,
            app,
            entry: None,
            exit_requested: false,
            error: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let extent = Extent2d::from(window.inner_size());

        let backend = pollster::block_on(WgpuBackend::new(
            window.clone(),
            self.gpu_init.clone(),
            &self.renderer_config,
        ))
        .context("GPU initialization failed")?;

        let renderer = Renderer::new(
            backend,
            self.renderer_config.clone(),
            extent,
            &self.rasterizer,
        )
        .context("renderer initialization failed")?;

        window.request_redraw();
        self.entry = Some(WindowEntry { window, renderer });
        Ok(())
    }

    /// Tears the renderer down while the window is still alive.
    fn destroy_window_entry(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            if let Err(e) = entry.renderer.shutdown() {
                log::error!("renderer shutdown failed: {e}");
            }
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.destroy_window_entry();
        self.exit_requested = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.request_exit(event_loop);
    }
}

impl<A, R> ApplicationHandler for AppState<A, R>
where
    A: CoreApp + 'static,
    R: GlyphRasterizer + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e.context("failed to create initial window"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; the frame loop is paced by the fence wait and vsync.
        if let Some(entry) = &self.entry {
            entry.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match &self.entry {
            Some(entry) if entry.window.id() == window_id => {}
            _ => return,
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.renderer.resize(Extent2d::from(*new_size));
                    entry.window.request_redraw();
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.window.inner_size();
                    entry.renderer.resize(Extent2d::from(new_size));
                    entry.window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(entry) = self.entry.as_mut() else {
                    return;
                };

                let mut ctx = FrameCtx {
                    window: &entry.window,
                    renderer: &mut entry.renderer,
                };

                if self.app.on_frame(&mut ctx) == AppControl::Exit {
                    self.request_exit(event_loop);
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.destroy_window_entry();
    }
}
