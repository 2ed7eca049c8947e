use crate::backend::GpuBackend;
use crate::coords::Extent2d;

use super::{GlobalData, MAX_SWAPCHAIN_IMAGES, RenderError};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Absent,
    Active,
    Destroyed,
}

/// Presentable images, their views and one framebuffer per image.
///
/// The three lists always have equal length and correspond by index. A
/// rebuild tears the old set down completely before building the new one.
pub struct SwapchainManager<B: GpuBackend> {
    phase: Phase,
    extent: Extent2d,
    chain_live: bool,
    stale: bool,

    images: Vec<B::ChainImage>,
    views: Vec<B::View>,
    framebuffers: Vec<B::Framebuffer>,
}

impl<B: GpuBackend> SwapchainManager<B> {
    pub fn new() -> Self {
        Self {
            phase: Phase::Absent,
            extent: Extent2d::default(),
            chain_live: false,
            stale: false,
            images: Vec::new(),
            views: Vec::new(),
            framebuffers: Vec::new(),
        }
    }

    /// Builds the initial chain at `extent`.
    ///
    /// An empty extent activates the manager without images; the first
    /// rebuild at a non-empty size creates them.
    pub fn create(&mut self, backend: &mut B, extent: Extent2d) -> Result<(), RenderError> {
        debug_assert_ne!(self.phase, Phase::Active, "swapchain created twice");

        if extent.is_empty() {
            self.phase = Phase::Active;
            self.extent = extent;
            self.stale = true;
            log::debug!("swapchain creation deferred: empty client area");
            return Ok(());
        }

        self.build(backend, extent)
    }

    /// Recreates the chain for a new client size.
    ///
    /// Waits for the device to go idle, releases framebuffers, views and the
    /// chain (in that order) and builds a fresh set. Returns `Ok(false)` when
    /// the extent is empty; the chain then stays torn down and stale.
    pub fn rebuild(&mut self, backend: &mut B, extent: Extent2d) -> Result<bool, RenderError> {
        if self.phase != Phase::Active {
            return Err(RenderError::SwapchainInactive);
        }

        backend.wait_idle()?;
        self.teardown(backend);

        if extent.is_empty() {
            self.extent = extent;
            self.stale = true;
            log::debug!("swapchain rebuild deferred: empty client area");
            return Ok(false);
        }

        backend.write_globals(&GlobalData::from(extent));
        self.build(backend, extent)?;
        Ok(true)
    }

    /// Requests a rebuild before the next frame is recorded.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Releases everything. The device must be idle.
    pub fn destroy(&mut self, backend: &mut B) {
        self.teardown(backend);
        self.phase = Phase::Destroyed;
        log::debug!("swapchain destroyed");
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// `(images, views, framebuffers)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.images.len(), self.views.len(), self.framebuffers.len())
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<&B::Framebuffer> {
        self.framebuffers.get(image_index as usize)
    }

    fn build(&mut self, backend: &mut B, extent: Extent2d) -> Result<(), RenderError> {
        let result = self.try_build(backend, extent);
        match &result {
            Ok(()) => {
                self.phase = Phase::Active;
                self.extent = extent;
                self.stale = false;
                log::info!(
                    "swapchain ready: {}x{}, {} images",
                    extent.width,
                    extent.height,
                    self.images.len()
                );
            }
            Err(e) => {
                self.teardown(backend);
                self.phase = Phase::Absent;
                log::error!("swapchain creation failed: {e}");
            }
        }
        result
    }

    fn try_build(&mut self, backend: &mut B, extent: Extent2d) -> Result<(), RenderError> {
        debug_assert!(self.images.is_empty() && self.views.is_empty() && self.framebuffers.is_empty());

        let images = backend.create_chain(extent)?;
        self.chain_live = true;

        if images.len() > MAX_SWAPCHAIN_IMAGES {
            return Err(RenderError::TooManySwapchainImages {
                count: images.len(),
                max: MAX_SWAPCHAIN_IMAGES,
            });
        }
        self.images = images;

        for image in &self.images {
            let view = backend.create_view(image)?;
            self.views.push(view);
        }
        for view in &self.views {
            let framebuffer = backend.create_framebuffer(view, extent)?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn teardown(&mut self, backend: &mut B) {
        for framebuffer in self.framebuffers.drain(..) {
            backend.destroy_framebuffer(framebuffer);
        }
        for view in self.views.drain(..) {
            backend.destroy_view(view);
        }
        self.images.clear();
        if self.chain_live {
            backend.destroy_chain();
            self.chain_live = false;
        }
    }
}

impl<B: GpuBackend> Default for SwapchainManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockBackend, MockEvent};

    fn active(backend: &mut MockBackend) -> SwapchainManager<MockBackend> {
        let mut chain = SwapchainManager::new();
        chain.create(backend, Extent2d::new(800, 600)).unwrap();
        chain
    }

    #[test]
    fn create_builds_matching_lists() {
        let mut backend = MockBackend::new();
        let chain = active(&mut backend);
        assert_eq!(chain.counts(), (3, 3, 3));
        assert!(chain.is_active());
        assert!(!chain.is_stale());
        assert_eq!(backend.live_framebuffers.len(), 3);
    }

    #[test]
    fn rebuild_replaces_every_handle() {
        let mut backend = MockBackend::new();
        let mut chain = active(&mut backend);
        let old_views = backend.live_views.clone();
        let old_framebuffers = backend.live_framebuffers.clone();

        backend.chain_image_count = 2;
        assert!(chain.rebuild(&mut backend, Extent2d::new(1024, 768)).unwrap());

        assert_eq!(chain.counts(), (2, 2, 2));
        assert_eq!(chain.extent(), Extent2d::new(1024, 768));
        assert_eq!(chain.framebuffer(1).map(|fb| fb.extent), Some(Extent2d::new(1024, 768)));
        assert!(chain.framebuffer(2).is_none());
        assert_eq!(backend.destroyed_views, old_views);
        assert_eq!(backend.destroyed_framebuffers, old_framebuffers);
        assert!(backend.live_views.is_disjoint(&backend.destroyed_views));
        assert!(backend.live_framebuffers.is_disjoint(&backend.destroyed_framebuffers));
        assert_eq!(backend.globals, Some(GlobalData::from(Extent2d::new(1024, 768))));
    }

    #[test]
    fn rebuild_waits_for_idle_before_teardown() {
        let mut backend = MockBackend::new();
        let mut chain = active(&mut backend);
        backend.events.clear();

        chain.rebuild(&mut backend, Extent2d::new(640, 480)).unwrap();

        let idle = backend.position(MockEvent::WaitIdle).unwrap();
        let first_destroy = backend
            .events
            .iter()
            .position(|e| matches!(e, MockEvent::DestroyFramebuffer(_)))
            .unwrap();
        let first_view_destroy = backend
            .events
            .iter()
            .position(|e| matches!(e, MockEvent::DestroyView(_)))
            .unwrap();
        let last_fb_destroy = backend
            .events
            .iter()
            .rposition(|e| matches!(e, MockEvent::DestroyFramebuffer(_)))
            .unwrap();
        let chain_destroy = backend.position(MockEvent::DestroyChain).unwrap();
        let chain_create = backend
            .events
            .iter()
            .position(|e| matches!(e, MockEvent::CreateChain(_)))
            .unwrap();

        assert!(idle < first_destroy);
        assert!(last_fb_destroy < first_view_destroy);
        assert!(chain_destroy < chain_create);
    }

    #[test]
    fn too_many_images_is_rejected_and_released() {
        let mut backend = MockBackend::new();
        backend.chain_image_count = MAX_SWAPCHAIN_IMAGES + 1;
        let mut chain = SwapchainManager::<MockBackend>::new();

        let err = chain.create(&mut backend, Extent2d::new(800, 600)).unwrap_err();

        assert_eq!(
            err,
            RenderError::TooManySwapchainImages { count: MAX_SWAPCHAIN_IMAGES + 1, max: MAX_SWAPCHAIN_IMAGES }
        );
        assert_eq!(backend.count(MockEvent::DestroyChain), 1);
        assert!(!backend.chain_live);
        assert!(!chain.is_active());
        assert_eq!(chain.counts(), (0, 0, 0));
    }

    #[test]
    fn partial_failure_releases_created_views() {
        let mut backend = MockBackend::new();
        backend.fail_view_at = Some(1);
        let mut chain = SwapchainManager::<MockBackend>::new();

        let err = chain.create(&mut backend, Extent2d::new(800, 600)).unwrap_err();

        assert_eq!(err, RenderError::OutOfMemory);
        assert!(backend.live_views.is_empty());
        assert_eq!(backend.destroyed_views.len(), 1);
        assert!(!backend.chain_live);
        assert_eq!(chain.counts(), (0, 0, 0));
    }

    #[test]
    fn empty_extent_defers_the_rebuild() {
        let mut backend = MockBackend::new();
        let mut chain = active(&mut backend);

        assert!(!chain.rebuild(&mut backend, Extent2d::new(0, 0)).unwrap());
        assert_eq!(chain.counts(), (0, 0, 0));
        assert!(chain.is_stale());
        assert!(chain.is_active());

        assert!(chain.rebuild(&mut backend, Extent2d::new(300, 200)).unwrap());
        assert_eq!(chain.counts(), (3, 3, 3));
        assert!(!chain.is_stale());
    }

    #[test]
    fn rebuild_requires_an_active_chain() {
        let mut backend = MockBackend::new();
        let mut chain = SwapchainManager::<MockBackend>::new();
        let err = chain.rebuild(&mut backend, Extent2d::new(10, 10)).unwrap_err();
        assert_eq!(err, RenderError::SwapchainInactive);

        let mut chain = active(&mut backend);
        chain.destroy(&mut backend);
        assert_eq!(chain.counts(), (0, 0, 0));
        assert!(backend.live_framebuffers.is_empty());
        assert_eq!(
            chain.rebuild(&mut backend, Extent2d::new(10, 10)).unwrap_err(),
            RenderError::SwapchainInactive
        );
    }
}
