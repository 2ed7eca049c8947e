//! Recording backend for unit tests.

use std::collections::{BTreeSet, VecDeque};

use crate::coords::Extent2d;
use crate::render::{GlobalData, ImageId, MaterialData, RenderError, Transform};

use super::{Acquire, FrameRecording, GpuBackend, ImageDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MockEvent {
    CreateImage(ImageId),
    DestroyImage(u32),
    CreateDescriptor(u32),
    DestroyDescriptor(u32),
    WriteGlobals,
    WriteTransforms(usize),
    WriteMaterials(usize),
    WaitForFrame,
    WaitIdle,
    CreateChain(Extent2d),
    DestroyChain,
    CreateView(u32),
    DestroyView(u32),
    CreateFramebuffer(u32),
    DestroyFramebuffer(u32),
    Acquire,
    Submit,
    Present(u32),
}

#[derive(Debug)]
pub(crate) struct MockImage {
    pub id: u32,
    pub image: ImageId,
}

#[derive(Debug)]
pub(crate) struct MockDescriptor {
    pub id: u32,
    pub image: u32,
}

#[derive(Debug)]
pub(crate) struct MockChainImage {
    pub id: u32,
}

#[derive(Debug)]
pub(crate) struct MockView {
    pub id: u32,
}

#[derive(Debug)]
pub(crate) struct MockFramebuffer {
    pub id: u32,
    pub extent: Extent2d,
}

/// One `draw_indexed` as the GPU would see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockDraw {
    pub descriptor: usize,
    pub first_instance: u32,
    pub instance_count: u32,
}

pub(crate) struct MockBackend {
    next_id: u32,
    next_slot: u32,

    pub events: Vec<MockEvent>,

    pub images_created: usize,
    pub images_destroyed: usize,
    pub descriptors_created: usize,
    pub descriptors_destroyed: usize,
    pub fail_descriptors: bool,

    pub chain_image_count: usize,
    pub chain_live: bool,
    chain_images: BTreeSet<u32>,
    /// Fails the n-th `create_view` call (0-based, counted over the backend's life).
    pub fail_view_at: Option<usize>,
    views_created: usize,
    pub live_views: BTreeSet<u32>,
    pub destroyed_views: BTreeSet<u32>,
    pub live_framebuffers: BTreeSet<u32>,
    pub destroyed_framebuffers: BTreeSet<u32>,

    pub globals: Option<GlobalData>,
    pub transforms: Vec<Transform>,
    pub materials: Vec<MaterialData>,

    pub acquire_script: VecDeque<Acquire>,
    /// Returned (once) by the next `acquire` instead of an image.
    pub fail_acquire: Option<RenderError>,
    pub submissions: Vec<Vec<MockDraw>>,
    /// Viewport extent of every submitted frame.
    pub submitted_extents: Vec<Extent2d>,
    pub presents: Vec<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_slot: 0,
            events: Vec::new(),
            images_created: 0,
            images_destroyed: 0,
            descriptors_created: 0,
            descriptors_destroyed: 0,
            fail_descriptors: false,
            chain_image_count: 3,
            chain_live: false,
            chain_images: BTreeSet::new(),
            fail_view_at: None,
            views_created: 0,
            live_views: BTreeSet::new(),
            destroyed_views: BTreeSet::new(),
            live_framebuffers: BTreeSet::new(),
            destroyed_framebuffers: BTreeSet::new(),
            globals: None,
            transforms: Vec::new(),
            materials: Vec::new(),
            acquire_script: VecDeque::new(),
            fail_acquire: None,
            submissions: Vec::new(),
            submitted_extents: Vec::new(),
            presents: Vec::new(),
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn count(&self, event: MockEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    pub fn position(&self, event: MockEvent) -> Option<usize> {
        self.events.iter().position(|e| *e == event)
    }
}

impl GpuBackend for MockBackend {
    type Image = MockImage;
    type Descriptor = MockDescriptor;
    type ChainImage = MockChainImage;
    type View = MockView;
    type Framebuffer = MockFramebuffer;

    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<MockImage, RenderError> {
        let expected = desc.expected_len();
        if desc.pixels.len() != expected {
            return Err(RenderError::InvalidPixelData {
                id: desc.id,
                expected,
                actual: desc.pixels.len(),
            });
        }
        self.events.push(MockEvent::CreateImage(desc.id));
        self.images_created += 1;
        Ok(MockImage {
            id: self.alloc_id(),
            image: desc.id,
        })
    }

    fn destroy_image(&mut self, image: MockImage) {
        self.events.push(MockEvent::DestroyImage(image.id));
        self.images_destroyed += 1;
    }

    fn create_descriptor(&mut self, image: &MockImage) -> Result<MockDescriptor, RenderError> {
        if self.fail_descriptors {
            return Err(RenderError::DescriptorTableFull { capacity: 0 });
        }
        let id = self.alloc_id();
        self.events.push(MockEvent::CreateDescriptor(id));
        self.descriptors_created += 1;
        Ok(MockDescriptor { id, image: image.id })
    }

    fn destroy_descriptor(&mut self, descriptor: MockDescriptor) {
        self.events.push(MockEvent::DestroyDescriptor(descriptor.id));
        self.descriptors_destroyed += 1;
    }

    fn write_globals(&mut self, globals: &GlobalData) {
        self.events.push(MockEvent::WriteGlobals);
        self.globals = Some(*globals);
    }

    fn write_transforms(&mut self, transforms: &[Transform]) {
        self.events.push(MockEvent::WriteTransforms(transforms.len()));
        self.transforms = transforms.to_vec();
    }

    fn write_materials(&mut self, materials: &[MaterialData]) {
        self.events.push(MockEvent::WriteMaterials(materials.len()));
        self.materials = materials.to_vec();
    }

    fn wait_for_frame(&mut self) -> Result<(), RenderError> {
        self.events.push(MockEvent::WaitForFrame);
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<(), RenderError> {
        self.events.push(MockEvent::WaitIdle);
        Ok(())
    }

    fn create_chain(&mut self, extent: Extent2d) -> Result<Vec<MockChainImage>, RenderError> {
        self.events.push(MockEvent::CreateChain(extent));
        self.chain_live = true;
        self.next_slot = 0;
        let images: Vec<MockChainImage> = (0..self.chain_image_count)
            .map(|_| MockChainImage { id: self.alloc_id() })
            .collect();
        self.chain_images = images.iter().map(|i| i.id).collect();
        Ok(images)
    }

    fn destroy_chain(&mut self) {
        self.events.push(MockEvent::DestroyChain);
        self.chain_live = false;
        self.chain_images.clear();
    }

    fn create_view(&mut self, image: &MockChainImage) -> Result<MockView, RenderError> {
        let n = self.views_created;
        self.views_created += 1;
        if self.fail_view_at == Some(n) {
            return Err(RenderError::OutOfMemory);
        }
        assert!(self.chain_images.contains(&image.id), "view over a released chain image");
        let id = self.alloc_id();
        self.events.push(MockEvent::CreateView(id));
        self.live_views.insert(id);
        Ok(MockView { id })
    }

    fn destroy_view(&mut self, view: MockView) {
        self.events.push(MockEvent::DestroyView(view.id));
        self.live_views.remove(&view.id);
        self.destroyed_views.insert(view.id);
    }

    fn create_framebuffer(
        &mut self,
        view: &MockView,
        extent: Extent2d,
    ) -> Result<MockFramebuffer, RenderError> {
        assert!(self.live_views.contains(&view.id), "framebuffer over a dead view");
        let id = self.alloc_id();
        self.events.push(MockEvent::CreateFramebuffer(id));
        self.live_framebuffers.insert(id);
        Ok(MockFramebuffer { id, extent })
    }

    fn destroy_framebuffer(&mut self, framebuffer: MockFramebuffer) {
        self.events.push(MockEvent::DestroyFramebuffer(framebuffer.id));
        self.live_framebuffers.remove(&framebuffer.id);
        self.destroyed_framebuffers.insert(framebuffer.id);
    }

    fn acquire(&mut self) -> Result<Acquire, RenderError> {
        self.events.push(MockEvent::Acquire);
        if let Some(err) = self.fail_acquire.take() {
            return Err(err);
        }
        if let Some(scripted) = self.acquire_script.pop_front() {
            return Ok(scripted);
        }
        let index = self.next_slot;
        self.next_slot = (self.next_slot + 1) % self.chain_image_count.max(1) as u32;
        Ok(Acquire::Ready(index))
    }

    fn submit(
        &mut self,
        frame: &FrameRecording<'_, MockDescriptor, MockFramebuffer>,
    ) -> Result<(), RenderError> {
        assert!(
            self.live_framebuffers.contains(&frame.framebuffer.id),
            "submit targets a destroyed framebuffer"
        );
        self.events.push(MockEvent::Submit);
        let draws = frame
            .commands
            .iter()
            .map(|cmd| {
                assert!(cmd.descriptor.get() < frame.descriptors.len());
                MockDraw {
                    descriptor: cmd.descriptor.get(),
                    first_instance: cmd.push.transform_idx,
                    instance_count: cmd.instance_count,
                }
            })
            .collect();
        self.submissions.push(draws);
        self.submitted_extents.push(frame.extent);
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<(), RenderError> {
        self.events.push(MockEvent::Present(image_index));
        self.presents.push(image_index);
        Ok(())
    }
}
