use crate::backend::{GpuBackend, ImageDesc};

use super::{DescriptorIndex, ImageId, PixelFormat, RenderError};

struct ImageRecord<I> {
    id: ImageId,
    format: PixelFormat,
    width: u32,
    height: u32,
    handle: I,
}

/// Append-only table of images and their descriptors.
///
/// Both tables are bounded and only grow; lookups are linear scans, which is
/// fine at the handful of entries a frame touches. Everything is released in
/// [`ResourceCache::destroy_all`] at shutdown.
pub struct ResourceCache<B: GpuBackend> {
    images: Vec<ImageRecord<B::Image>>,
    descriptor_ids: Vec<ImageId>,
    descriptors: Vec<B::Descriptor>,
    max_images: usize,
    max_descriptors: usize,
    /// Images whose descriptor could not be resolved; each is logged once.
    unresolved: Vec<ImageId>,
}

impl<B: GpuBackend> ResourceCache<B> {
    pub fn new(max_images: usize, max_descriptors: usize) -> Self {
        Self {
            images: Vec::with_capacity(max_images),
            descriptor_ids: Vec::with_capacity(max_descriptors),
            descriptors: Vec::with_capacity(max_descriptors),
            max_images,
            max_descriptors,
            unresolved: Vec::new(),
        }
    }

    /// Returns the image for `desc.id`, uploading it on first request.
    ///
    /// A cached id performs no allocation; the pixel data is ignored then.
    pub fn get_or_create_image(
        &mut self,
        backend: &mut B,
        desc: &ImageDesc<'_>,
    ) -> Result<&B::Image, RenderError> {
        if let Some(pos) = self.images.iter().position(|r| r.id == desc.id) {
            return Ok(&self.images[pos].handle);
        }

        if self.images.len() >= self.max_images {
            log::warn!(
                "image table full ({} entries); dropping {:?}",
                self.max_images,
                desc.id
            );
            return Err(RenderError::ImageTableFull { capacity: self.max_images });
        }

        let expected = desc.expected_len();
        if desc.pixels.len() != expected {
            return Err(RenderError::InvalidPixelData {
                id: desc.id,
                expected,
                actual: desc.pixels.len(),
            });
        }

        let handle = backend.create_image(desc)?;
        log::debug!(
            "created image {:?} ({}x{} {:?})",
            desc.id,
            desc.width,
            desc.height,
            desc.format
        );

        self.images.push(ImageRecord {
            id: desc.id,
            format: desc.format,
            width: desc.width,
            height: desc.height,
            handle,
        });
        let last = self.images.len() - 1;
        Ok(&self.images[last].handle)
    }

    pub fn has_image(&self, id: ImageId) -> bool {
        self.images.iter().any(|r| r.id == id)
    }

    /// Returns `(width, height, format)` of a cached image.
    pub fn image_info(&self, id: ImageId) -> Option<(u32, u32, PixelFormat)> {
        self.images
            .iter()
            .find(|r| r.id == id)
            .map(|r| (r.width, r.height, r.format))
    }

    /// Returns the descriptor index for `id`, creating the descriptor on first use.
    pub fn get_or_create_descriptor(
        &mut self,
        backend: &mut B,
        id: ImageId,
    ) -> Result<DescriptorIndex, RenderError> {
        if let Some(index) = self.descriptor_index(id) {
            return Ok(index);
        }

        if self.descriptors.len() >= self.max_descriptors {
            if self.first_failure(id) {
                log::warn!(
                    "descriptor table full ({} entries); cannot bind {:?}",
                    self.max_descriptors,
                    id
                );
            }
            return Err(RenderError::DescriptorTableFull { capacity: self.max_descriptors });
        }

        let Some(record) = self.images.iter().find(|r| r.id == id) else {
            if self.first_failure(id) {
                log::error!("no image exists for {id:?}; create it before drawing");
            }
            return Err(RenderError::ImageMissing(id));
        };

        let descriptor = match backend.create_descriptor(&record.handle) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                if self.first_failure(id) {
                    log::warn!("cannot create a descriptor for {id:?}: {e}");
                }
                return Err(e);
            }
        };
        self.descriptor_ids.push(id);
        self.descriptors.push(descriptor);
        log::debug!("created descriptor {} for {:?}", self.descriptors.len() - 1, id);

        Ok(DescriptorIndex(self.descriptors.len() - 1))
    }

    /// Records a failed lookup; true the first time `id` fails.
    fn first_failure(&mut self, id: ImageId) -> bool {
        if self.unresolved.contains(&id) {
            return false;
        }
        self.unresolved.push(id);
        true
    }

    pub fn descriptor_index(&self, id: ImageId) -> Option<DescriptorIndex> {
        self.descriptor_ids
            .iter()
            .position(|d| *d == id)
            .map(DescriptorIndex)
    }

    /// Descriptor table, indexed by [`DescriptorIndex`].
    pub fn descriptors(&self) -> &[B::Descriptor] {
        &self.descriptors
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Releases every descriptor and image. The device must be idle.
    pub fn destroy_all(&mut self, backend: &mut B) {
        self.descriptor_ids.clear();
        for descriptor in self.descriptors.drain(..) {
            backend.destroy_descriptor(descriptor);
        }
        for record in self.images.drain(..) {
            backend.destroy_image(record.handle);
        }
    }
}
