use crate::coords::ColorRgba;

use super::{DescriptorIndex, ImageId, MaterialData, PushData, RenderCommand, Transform};

/// Per-frame transform, material and render-command tables.
///
/// Transforms are kept in submission order. [`FrameBatch::build_commands`]
/// splits them into consecutive same-descriptor runs; there is no sorting,
/// so painter's order is preserved exactly.
pub struct FrameBatch {
    transforms: Vec<Transform>,
    materials: Vec<MaterialData>,
    commands: Vec<RenderCommand>,

    max_transforms: usize,
    max_materials: usize,
    max_commands: usize,

    // One warning per table per frame.
    warned_transforms: bool,
    warned_materials: bool,
}

impl FrameBatch {
    pub fn new(max_transforms: usize, max_materials: usize, max_commands: usize) -> Self {
        Self {
            transforms: Vec::with_capacity(max_transforms),
            materials: Vec::with_capacity(max_materials),
            commands: Vec::with_capacity(max_commands),
            max_transforms,
            max_materials,
            max_commands,
            warned_transforms: false,
            warned_materials: false,
        }
    }

    /// Returns the material slot for `color`, appending it if new.
    ///
    /// Lookup is exact equality. When the table is full the color is dropped
    /// and slot 0 is returned.
    pub fn material_index(&mut self, color: ColorRgba) -> u32 {
        let material = MaterialData::from(color);
        if let Some(idx) = self.materials.iter().position(|m| *m == material) {
            return idx as u32;
        }

        if self.materials.len() >= self.max_materials {
            if !self.warned_materials {
                log::warn!(
                    "material table full ({} entries); falling back to slot 0",
                    self.max_materials
                );
                self.warned_materials = true;
            }
            return 0;
        }

        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Appends a transform. Returns `false` (and drops it) when the table is full.
    pub fn push(&mut self, transform: Transform) -> bool {
        if self.transforms.len() >= self.max_transforms {
            if !self.warned_transforms {
                log::warn!(
                    "transform table full ({} entries); dropping quads",
                    self.max_transforms
                );
                self.warned_transforms = true;
            }
            return false;
        }
        self.transforms.push(transform);
        true
    }

    /// Partitions the transforms into instanced draws.
    ///
    /// `resolve` maps an image to its descriptor. Transforms that do not
    /// resolve are skipped and end the current run, so every command covers
    /// a contiguous index range. Once the command table is full the remaining
    /// transforms are left undrawn.
    pub fn build_commands<F>(&mut self, mut resolve: F)
    where
        F: FnMut(ImageId) -> Option<DescriptorIndex>,
    {
        self.commands.clear();
        let mut current: Option<DescriptorIndex> = None;

        for (idx, t) in self.transforms.iter().enumerate() {
            let Some(descriptor) = t.image().and_then(&mut resolve) else {
                current = None;
                continue;
            };

            if current == Some(descriptor) {
                if let Some(last) = self.commands.last_mut() {
                    last.instance_count += 1;
                }
                continue;
            }

            if self.commands.len() >= self.max_commands {
                log::warn!(
                    "render command table full ({} entries); {} quads left undrawn",
                    self.max_commands,
                    self.transforms.len() - idx
                );
                break;
            }

            self.commands.push(RenderCommand {
                descriptor,
                instance_count: 1,
                push: PushData { transform_idx: idx as u32 },
            });
            current = Some(descriptor);
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn materials(&self) -> &[MaterialData] {
        &self.materials
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Clears transforms and materials after upload.
    pub fn reset_tables(&mut self) {
        self.transforms.clear();
        self.materials.clear();
        self.warned_transforms = false;
        self.warned_materials = false;
    }

    pub fn reset_commands(&mut self) {
        self.commands.clear();
    }
}
