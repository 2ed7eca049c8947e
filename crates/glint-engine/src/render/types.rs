//! CPU-side records shared by the cache, the batch builder and the backends.
//!
//! The `#[repr(C)]` types are uploaded verbatim; their layouts must match
//! `shaders/quad.wgsl`.

use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Extent2d, Vec2};

/// Application-defined image identity.
///
/// The set is closed: every image the renderer can sample has a variant here.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageId {
    /// 1x1 opaque white texel, used for solid rectangles.
    White = 0,
    /// The baked glyph atlas.
    Font = 1,
}

impl ImageId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ImageId::White),
            1 => Some(ImageId::Font),
            _ => None,
        }
    }
}

/// Texel format of a managed image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, linear.
    Rgba8,
    /// 8-bit single channel coverage (font atlas).
    R8,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::R8 => 1,
        }
    }
}

/// Sub-rectangle of an image in normalized texture coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct UvRect {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect { top: 0.0, bottom: 1.0, left: 0.0, right: 1.0 };
}

/// One quad to draw this frame (48 bytes, std430 compatible).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Transform {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub top_v: f32,
    pub bottom_v: f32,
    pub left_u: f32,
    pub right_u: f32,
    pub material_idx: u32,
    pub image_id: u32,
    pub animation_idx: u32,
    pub _pad: u32,
}

impl Transform {
    pub fn new(image: ImageId, pos: Vec2, size: Vec2, uv: UvRect, material_idx: u32, animation_idx: u32) -> Self {
        Self {
            pos: [pos.x, pos.y],
            size: [size.x, size.y],
            top_v: uv.top,
            bottom_v: uv.bottom,
            left_u: uv.left,
            right_u: uv.right,
            material_idx,
            image_id: image.raw(),
            animation_idx,
            _pad: 0,
        }
    }

    #[inline]
    pub fn image(&self) -> Option<ImageId> {
        ImageId::from_raw(self.image_id)
    }
}

/// Deduplicated per-frame tint.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialData {
    pub color: [f32; 4],
}

impl From<ColorRgba> for MaterialData {
    #[inline]
    fn from(c: ColorRgba) -> Self {
        Self { color: c.to_array() }
    }
}

/// Contents of the global uniform buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct GlobalData {
    pub screen_size: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

impl From<Extent2d> for GlobalData {
    #[inline]
    fn from(extent: Extent2d) -> Self {
        Self {
            screen_size: [extent.width as f32, extent.height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Per-draw constant: index of the first Transform of the run.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct PushData {
    pub transform_idx: u32,
}

/// Dense index into the resource cache's descriptor table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DescriptorIndex(pub(crate) usize);

impl DescriptorIndex {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

/// One instanced draw over a contiguous run of same-descriptor Transforms.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderCommand {
    pub descriptor: DescriptorIndex,
    pub instance_count: u32,
    pub push: PushData,
}

/// Index list of the unit quad (two triangles).
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_records_have_shader_layout_sizes() {
        assert_eq!(std::mem::size_of::<Transform>(), 48);
        assert_eq!(std::mem::size_of::<MaterialData>(), 16);
        assert_eq!(std::mem::size_of::<GlobalData>(), 16);
        assert_eq!(std::mem::size_of::<PushData>(), 4);
    }

    #[test]
    fn image_id_raw_round_trips() {
        for id in [ImageId::White, ImageId::Font] {
            assert_eq!(ImageId::from_raw(id.raw()), Some(id));
        }
        assert_eq!(ImageId::from_raw(7), None);
    }

    #[test]
    fn transform_carries_uv_and_image() {
        let uv = UvRect { top: 0.1, bottom: 0.2, left: 0.3, right: 0.4 };
        let t = Transform::new(ImageId::Font, Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0), uv, 5, 65);
        assert_eq!(t.image(), Some(ImageId::Font));
        assert_eq!((t.top_v, t.bottom_v, t.left_u, t.right_u), (0.1, 0.2, 0.3, 0.4));
        assert_eq!(t.material_idx, 5);
        assert_eq!(t.animation_idx, 65);
    }
}
