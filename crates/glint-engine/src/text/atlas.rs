use std::fmt;

use crate::coords::Vec2;
use crate::render::UvRect;

use super::raster::{GlyphRasterizer, RasterGlyph};

/// Empty texels kept around every glyph in the atlas.
pub const FONT_PADDING: u32 = 2;

/// Character codes baked into the atlas (`0..GLYPH_COUNT`).
pub const GLYPH_COUNT: usize = 127;

/// Error returned by [`FontAtlasBaker::bake`].
#[derive(Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// The atlas has no texels.
    EmptyAtlas,
    /// A glyph is wider than an entire atlas row.
    GlyphTooWide { code: u8, width: u32, atlas_size: u32 },
    /// The packed rows run past the bottom of the atlas.
    Overflow { code: u8, required_height: u32, atlas_size: u32 },
    /// The rasterizer returned a bitmap whose length disagrees with its size.
    InvalidBitmap { code: u8, expected: usize, actual: usize },
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::EmptyAtlas => write!(f, "atlas size is zero"),
            AtlasError::GlyphTooWide { code, width, atlas_size } => write!(
                f,
                "glyph {code} is {width}px wide and does not fit a {atlas_size}px atlas row"
            ),
            AtlasError::Overflow { code, required_height, atlas_size } => write!(
                f,
                "glyph {code} needs {required_height}px of atlas height, atlas is {atlas_size}px"
            ),
            AtlasError::InvalidBitmap { code, expected, actual } => write!(
                f,
                "glyph {code} bitmap has {actual} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for AtlasError {}

/// Placement of one glyph in the atlas.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Glyph {
    /// Bitmap extent plus padding, in pixels.
    pub size: Vec2,
    pub uv: UvRect,
    pub x_off: f32,
    pub y_off: f32,
}

/// Per-character atlas metadata; immutable once baked.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphCache {
    font_size: u32,
    atlas_size: u32,
    glyphs: Vec<Glyph>,
}

impl GlyphCache {
    #[inline]
    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    #[inline]
    pub fn atlas_size(&self) -> u32 {
        self.atlas_size
    }

    /// Returns `None` for codes outside the baked range.
    #[inline]
    pub fn glyph(&self, code: u8) -> Option<&Glyph> {
        self.glyphs.get(code as usize)
    }
}

/// Output of [`FontAtlasBaker::bake`]: the R8 bitmap and its glyph table.
#[derive(Debug, Clone)]
pub struct BakedAtlas {
    /// `atlas_size * atlas_size` coverage texels, row-major.
    pub bitmap: Vec<u8>,
    pub glyphs: GlyphCache,
}

/// Packs glyphs `0..GLYPH_COUNT` into one square grayscale bitmap.
///
/// Glyphs are placed left to right on fixed-pitch rows. The row pitch is the
/// larger of the font size and the tallest glyph, plus padding, so rows
/// never overlap.
#[derive(Debug, Copy, Clone)]
pub struct FontAtlasBaker {
    atlas_size: u32,
    font_size: u32,
}

impl FontAtlasBaker {
    pub fn new(atlas_size: u32, font_size: u32) -> Self {
        Self { atlas_size, font_size }
    }

    pub fn bake(&self, rasterizer: &dyn GlyphRasterizer) -> Result<BakedAtlas, AtlasError> {
        let size = self.atlas_size;
        if size == 0 {
            return Err(AtlasError::EmptyAtlas);
        }

        let scale = rasterizer.pixel_scale(self.font_size);
        let rasters: Vec<RasterGlyph> = (0..GLYPH_COUNT as u8)
            .map(|code| rasterizer.rasterize(code, scale))
            .collect();

        for (code, g) in rasters.iter().enumerate() {
            let expected = g.width as usize * g.height as usize;
            if g.bitmap.len() != expected {
                return Err(AtlasError::InvalidBitmap {
                    code: code as u8,
                    expected,
                    actual: g.bitmap.len(),
                });
            }
        }

        let tallest = rasters.iter().map(|g| g.height).max().unwrap_or(0);
        let row_pitch = self.font_size.max(tallest) + FONT_PADDING;

        let stride = size as usize;
        let mut bitmap = vec![0u8; stride * stride];
        let mut glyphs = Vec::with_capacity(GLYPH_COUNT);

        let mut row = 0u32;
        let mut col = FONT_PADDING;

        for (code, g) in rasters.iter().enumerate() {
            let code = code as u8;

            if 2 * FONT_PADDING + g.width >= size {
                return Err(AtlasError::GlyphTooWide {
                    code,
                    width: g.width,
                    atlas_size: size,
                });
            }

            if col + FONT_PADDING + g.width >= size {
                row += 1;
                col = FONT_PADDING;
            }

            let top = row * row_pitch + FONT_PADDING;
            let required_height = top + g.height + FONT_PADDING;
            if required_height > size {
                return Err(AtlasError::Overflow {
                    code,
                    required_height,
                    atlas_size: size,
                });
            }

            let w = g.width as usize;
            if w > 0 {
                for (y, src) in g.bitmap.chunks_exact(w).enumerate() {
                    let start = (top as usize + y) * stride + col as usize;
                    bitmap[start..start + w].copy_from_slice(src);
                }
            }

            // UVs cover the glyph plus half the padding on each side.
            let half = FONT_PADDING / 2;
            let u0 = col - half;
            let v0 = top - half;
            let atlas_f = size as f32;
            let uv = UvRect {
                top: v0 as f32 / atlas_f,
                bottom: (v0 + g.height + FONT_PADDING) as f32 / atlas_f,
                left: u0 as f32 / atlas_f,
                right: (u0 + g.width + FONT_PADDING) as f32 / atlas_f,
            };

            glyphs.push(Glyph {
                size: Vec2::new(
                    (g.width + FONT_PADDING) as f32,
                    (g.height + FONT_PADDING) as f32,
                ),
                uv,
                x_off: g.x_offset as f32,
                y_off: g.y_offset as f32,
            });

            col += g.width + FONT_PADDING;
        }

        log::debug!(
            "baked {} glyphs into {}x{} atlas ({} rows, pitch {})",
            glyphs.len(),
            size,
            size,
            row + 1,
            row_pitch
        );

        Ok(BakedAtlas {
            bitmap,
            glyphs: GlyphCache {
                font_size: self.font_size,
                atlas_size: size,
                glyphs,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every printable code is a `width x height` block filled with its code;
    /// space and control codes are empty.
    struct BlockRasterizer {
        width: u32,
        height: u32,
    }

    impl GlyphRasterizer for BlockRasterizer {
        fn rasterize(&self, code: u8, _scale: f32) -> RasterGlyph {
            if code <= b' ' {
                return RasterGlyph::default();
            }
            RasterGlyph {
                width: self.width,
                height: self.height,
                x_offset: 1,
                y_offset: -(self.height as i32),
                bitmap: vec![code; (self.width * self.height) as usize],
            }
        }
    }

    const BLOCK: BlockRasterizer = BlockRasterizer { width: 10, height: 12 };

    fn px(atlas: &BakedAtlas, x: u32, y: u32) -> u8 {
        let size = atlas.glyphs.atlas_size();
        atlas.bitmap[(y * size + x) as usize]
    }

    #[test]
    fn baking_is_deterministic() {
        let baker = FontAtlasBaker::new(256, 16);
        let a = baker.bake(&BLOCK).unwrap();
        let b = baker.bake(&BLOCK).unwrap();
        assert_eq!(a.bitmap, b.bitmap);
        assert_eq!(a.glyphs, b.glyphs);
    }

    #[test]
    fn first_printable_glyph_lands_after_empty_codes() {
        // 33 empty codes advance the cursor by the padding each: 2 + 33 * 2 = 68.
        let atlas = FontAtlasBaker::new(256, 16).bake(&BLOCK).unwrap();
        let g = atlas.glyphs.glyph(b'!').copied().unwrap();

        assert_eq!(g.size, Vec2::new(12.0, 14.0));
        assert_eq!(g.uv.left, 67.0 / 256.0);
        assert_eq!(g.uv.right, 79.0 / 256.0);
        assert_eq!(g.uv.top, 1.0 / 256.0);
        assert_eq!(g.uv.bottom, 15.0 / 256.0);
        assert_eq!((g.x_off, g.y_off), (1.0, -12.0));

        assert_eq!(px(&atlas, 68, 2), b'!');
        assert_eq!(px(&atlas, 77, 13), b'!');
        assert_eq!(px(&atlas, 67, 2), 0);
        assert_eq!(px(&atlas, 78, 2), 0);
    }

    #[test]
    fn glyph_that_would_cross_the_edge_wraps_to_next_row() {
        // Printable glyphs start at x = 68 and advance 12; '0' would start at 248.
        let atlas = FontAtlasBaker::new(256, 16).bake(&BLOCK).unwrap();

        let last_in_row = atlas.glyphs.glyph(b'/').copied().unwrap();
        assert_eq!(last_in_row.uv.left, 235.0 / 256.0);
        assert_eq!(last_in_row.uv.top, 1.0 / 256.0);

        // Row pitch is max(16, 12) + 2 = 18.
        let wrapped = atlas.glyphs.glyph(b'0').copied().unwrap();
        assert_eq!(wrapped.uv.left, 1.0 / 256.0);
        assert_eq!(wrapped.uv.top, 19.0 / 256.0);
        assert_eq!(px(&atlas, 2, 20), b'0');
    }

    #[test]
    fn uvs_stay_inside_the_atlas() {
        let atlas = FontAtlasBaker::new(512, 32)
            .bake(&BlockRasterizer { width: 20, height: 28 })
            .unwrap();
        for code in 0..GLYPH_COUNT as u8 {
            let uv = atlas.glyphs.glyph(code).unwrap().uv;
            for v in [uv.top, uv.bottom, uv.left, uv.right] {
                assert!((0.0..=1.0).contains(&v), "code {code}: {uv:?}");
            }
            assert!(uv.left < uv.right && uv.top < uv.bottom);
        }
        assert!(atlas.glyphs.glyph(127).is_none());
    }

    #[test]
    fn overflowing_rows_fail_instead_of_overwriting() {
        let err = FontAtlasBaker::new(64, 16).bake(&BLOCK).unwrap_err();
        assert!(matches!(err, AtlasError::Overflow { atlas_size: 64, .. }), "{err:?}");
    }

    #[test]
    fn glyph_wider_than_a_row_is_rejected() {
        let err = FontAtlasBaker::new(64, 16)
            .bake(&BlockRasterizer { width: 61, height: 4 })
            .unwrap_err();
        assert_eq!(
            err,
            AtlasError::GlyphTooWide { code: b'!', width: 61, atlas_size: 64 }
        );
    }

    #[test]
    fn mismatched_bitmap_length_is_rejected() {
        struct Broken;
        impl GlyphRasterizer for Broken {
            fn rasterize(&self, _code: u8, _scale: f32) -> RasterGlyph {
                RasterGlyph { width: 2, height: 2, bitmap: vec![0; 3], ..Default::default() }
            }
        }
        let err = FontAtlasBaker::new(64, 8).bake(&Broken).unwrap_err();
        assert_eq!(err, AtlasError::InvalidBitmap { code: 0, expected: 4, actual: 3 });
    }

    #[test]
    fn zero_sized_atlas_is_rejected() {
        assert_eq!(FontAtlasBaker::new(0, 16).bake(&BLOCK).unwrap_err(), AtlasError::EmptyAtlas);
    }
}
