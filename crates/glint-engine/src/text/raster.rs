use std::fmt;

/// Error returned by [`FontdueRasterizer::from_bytes`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Grayscale bitmap of one rasterized glyph.
///
/// `x_offset`/`y_offset` place the bitmap's top-left corner relative to the
/// pen position on the baseline, in a +Y down coordinate system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterGlyph {
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Row-major coverage, `width * height` bytes.
    pub bitmap: Vec<u8>,
}

/// Turns character codes into coverage bitmaps.
pub trait GlyphRasterizer {
    /// Scale factor that maps the target pixel height to the rasterizer's units.
    fn pixel_scale(&self, font_size: u32) -> f32 {
        font_size as f32
    }

    fn rasterize(&self, code: u8, scale: f32) -> RasterGlyph;
}

/// [`GlyphRasterizer`] backed by a single fontdue font.
pub struct FontdueRasterizer {
    font: fontdue::Font,
}

impl FontdueRasterizer {
    /// Parses a TrueType or OpenType font from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        Ok(Self { font })
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    /// fontdue sizes are pixels per em; pick the size at which
    /// ascent - descent spans `font_size` pixels.
    fn pixel_scale(&self, font_size: u32) -> f32 {
        let target = font_size as f32;
        match self.font.horizontal_line_metrics(1.0) {
            Some(m) if m.ascent - m.descent > 0.0 => target / (m.ascent - m.descent),
            _ => target,
        }
    }

    fn rasterize(&self, code: u8, scale: f32) -> RasterGlyph {
        let (metrics, bitmap) = self.font.rasterize(char::from(code), scale);
        RasterGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            x_offset: metrics.xmin,
            y_offset: -(metrics.ymin + metrics.height as i32),
            bitmap,
        }
    }
}
