//! Font rasterization and glyph atlas baking.

mod atlas;
mod raster;

pub use atlas::{AtlasError, BakedAtlas, FONT_PADDING, FontAtlasBaker, GLYPH_COUNT, Glyph, GlyphCache};
pub use raster::{FontLoadError, FontdueRasterizer, GlyphRasterizer, RasterGlyph};
