//! Plain value types shared by the renderer and the application layer.
//!
//! Canonical CPU space:
//! - Physical pixels of the window client area
//! - Origin top-left
//! - +X right, +Y down
//!
//! The quad shader converts to NDC using the screen size in the global uniform.

mod color;
mod extent;
mod vec2;

pub use color::ColorRgba;
pub use extent::Extent2d;
pub use vec2::Vec2;
