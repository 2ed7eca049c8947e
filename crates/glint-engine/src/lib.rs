//! Glint engine crate.
//!
//! A small 2D renderer: textured quads batched into instanced draws, a baked
//! glyph atlas for text, and a winit runtime that drives one window.

pub mod backend;
pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod text;
pub mod window;
