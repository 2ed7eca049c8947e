use std::fmt;

use crate::text::AtlasError;

use super::ImageId;

/// Errors raised by the renderer core and its backends.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The image table is at capacity.
    ImageTableFull { capacity: usize },
    /// The descriptor table (or pool) is at capacity.
    DescriptorTableFull { capacity: usize },
    /// A descriptor was requested for an image that has not been created.
    ImageMissing(ImageId),
    /// Pixel data length does not match `width * height * bytes_per_pixel`.
    InvalidPixelData { id: ImageId, expected: usize, actual: usize },
    /// The upload does not fit the staging buffer.
    StagingOverflow { required: u64, capacity: u64 },
    /// The presentation engine handed out more images than the renderer tracks.
    TooManySwapchainImages { count: usize, max: usize },
    /// An operation needed an active swapchain.
    SwapchainInactive,
    /// The surface is gone and cannot be reconfigured.
    SurfaceLost,
    /// The device ran out of memory.
    OutOfMemory,
    /// A fence or acquire wait failed; the device is considered lost.
    DeviceLost(String),
    /// Shader source could not be loaded or failed validation.
    Shader(String),
    /// Font atlas baking failed.
    Atlas(AtlasError),
}

impl RenderError {
    /// Errors after which no further frame can be rendered.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::SurfaceLost
                | RenderError::OutOfMemory
                | RenderError::DeviceLost(_)
                | RenderError::SwapchainInactive
        )
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ImageTableFull { capacity } => {
                write!(f, "image table is full ({capacity} entries)")
            }
            RenderError::DescriptorTableFull { capacity } => {
                write!(f, "descriptor table is full ({capacity} entries)")
            }
            RenderError::ImageMissing(id) => write!(f, "no image exists for {id:?}"),
            RenderError::InvalidPixelData { id, expected, actual } => write!(
                f,
                "pixel data for {id:?} has {actual} bytes, expected {expected}"
            ),
            RenderError::StagingOverflow { required, capacity } => write!(
                f,
                "upload of {required} bytes exceeds the {capacity} byte staging buffer"
            ),
            RenderError::TooManySwapchainImages { count, max } => {
                write!(f, "swapchain has {count} images, at most {max} are supported")
            }
            RenderError::SwapchainInactive => write!(f, "swapchain is not active"),
            RenderError::SurfaceLost => write!(f, "surface lost"),
            RenderError::OutOfMemory => write!(f, "device out of memory"),
            RenderError::DeviceLost(msg) => write!(f, "device lost: {msg}"),
            RenderError::Shader(msg) => write!(f, "shader error: {msg}"),
            RenderError::Atlas(e) => write!(f, "font atlas: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Atlas(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AtlasError> for RenderError {
    fn from(e: AtlasError) -> Self {
        RenderError::Atlas(e)
    }
}
