//! wgpu device + surface ownership.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating the Surface and (re)configuring it at a given extent
//! - surface format and alpha mode selection

mod gpu;
mod init;
mod surface;

pub use gpu::Gpu;
pub use init::GpuInit;
