//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (windowed or headless)
//! - creating & configuring the Surface (swapchain)
//! - exposing the explicit [`DeviceCtx`] passed to every GPU-side stage

mod ctx;
mod gpu;
mod headless;
mod init;
mod surface;

pub use ctx::DeviceCtx;
pub use gpu::Gpu;
pub use headless::HeadlessGpu;
pub use init::GpuInit;
