//! Buffer and image allocation services.
//!
//! Thin wrappers over wgpu object creation with the labels and usages the
//! stages need. Freeing is `Drop`; layouts are tracked by wgpu.

mod buffer;
mod texture;

pub use buffer::{allocate_buffer, allocate_buffer_init, read_buffer};
pub use texture::{allocate_image, load_image_from_file, upload_rgba, GpuImage};
