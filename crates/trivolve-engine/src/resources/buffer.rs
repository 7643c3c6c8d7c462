use anyhow::{Context, Result};
use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::device::DeviceCtx;

/// Allocates an uninitialised buffer of `size` bytes.
pub fn allocate_buffer(
    ctx: DeviceCtx<'_>,
    label: &str,
    usage: wgpu::BufferUsages,
    size: u64,
) -> wgpu::Buffer {
    ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

/// Allocates a buffer holding `contents`.
pub fn allocate_buffer_init(
    ctx: DeviceCtx<'_>,
    label: &str,
    usage: wgpu::BufferUsages,
    contents: &[u8],
) -> wgpu::Buffer {
    ctx.device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        })
}

/// Copies the first `len` elements of `buffer` back to the host.
///
/// Blocks until the GPU is idle. For tests and diagnostics; the frame loop
/// never calls this. `buffer` needs `COPY_SRC`.
pub fn read_buffer<T: Pod>(ctx: DeviceCtx<'_>, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<T>> {
    let size = (len * std::mem::size_of::<T>()) as u64;
    anyhow::ensure!(
        size <= buffer.size(),
        "read of {size} bytes exceeds buffer size {}",
        buffer.size()
    );

    let staging = allocate_buffer(
        ctx,
        "trivolve readback staging",
        wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        size,
    );

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trivolve readback encoder"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("failed to wait for readback")?;

    rx.recv()
        .context("readback callback never ran")?
        .context("failed to map readback buffer")?;

    let mapped = slice.get_mapped_range();
    let out: Vec<T> = bytemuck::cast_slice(&mapped).to_vec();
    drop(mapped);
    staging.unmap();
    Ok(out)
}
