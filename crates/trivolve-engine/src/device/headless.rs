use anyhow::{Context, Result};

use super::gpu::request_device;
use super::{DeviceCtx, GpuInit};

/// Device + queue without a surface.
///
/// Runs the same stages as the windowed path; used by tests and tools that
/// never present.
pub struct HeadlessGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;

        Ok(Self {
            device,
            queue,
        })
    }

    /// Blocking variant of [`HeadlessGpu::new`].
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn ctx(&self) -> DeviceCtx<'_> {
        DeviceCtx::new(&self.device, &self.queue)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
