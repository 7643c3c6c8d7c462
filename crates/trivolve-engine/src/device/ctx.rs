/// Device-facing context (device + queue).
///
/// Every stage constructor and per-frame call receives this by reference
/// instead of reaching for process-wide state. It is cheap to copy and
/// only borrows from the owning [`Gpu`](super::Gpu) or
/// [`HeadlessGpu`](super::HeadlessGpu).
#[derive(Copy, Clone)]
pub struct DeviceCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> DeviceCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}
