use crate::device::Gpu;

use super::{FrameError, FrameLifecycle, FramePhase, GenerationRoles};

/// One acquired frame.
///
/// Short-lived: holding the surface texture blocks acquisition of the next
/// frame. Hand it back to [`FrameController::end_frame`] promptly.
pub struct Frame {
    pub index: u64,
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl Frame {
    /// Ping-pong roles for this frame.
    pub fn roles(&self) -> GenerationRoles {
        GenerationRoles::for_frame(self.index)
    }
}

/// Drives [`FrameLifecycle`] against the GPU with one frame in flight.
#[derive(Default)]
pub struct FrameController {
    lifecycle: FrameLifecycle,
    in_flight: Option<wgpu::SubmissionIndex>,
}

impl FrameController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FramePhase {
        self.lifecycle.phase()
    }

    /// Waits for the previous frame, acquires the next surface image and
    /// opens a fresh command encoder.
    pub fn begin_frame(&mut self, gpu: &Gpu<'_>) -> Result<Frame, FrameError> {
        let index = self.lifecycle.begin()?;

        self.wait_in_flight(gpu.device())?;

        let (surface_texture, view) = gpu.acquire().map_err(FrameError::Acquire)?;

        let encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trivolve frame encoder"),
            });

        Ok(Frame {
            index,
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the frame's commands and presents its surface image.
    ///
    /// Does not wait for the GPU; the next [`Self::begin_frame`] does.
    pub fn end_frame(&mut self, gpu: &Gpu<'_>, frame: Frame) -> Result<(), FrameError> {
        self.lifecycle.submit()?;

        let Frame {
            surface_texture,
            view,
            encoder,
            ..
        } = frame;

        let submission = gpu.queue().submit(std::iter::once(encoder.finish()));
        self.in_flight = Some(submission);

        drop(view);
        surface_texture.present();
        Ok(())
    }

    /// Blocks until all outstanding GPU work has drained.
    pub fn finish(&mut self, gpu: &Gpu<'_>) -> Result<(), FrameError> {
        self.lifecycle.finish()?;
        gpu.device()
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(FrameError::Fence)?;
        self.in_flight = None;
        log::debug!(
            "frame controller drained after {} frames",
            self.lifecycle.frame_index()
        );
        Ok(())
    }

    /// Consumes the controller. Only legal after [`Self::finish`].
    pub fn destroy(mut self) -> Result<(), FrameError> {
        self.lifecycle.teardown()?;
        Ok(())
    }

    fn wait_in_flight(&mut self, device: &wgpu::Device) -> Result<(), FrameError> {
        if let Some(submission) = self.in_flight.take() {
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: Some(submission),
                    timeout: None,
                })
                .map_err(FrameError::Fence)?;
        }
        Ok(())
    }
}
