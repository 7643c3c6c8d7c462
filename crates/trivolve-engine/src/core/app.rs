use anyhow::Result;
use winit::event::WindowEvent;

use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
///
/// Callbacks run on the event-loop thread. An error from any of them is
/// logged, ends the loop and is returned from [`crate::window::Runtime::run`].
pub trait App {
    /// Called once, right after the GPU is created and before the first frame.
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()>;

    /// Called for window events, before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;

    /// Called once before the window and GPU are dropped. Must leave the GPU idle.
    fn on_shutdown(&mut self, gpu: &Gpu<'_>) -> Result<()>;
}
