//! Single-frame-in-flight lifecycle.
//!
//! [`FrameLifecycle`] is the pure state machine; [`FrameController`] drives
//! it against a [`crate::device::Gpu`] (fence wait, acquire, submit, present).
//! [`GenerationRoles`] maps the frame index onto ping-pong slots.

mod controller;
mod error;
mod lifecycle;
mod parity;

pub use controller::{Frame, FrameController};
pub use error::{FrameError, LifecycleError};
pub use lifecycle::{FrameLifecycle, FramePhase, LifecycleOp};
pub use parity::{GenerationRoles, GenerationSlot, PingPong};
