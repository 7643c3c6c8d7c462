use std::fmt;

use super::{FramePhase, LifecycleOp};

/// An operation was called in a phase that does not allow it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    InvalidTransition { op: LifecycleOp, phase: FramePhase },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { op, phase } => {
                write!(f, "cannot {op} while the frame lifecycle is {phase}")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Errors from [`super::FrameController`]. All of them are fatal.
#[derive(Debug)]
pub enum FrameError {
    /// No presentable image could be acquired (surface lost, outdated, ...).
    Acquire(wgpu::SurfaceError),
    /// Waiting on the previous frame's submission failed.
    Fence(wgpu::PollError),
    Lifecycle(LifecycleError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "failed to acquire a presentable image: {e}"),
            Self::Fence(e) => write!(f, "failed to wait for the previous frame: {e}"),
            Self::Lifecycle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Acquire(e) => Some(e),
            Self::Fence(e) => Some(e),
            Self::Lifecycle(e) => Some(e),
        }
    }
}

impl From<LifecycleError> for FrameError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}
