use std::fmt;

use super::LifecycleError;

/// Phase of the frame lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FramePhase {
    /// Nothing recorded yet.
    Start,
    /// A frame is being recorded.
    FrameStarted,
    /// The last frame was submitted; its fence may still be pending.
    FrameSubmitted,
    /// All GPU work drained. Only teardown is legal from here.
    Finished,
    Destroyed,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::FrameStarted => "frame-started",
            Self::FrameSubmitted => "frame-submitted",
            Self::Finished => "finished",
            Self::Destroyed => "destroyed",
        })
    }
}

/// Lifecycle operation, for error reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleOp {
    Begin,
    Submit,
    Finish,
    Teardown,
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Begin => "begin a frame",
            Self::Submit => "submit a frame",
            Self::Finish => "finish",
            Self::Teardown => "tear down",
        })
    }
}

/// Pure state machine behind [`super::FrameController`].
///
/// ```text
/// Start -> FrameStarted -> FrameSubmitted -> FrameStarted -> ... -> Finished -> Destroyed
/// ```
#[derive(Debug)]
pub struct FrameLifecycle {
    phase: FramePhase,
    frame_index: u64,
}

impl Default for FrameLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLifecycle {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Start,
            frame_index: 0,
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Index the next `begin` will return.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Enters `FrameStarted` and returns the index of the new frame.
    pub fn begin(&mut self) -> Result<u64, LifecycleError> {
        match self.phase {
            FramePhase::Start | FramePhase::FrameSubmitted => {
                let index = self.frame_index;
                self.frame_index += 1;
                self.phase = FramePhase::FrameStarted;
                Ok(index)
            }
            phase => Err(self.invalid(LifecycleOp::Begin, phase)),
        }
    }

    pub fn submit(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            FramePhase::FrameStarted => {
                self.phase = FramePhase::FrameSubmitted;
                Ok(())
            }
            phase => Err(self.invalid(LifecycleOp::Submit, phase)),
        }
    }

    /// Legal from any live phase. A frame that was begun but never submitted
    /// is abandoned.
    pub fn finish(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            FramePhase::Start | FramePhase::FrameStarted | FramePhase::FrameSubmitted => {
                self.phase = FramePhase::Finished;
                Ok(())
            }
            phase => Err(self.invalid(LifecycleOp::Finish, phase)),
        }
    }

    pub fn teardown(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            FramePhase::Finished => {
                self.phase = FramePhase::Destroyed;
                Ok(())
            }
            phase => Err(self.invalid(LifecycleOp::Teardown, phase)),
        }
    }

    fn invalid(&self, op: LifecycleOp, phase: FramePhase) -> LifecycleError {
        LifecycleError::InvalidTransition { op, phase }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── happy path ────────────────────────────────────────────────────────

    #[test]
    fn starts_at_index_zero() {
        let mut lc = FrameLifecycle::new();
        assert_eq!(lc.phase(), FramePhase::Start);
        assert_eq!(lc.begin(), Ok(0));
        assert_eq!(lc.phase(), FramePhase::FrameStarted);
    }

    #[test]
    fn index_increments_each_begin() {
        let mut lc = FrameLifecycle::new();
        for expected in 0..5 {
            assert_eq!(lc.begin(), Ok(expected));
            lc.submit().unwrap();
        }
        assert_eq!(lc.frame_index(), 5);
        assert_eq!(lc.phase(), FramePhase::FrameSubmitted);
    }

    #[test]
    fn finish_then_teardown() {
        let mut lc = FrameLifecycle::new();
        lc.begin().unwrap();
        lc.submit().unwrap();
        lc.finish().unwrap();
        assert_eq!(lc.phase(), FramePhase::Finished);
        lc.teardown().unwrap();
        assert_eq!(lc.phase(), FramePhase::Destroyed);
    }

    #[test]
    fn finish_without_any_frame() {
        let mut lc = FrameLifecycle::new();
        assert!(lc.finish().is_ok());
        assert!(lc.teardown().is_ok());
    }

    #[test]
    fn finish_abandons_an_open_frame() {
        let mut lc = FrameLifecycle::new();
        lc.begin().unwrap();
        assert!(lc.finish().is_ok());
    }

    // ── rejected orderings ────────────────────────────────────────────────

    #[test]
    fn submit_before_begin_is_rejected() {
        let mut lc = FrameLifecycle::new();
        assert_eq!(
            lc.submit(),
            Err(LifecycleError::InvalidTransition {
                op: LifecycleOp::Submit,
                phase: FramePhase::Start,
            })
        );
        assert_eq!(lc.phase(), FramePhase::Start);
    }

    #[test]
    fn double_begin_is_rejected() {
        let mut lc = FrameLifecycle::new();
        lc.begin().unwrap();
        assert!(lc.begin().is_err());
        // The failed call must not consume an index.
        lc.submit().unwrap();
        assert_eq!(lc.begin(), Ok(1));
    }

    #[test]
    fn double_submit_is_rejected() {
        let mut lc = FrameLifecycle::new();
        lc.begin().unwrap();
        lc.submit().unwrap();
        assert!(lc.submit().is_err());
    }

    #[test]
    fn teardown_before_finish_is_rejected() {
        let mut lc = FrameLifecycle::new();
        lc.begin().unwrap();
        lc.submit().unwrap();
        assert_eq!(
            lc.teardown(),
            Err(LifecycleError::InvalidTransition {
                op: LifecycleOp::Teardown,
                phase: FramePhase::FrameSubmitted,
            })
        );
    }

    #[test]
    fn nothing_but_teardown_after_finish() {
        let mut lc = FrameLifecycle::new();
        lc.finish().unwrap();
        assert!(lc.begin().is_err());
        assert!(lc.submit().is_err());
        assert!(lc.finish().is_err());
        lc.teardown().unwrap();
        assert!(lc.teardown().is_err());
    }

    #[test]
    fn error_message_names_op_and_phase() {
        let err = LifecycleError::InvalidTransition {
            op: LifecycleOp::Teardown,
            phase: FramePhase::Start,
        };
        assert_eq!(err.to_string(), "cannot tear down while the frame lifecycle is start");
    }
}
