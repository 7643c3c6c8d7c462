use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::{Context, Result};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::resources::allocate_buffer;

/// Fitness summary of one graded generation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitnessReport {
    pub frame: u64,
    pub best_index: u32,
    pub best: f32,
    pub mean: f32,
}

impl FitnessReport {
    /// Summarises a scores buffer: `instances` candidate slots followed by
    /// the aggregate slot.
    pub fn from_scores(frame: u64, scores: &[f32]) -> Option<Self> {
        let (aggregate, candidates) = scores.split_last()?;
        if candidates.is_empty() {
            return None;
        }
        let (best_index, best) = candidates
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, s)| if s > acc.1 { (i, s) } else { acc });
        Some(Self {
            frame,
            best_index: best_index as u32,
            best,
            mean: aggregate / candidates.len() as f32,
        })
    }
}

enum ReadbackPhase {
    Idle,
    Copied {
        frame: u64,
    },
    Mapping {
        frame: u64,
        rx: Receiver<Result<(), wgpu::BufferAsyncError>>,
    },
}

/// Copies the scores buffer into a mappable staging buffer without ever
/// blocking the frame loop.
///
/// Per report: [`Self::record_copy`] in the frame's encoder,
/// [`Self::request_map`] after submission, then [`Self::try_collect`] on
/// later frames until the map has completed.
pub struct ScoreReadback {
    staging: wgpu::Buffer,
    slots: usize,
    phase: ReadbackPhase,
}

impl ScoreReadback {
    pub fn new(ctx: DeviceCtx<'_>, score_slots: u32) -> Self {
        let staging = allocate_buffer(
            ctx,
            "trivolve score staging",
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            score_slots as u64 * 4,
        );
        Self {
            staging,
            slots: score_slots as usize,
            phase: ReadbackPhase::Idle,
        }
    }

    /// True when no report is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, ReadbackPhase::Idle)
    }

    /// Records the copy of `scores` for `frame`. Ignored while a previous
    /// report is still in progress.
    pub fn record_copy(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        scores: &wgpu::Buffer,
        frame: u64,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        encoder.copy_buffer_to_buffer(scores, 0, &self.staging, 0, self.staging.size());
        self.phase = ReadbackPhase::Copied { frame };
        true
    }

    /// Issues the map request for a copy that has been submitted.
    pub fn request_map(&mut self) {
        let ReadbackPhase::Copied { frame } = self.phase else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        self.staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = tx.send(result);
            });
        self.phase = ReadbackPhase::Mapping { frame, rx };
    }

    /// Returns the report once the map has completed, `None` before that.
    pub fn try_collect(&mut self, ctx: DeviceCtx<'_>) -> Result<Option<FitnessReport>> {
        let ReadbackPhase::Mapping { frame, rx } = &self.phase else {
            return Ok(None);
        };
        let frame = *frame;

        // Drives map callbacks without waiting.
        ctx.device
            .poll(wgpu::PollType::Poll)
            .context("failed to poll device")?;

        match rx.try_recv() {
            Ok(result) => result.context("failed to map score staging buffer")?,
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => {
                anyhow::bail!("score staging map callback dropped")
            }
        }

        let scores: Vec<f32> = {
            let view = self.staging.slice(..).get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&view)[..self.slots].to_vec()
        };
        self.staging.unmap();
        self.phase = ReadbackPhase::Idle;

        Ok(FitnessReport::from_scores(frame, &scores))
    }

    /// Drops a pending map before teardown.
    pub fn cancel(&mut self) {
        if matches!(self.phase, ReadbackPhase::Mapping { .. }) {
            self.staging.unmap();
        }
        self.phase = ReadbackPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_picks_best_and_mean() {
        let scores = [0.25, 0.75, 0.5, 1.5];
        let r = FitnessReport::from_scores(9, &scores).unwrap();
        assert_eq!(r.frame, 9);
        assert_eq!(r.best_index, 1);
        assert_eq!(r.best, 0.75);
        assert_eq!(r.mean, 0.5);
    }

    #[test]
    fn first_of_equal_bests_wins() {
        let r = FitnessReport::from_scores(0, &[0.5, 0.5, 1.0]).unwrap();
        assert_eq!(r.best_index, 0);
    }

    #[test]
    fn empty_scores_have_no_summary() {
        assert_eq!(FitnessReport::from_scores(0, &[]), None);
        assert_eq!(FitnessReport::from_scores(0, &[1.0]), None);
    }
}
