use std::time::Instant;

use anyhow::{Context, Result};
use trivolve_engine::core::{App, AppControl, FrameCtx};
use trivolve_engine::device::Gpu;
use trivolve_engine::frame::FrameController;

use crate::pipeline::EvolutionPipeline;
use crate::report::FitnessReport;
use crate::EvolutionConfig;

/// Runs one generation per displayed frame.
pub struct EvolutionApp {
    config: EvolutionConfig,
    controller: Option<FrameController>,
    pipeline: Option<EvolutionPipeline>,
    /// Frame index and time of the previous report.
    last_report: Option<(u64, Instant)>,
}

impl EvolutionApp {
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            controller: None,
            pipeline: None,
            last_report: None,
        }
    }

    fn log_report(&mut self, report: FitnessReport, frame_index: u64, now: Instant) {
        let rate = match self.last_report {
            Some((last_frame, last_time)) => {
                let secs = now.saturating_duration_since(last_time).as_secs_f64();
                if secs > 0.0 {
                    (frame_index - last_frame) as f64 / secs
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last_report = Some((frame_index, now));

        log::info!(
            "generation {}: best #{} {:.4}, mean {:.4}, {:.1} gen/s",
            report.frame,
            report.best_index,
            report.best,
            report.mean,
            rate
        );
    }
}

impl App for EvolutionApp {
    fn on_init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let pipeline = EvolutionPipeline::load(gpu.ctx(), &self.config)?
            .with_present(gpu.ctx(), gpu.surface_format());

        self.pipeline = Some(pipeline);
        self.controller = Some(FrameController::new());
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        let (Some(controller), Some(pipeline)) = (self.controller.as_mut(), self.pipeline.as_mut())
        else {
            return Ok(AppControl::Exit);
        };
        let gpu = ctx.gpu;

        let mut frame = controller.begin_frame(gpu)?;
        let report = pipeline.poll_report(gpu.ctx())?;

        pipeline
            .record(gpu.ctx(), &mut frame.encoder, frame.index, Some(&frame.view))
            .context("failed to record generation")?;

        let index = frame.index;
        ctx.window.pre_present_notify();
        controller.end_frame(gpu, frame)?;
        pipeline.after_submit();

        if let Some(report) = report {
            self.log_report(report, index, ctx.time.now);
        }
        Ok(AppControl::Continue)
    }

    fn on_shutdown(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let Some(mut controller) = self.controller.take() else {
            return Ok(());
        };
        controller.finish(gpu)?;

        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.destroy();
        }
        controller.destroy()?;
        log::debug!("evolution shut down");
        Ok(())
    }
}
