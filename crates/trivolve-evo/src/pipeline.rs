use anyhow::{Context, Result};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::frame::{GenerationRoles, GenerationSlot};
use trivolve_engine::resources::{load_image_from_file, GpuImage};
use trivolve_engine::rng::{hash_u32, Xorshift32};

use crate::evolve::{Evolve, Mutation};
use crate::grader::{Grader, TileGrid};
use crate::grid_render::GridRenderer;
use crate::lottery::Lottery;
use crate::population::{PopulationLayout, PopulationStore};
use crate::present::Present;
use crate::report::{FitnessReport, ScoreReadback};
use crate::vertex::Vertex;
use crate::EvolutionConfig;

fn check_config(ctx: DeviceCtx<'_>, config: &EvolutionConfig) -> Result<()> {
    config
        .validate_for(&ctx.device.limits())
        .context("invalid evolution config")
}

/// All stages of one evolution run, recorded in a fixed order per frame:
///
/// grid render -> clear scores -> grade -> lottery -> evolve
/// -> (score copy) -> present
///
/// Each stage is its own pass; wgpu orders the passes and inserts the
/// barriers between them.
pub struct EvolutionPipeline {
    store: PopulationStore,
    // Kept alive for the grader's bind group.
    _reference: GpuImage,
    grid: GridRenderer,
    grader: Grader,
    lottery: Lottery,
    evolve: Evolve,
    present: Option<Present>,
    readback: Option<ScoreReadback>,
    report_interval: u32,
    seeds: Xorshift32,
}

impl EvolutionPipeline {
    /// Loads the reference image named by `config` and builds the pipeline.
    pub fn load(ctx: DeviceCtx<'_>, config: &EvolutionConfig) -> Result<Self> {
        check_config(ctx, config)?;
        let reference = load_image_from_file(
            ctx,
            &config.reference_path,
            Some((config.cell_width, config.cell_height)),
        )?;
        Self::new(ctx, config, reference)
    }

    /// Builds the pipeline around an already uploaded reference image of one
    /// cell in size.
    pub fn new(ctx: DeviceCtx<'_>, config: &EvolutionConfig, reference: GpuImage) -> Result<Self> {
        check_config(ctx, config)?;
        let layout = PopulationLayout::from_config(config);
        let store = PopulationStore::new(ctx, layout, config.seed);
        Self::with_store(ctx, config, reference, store)
    }

    /// Like [`Self::new`] with explicit initial vertices.
    pub fn with_population(
        ctx: DeviceCtx<'_>,
        config: &EvolutionConfig,
        reference: GpuImage,
        initial: &[Vertex],
    ) -> Result<Self> {
        check_config(ctx, config)?;
        let layout = PopulationLayout::from_config(config);
        anyhow::ensure!(
            initial.len() == layout.vertex_count() as usize,
            "initial population has {} vertices, expected {}",
            initial.len(),
            layout.vertex_count()
        );
        let store = PopulationStore::with_vertices(ctx, layout, initial);
        Self::with_store(ctx, config, reference, store)
    }

    fn with_store(
        ctx: DeviceCtx<'_>,
        config: &EvolutionConfig,
        reference: GpuImage,
        store: PopulationStore,
    ) -> Result<Self> {
        let (image_w, image_h) = config.image_size();
        let tiles = TileGrid::new(image_w, image_h, config.cell_width, config.cell_height)
            .context("grid image does not tile")?;
        let layout = store.layout();

        let grid = GridRenderer::new(
            ctx,
            layout,
            config.grid_width,
            config.grid_height,
            (image_w, image_h),
        );
        let grader = Grader::new(ctx, tiles, grid.target(), &reference, store.scores())
            .context("failed to build grader")?;
        let lottery = Lottery::new(
            ctx,
            layout,
            store.scores(),
            store.parents(),
            config.selection_pressure,
            config.elitism,
        )
        .context("failed to build lottery")?;
        let evolve = Evolve::new(
            ctx,
            &store,
            Mutation {
                rate: config.mutation_rate,
                position_step: config.position_step,
                color_step: config.color_step,
            },
        )
        .context("failed to build evolve stage")?;

        let readback = (config.report_interval > 0)
            .then(|| ScoreReadback::new(ctx, layout.score_slots()));

        log::info!(
            "evolution pipeline: {}x{} candidates, {} triangles each, {}x{} cells",
            config.grid_width,
            config.grid_height,
            config.triangles_per_instance,
            config.cell_width,
            config.cell_height
        );

        Ok(Self {
            store,
            _reference: reference,
            grid,
            grader,
            lottery,
            evolve,
            present: None,
            readback,
            report_interval: config.report_interval,
            seeds: Xorshift32::new(hash_u32(config.seed)),
        })
    }

    /// Adds the present stage for a surface of `format`.
    pub fn with_present(mut self, ctx: DeviceCtx<'_>, format: wgpu::TextureFormat) -> Self {
        self.present = Some(Present::new(ctx, self.grid.target(), format));
        self
    }

    pub fn store(&self) -> &PopulationStore {
        &self.store
    }

    /// Records one generation into `encoder`.
    ///
    /// `surface` receives the grid image when a present stage exists.
    pub fn record(
        &mut self,
        ctx: DeviceCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        frame_index: u64,
        surface: Option<&wgpu::TextureView>,
    ) -> Result<()> {
        let roles = GenerationRoles::for_frame(frame_index);
        let lottery_seed = self.seeds.next_u32();
        let evolve_seed = self.seeds.next_u32();

        self.grid
            .record(encoder, self.store.generation(roles, GenerationSlot::Current));
        self.grader.record(encoder);
        self.lottery.record(ctx, encoder, lottery_seed)?;
        self.evolve.record(ctx, encoder, roles, evolve_seed)?;

        if self.report_due(frame_index) {
            if let Some(readback) = self.readback.as_mut() {
                readback.record_copy(encoder, self.store.scores(), frame_index);
            }
        }

        if let (Some(present), Some(view)) = (self.present.as_ref(), surface) {
            present.record(encoder, view);
        }
        Ok(())
    }

    /// Call after the frame's commands were submitted.
    pub fn after_submit(&mut self) {
        if let Some(readback) = self.readback.as_mut() {
            readback.request_map();
        }
    }

    /// Returns a finished fitness report, if any. Never blocks.
    pub fn poll_report(&mut self, ctx: DeviceCtx<'_>) -> Result<Option<FitnessReport>> {
        match self.readback.as_mut() {
            Some(readback) => readback.try_collect(ctx),
            None => Ok(None),
        }
    }

    /// Records, submits and waits for one generation without a surface.
    pub fn step_blocking(&mut self, ctx: DeviceCtx<'_>, frame_index: u64) -> Result<()> {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trivolve step encoder"),
            });
        self.record(ctx, &mut encoder, frame_index, None)?;
        let submission = ctx.queue.submit(std::iter::once(encoder.finish()));
        ctx.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .context("failed to wait for generation")?;
        Ok(())
    }

    /// Releases GPU memory. The GPU must be idle.
    pub fn destroy(&mut self) {
        if let Some(readback) = self.readback.as_mut() {
            readback.cancel();
        }
        self.store.destroy();
    }

    fn report_due(&self, frame_index: u64) -> bool {
        self.report_interval > 0 && frame_index % self.report_interval as u64 == 0
    }
}
