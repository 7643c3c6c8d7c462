//! Stage tests on a headless device. Skipped when no adapter is available.

use image::{Rgba, RgbaImage};
use wgpu::util::DeviceExt;

use trivolve_engine::compute::{
    BindingError, BoundResource, ComputeProgram, ComputeProgramDesc, ResourceKind,
};
use trivolve_engine::device::{DeviceCtx, GpuInit, HeadlessGpu};
use trivolve_engine::frame::GenerationRoles;
use trivolve_engine::resources::{read_buffer, upload_rgba, GpuImage};
use trivolve_evo::evolve::{evolve_generation, Evolve, Mutation};
use trivolve_evo::grader::{Grader, TileGrid};
use trivolve_evo::lottery::{is_clone, parent_index, roulette_parents, Lottery};
use trivolve_evo::population::{PopulationLayout, PopulationStore};
use trivolve_evo::vertex::{random_population, Vertex};
use trivolve_evo::{ConfigError, EvolutionConfig, EvolutionPipeline};

fn headless() -> Option<HeadlessGpu> {
    match HeadlessGpu::new_blocking(GpuInit::default()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

fn small_config() -> EvolutionConfig {
    EvolutionConfig {
        grid_width: 2,
        grid_height: 2,
        cell_width: 32,
        cell_height: 32,
        triangles_per_instance: 8,
        report_interval: 0,
        ..Default::default()
    }
}

fn solid_reference(ctx: DeviceCtx<'_>, config: &EvolutionConfig, rgba: [u8; 4]) -> GpuImage {
    let pixels = RgbaImage::from_pixel(config.cell_width, config.cell_height, Rgba(rgba));
    upload_rgba(ctx, "test reference", &pixels, wgpu::TextureUsages::TEXTURE_BINDING)
}

fn gradient_reference(ctx: DeviceCtx<'_>, config: &EvolutionConfig) -> GpuImage {
    let pixels = RgbaImage::from_fn(config.cell_width, config.cell_height, |x, y| {
        Rgba([(x * 8) as u8, (y * 8) as u8, 128, 255])
    });
    upload_rgba(ctx, "test reference", &pixels, wgpu::TextureUsages::TEXTURE_BINDING)
}

fn submit(ctx: DeviceCtx<'_>, record: impl FnOnce(&mut wgpu::CommandEncoder)) {
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    record(&mut encoder);
    ctx.queue.submit(std::iter::once(encoder.finish()));
}

// ── compute builder ───────────────────────────────────────────────────────

#[test]
fn buffer_bound_where_image_declared_is_rejected() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();

    let program = ComputeProgram::new(
        ctx,
        ComputeProgramDesc {
            label: "test image program",
            source: "@group(0) @binding(0) var img: texture_2d<f32>;\n\
                     @compute @workgroup_size(1) fn main() { _ = textureLoad(img, vec2<u32>(0u), 0); }",
            entry_point: "main",
            bindings: &[(0, ResourceKind::Image)],
            params_size: None,
        },
    )
    .unwrap();

    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: None,
        size: 16,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    });

    let err = program
        .bind_resources(ctx, &[(0, BoundResource::Buffer(&buffer))])
        .err();
    assert_eq!(
        err,
        Some(BindingError::KindMismatch {
            index: 0,
            declared: ResourceKind::Image,
            supplied: "buffer",
        })
    );

    let err = program
        .bind_resources(ctx, &[(3, BoundResource::Buffer(&buffer))])
        .err();
    assert_eq!(err, Some(BindingError::UndeclaredBinding { index: 3 }));

    assert!(matches!(
        program.write_params(ctx, &0u32),
        Err(BindingError::ParamsSizeMismatch { expected: None, .. })
    ));
}

#[test]
fn binding_the_same_resources_twice_gives_the_same_plan() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();

    let program = ComputeProgram::new(
        ctx,
        ComputeProgramDesc {
            label: "test copy program",
            source: "@group(0) @binding(0) var<storage, read_write> dst: array<u32>;\n\
                     @group(0) @binding(1) var<storage, read> src: array<u32>;\n\
                     @compute @workgroup_size(1) fn main() { dst[0] = src[0]; }",
            entry_point: "main",
            bindings: &[
                (1, ResourceKind::storage_read_only()),
                (0, ResourceKind::storage()),
            ],
            params_size: None,
        },
    )
    .unwrap();

    let storage = |label| {
        ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        })
    };
    let (dst, src) = (storage("dst"), storage("src"));

    let first = program
        .bind_resources(
            ctx,
            &[(0, BoundResource::Buffer(&dst)), (1, BoundResource::Buffer(&src))],
        )
        .unwrap();
    let second = program
        .bind_resources(
            ctx,
            &[(1, BoundResource::Buffer(&src)), (0, BoundResource::Buffer(&dst))],
        )
        .unwrap();

    assert_eq!(first.plan(), second.plan());
    assert_eq!(
        first.plan(),
        &[
            (0u32, ResourceKind::storage()),
            (1u32, ResourceKind::storage_read_only()),
        ]
    );
}

// ── grader ────────────────────────────────────────────────────────────────

#[test]
fn grader_clears_stale_scores_in_its_own_buffer() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();

    let black = |w, h| {
        let pixels = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
        upload_rgba(ctx, "black", &pixels, wgpu::TextureUsages::TEXTURE_BINDING)
    };
    let grid_image = black(64, 64);
    let reference = black(32, 32);

    let stale = [7.0f32; 5];
    let scores = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("stale scores"),
            contents: bytemuck::cast_slice(&stale),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

    let tiles = TileGrid::new(64, 64, 32, 32).unwrap();
    let grader = Grader::new(ctx, tiles, &grid_image, &reference, &scores).unwrap();
    for _ in 0..2 {
        submit(ctx, |encoder| grader.record(encoder));
        let graded: Vec<f32> = read_buffer(ctx, &scores, 5).unwrap();
        for s in &graded[..4] {
            assert!((s - 1.0).abs() < 1e-4, "{graded:?}");
        }
        assert!((graded[4] - 4.0).abs() < 1e-3, "{graded:?}");
    }
}

// ── lottery ───────────────────────────────────────────────────────────────

fn run_lottery(gpu: &HeadlessGpu, scores: &[f32], elitism: bool, seed: u32) -> Vec<u32> {
    let ctx = gpu.ctx();
    let layout = PopulationLayout {
        instances: scores.len() as u32 - 1,
        triangles_per_instance: 1,
    };
    let store = PopulationStore::new(ctx, layout, 1);
    ctx.queue
        .write_buffer(store.scores(), 0, bytemuck::cast_slice(scores));

    let lottery = Lottery::new(ctx, layout, store.scores(), store.parents(), 1.0, elitism).unwrap();
    submit(ctx, |encoder| lottery.record(ctx, encoder, seed).unwrap());

    read_buffer::<u32>(ctx, store.parents(), layout.parent_slots() as usize).unwrap()
}

#[test]
fn lottery_only_picks_the_fit_candidate() {
    let Some(gpu) = headless() else { return };
    for seed in [1, 2, 3, 99] {
        let parents = run_lottery(&gpu, &[10.0, 0.0, 0.0, 10.0], false, seed);
        assert_eq!(parents, vec![0; 6]);
    }
}

#[test]
fn lottery_with_zero_fitness_stays_in_range() {
    let Some(gpu) = headless() else { return };
    let scores = [0.0f32; 9];
    let parents = run_lottery(&gpu, &scores, false, 7);
    assert_eq!(parents.len(), 16);
    assert!(parents.iter().all(|&p| p < 8));
}

#[test]
fn lottery_clones_the_best_candidate() {
    let Some(gpu) = headless() else { return };
    let parents = run_lottery(&gpu, &[0.1, 0.8, 0.3, 1.2], true, 5);
    assert!(is_clone(parents[2]));
    assert_eq!(parent_index(parents[2]), 1);
    assert_eq!(parents[3], 1);
    assert!(!is_clone(parents[0]) && !is_clone(parents[4]));
}

fn with_aggregate(scores: &[f32]) -> Vec<f32> {
    let mut slots = scores.to_vec();
    slots.push(scores.iter().sum());
    slots
}

#[test]
fn lottery_agrees_with_host_roulette_on_mixed_scores() {
    let Some(gpu) = headless() else { return };
    for n in [3usize, 5, 37, 300, 1024] {
        let scores: Vec<f32> = (0..n)
            .map(|i| ((i * 37 + 11) % 97) as f32 / 97.0 + 0.01)
            .collect();
        for seed in [4, 2024] {
            let gpu_parents = run_lottery(&gpu, &with_aggregate(&scores), false, seed);
            let host_parents = roulette_parents(&scores, seed, 1.0, false);
            assert_eq!(gpu_parents.len(), host_parents.len());

            // The scan and the host loop sum in different orders; draws that
            // land on a boundary may round to the neighbour.
            let mismatches = gpu_parents
                .iter()
                .zip(&host_parents)
                .filter(|(g, h)| g != h)
                .count();
            assert!(
                mismatches <= 1 + gpu_parents.len() / 256,
                "n = {n}, seed = {seed}: {mismatches} of {} differ",
                gpu_parents.len()
            );
        }
    }
}

#[test]
fn lottery_splits_equal_scores_evenly() {
    let Some(gpu) = headless() else { return };
    let mut picks = [0u32; 2];
    for seed in 0..200 {
        for p in run_lottery(&gpu, &[1.0, 1.0, 2.0], false, seed) {
            picks[p as usize] += 1;
        }
    }
    let share = picks[0] as f32 / (picks[0] + picks[1]) as f32;
    assert!((0.4..=0.6).contains(&share), "{picks:?}");
}

// ── evolve ────────────────────────────────────────────────────────────────

#[test]
fn evolve_matches_host_version() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();

    let layout = PopulationLayout {
        instances: 4,
        triangles_per_instance: 16,
    };
    let initial = random_population(11, layout.instances, layout.triangles_per_instance);
    let store = PopulationStore::with_vertices(ctx, layout, &initial);

    let parents: [u32; 8] = [1, 2, 3 | 0x8000_0000, 3, 0, 0, 2, 1];
    ctx.queue
        .write_buffer(store.parents(), 0, bytemuck::cast_slice(&parents));

    let mutation = Mutation {
        rate: 0.3,
        position_step: 0.2,
        color_step: 0.2,
    };
    let evolve = Evolve::new(ctx, &store, mutation).unwrap();
    let seed = 1234;
    submit(ctx, |encoder| {
        evolve
            .record(ctx, encoder, GenerationRoles::for_frame(0), seed)
            .unwrap()
    });

    let gpu_next: Vec<Vertex> =
        read_buffer(ctx, store.generation_buffer(1), layout.vertex_count() as usize).unwrap();
    let host_next = evolve_generation(&initial, &parents, layout.triangles_per_instance, seed, mutation);

    for (i, (g, h)) in gpu_next.iter().zip(&host_next).enumerate() {
        for k in 0..4 {
            assert!((g.pos[k] - h.pos[k]).abs() < 1e-5, "vertex {i} pos {g:?} vs {h:?}");
            assert!((g.color[k] - h.color[k]).abs() < 1e-5, "vertex {i} color {g:?} vs {h:?}");
        }
    }
}

// ── full pipeline ─────────────────────────────────────────────────────────

#[test]
fn invisible_triangles_on_black_score_perfectly() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();
    let config = small_config();

    let layout = PopulationLayout::from_config(&config);
    let initial: Vec<Vertex> = random_population(3, layout.instances, layout.triangles_per_instance)
        .into_iter()
        .map(|mut v| {
            v.color[3] = 0.0;
            v
        })
        .collect();

    let reference = solid_reference(ctx, &config, [0, 0, 0, 255]);
    let mut pipeline =
        EvolutionPipeline::with_population(ctx, &config, reference, &initial).unwrap();
    pipeline.step_blocking(ctx, 0).unwrap();

    let scores: Vec<f32> =
        read_buffer(ctx, pipeline.store().scores(), layout.score_slots() as usize).unwrap();
    for s in &scores[..4] {
        assert!((s - 1.0).abs() < 1e-4, "{scores:?}");
    }
    assert!((scores[4] - 4.0).abs() < 1e-3, "{scores:?}");
}

#[test]
fn scores_are_reset_every_frame() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();
    let config = small_config();
    let reference = gradient_reference(ctx, &config);
    let mut pipeline = EvolutionPipeline::new(ctx, &config, reference).unwrap();

    for frame in 0..4 {
        pipeline.step_blocking(ctx, frame).unwrap();
        let scores: Vec<f32> = read_buffer(ctx, pipeline.store().scores(), 5).unwrap();
        assert!(scores[..4].iter().all(|s| (0.0..=1.0 + 1e-4).contains(s)), "{scores:?}");
        let sum: f32 = scores[..4].iter().sum();
        assert!((sum - scores[4]).abs() < 1e-3, "{scores:?}");
    }
}

#[test]
fn configs_beyond_device_limits_fail_cleanly() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();

    let wide = EvolutionConfig {
        grid_width: 1024,
        grid_height: 1,
        ..small_config()
    };
    let huge = EvolutionConfig {
        triangles_per_instance: 30_000_000,
        ..small_config()
    };
    for config in [wide, huge] {
        let reference = solid_reference(ctx, &config, [0, 0, 0, 255]);
        let Err(err) = EvolutionPipeline::new(ctx, &config, reference) else {
            panic!("{config:?} was accepted");
        };
        assert!(
            matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::ImageTooLarge { .. } | ConfigError::PopulationTooLarge { .. })
            ),
            "{err:#}"
        );
    }
}

#[test]
fn best_fitness_never_drops_with_elitism() {
    let Some(gpu) = headless() else { return };
    let ctx = gpu.ctx();
    let config = EvolutionConfig {
        elitism: true,
        mutation_rate: 0.2,
        ..small_config()
    };
    let reference = gradient_reference(ctx, &config);
    let mut pipeline = EvolutionPipeline::new(ctx, &config, reference).unwrap();

    let mut best = 0.0f32;
    for frame in 0..30 {
        pipeline.step_blocking(ctx, frame).unwrap();
        let scores: Vec<f32> = read_buffer(ctx, pipeline.store().scores(), 4).unwrap();
        let frame_best = scores.iter().copied().fold(0.0, f32::max);
        assert!(frame_best + 1e-4 >= best, "frame {frame}: {frame_best} < {best}");
        best = best.max(frame_best);
    }
}

fn mean_aggregate(gpu: &HeadlessGpu, elitism: bool, frames: u64) -> (f32, f32) {
    let ctx = gpu.ctx();
    let seeds = 1..=12u32;
    let (mut before, mut after) = (0.0f32, 0.0f32);
    for seed in seeds.clone() {
        let config = EvolutionConfig {
            seed,
            elitism,
            ..small_config()
        };
        let reference = gradient_reference(ctx, &config);
        let mut pipeline = EvolutionPipeline::new(ctx, &config, reference).unwrap();

        for frame in 0..=frames {
            pipeline.step_blocking(ctx, frame).unwrap();
            if frame == 0 || frame == frames {
                let scores: Vec<f32> = read_buffer(ctx, pipeline.store().scores(), 5).unwrap();
                if frame == 0 {
                    before += scores[4];
                } else {
                    after += scores[4];
                }
            }
        }
        pipeline.destroy();
    }
    let count = seeds.count() as f32;
    (before / count, after / count)
}

#[test]
fn aggregate_fitness_improves_on_average() {
    let Some(gpu) = headless() else { return };
    for elitism in [true, false] {
        let (before, after) = mean_aggregate(&gpu, elitism, 60);
        assert!(after > before, "elitism {elitism}: {before} -> {after}");
    }
}
