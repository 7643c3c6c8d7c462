use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use trivolve_engine::compute::{
    BoundResource, ComputeProgram, ComputeProgramDesc, ResourceBinding, ResourceKind,
};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::rng::stream;

use crate::population::PopulationLayout;

/// Candidates one selection workgroup can see.
pub const MAX_CANDIDATES: u32 = 1024;

/// Set on the first parent of a candidate that is copied unmutated.
pub const CLONE_BIT: u32 = 0x8000_0000;

/// Parent index with the clone flag removed.
#[inline]
pub fn parent_index(entry: u32) -> u32 {
    entry & !CLONE_BIT
}

#[inline]
pub fn is_clone(entry: u32) -> bool {
    entry & CLONE_BIT != 0
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LotteryParams {
    instance_count: u32,
    seed: u32,
    pressure: f32,
    elitism: u32,
}

/// Fitness-proportionate ("roulette wheel") parent selection.
///
/// Writes two parent indices per candidate into the parents buffer.
pub struct Lottery {
    program: ComputeProgram,
    binding: ResourceBinding,
    instances: u32,
    pressure: f32,
    elitism: bool,
}

impl Lottery {
    pub fn new(
        ctx: DeviceCtx<'_>,
        layout: PopulationLayout,
        scores: &wgpu::Buffer,
        parents: &wgpu::Buffer,
        pressure: f32,
        elitism: bool,
    ) -> Result<Self> {
        anyhow::ensure!(
            (1..=MAX_CANDIDATES).contains(&layout.instances),
            "selection needs 1..={MAX_CANDIDATES} candidates, got {}",
            layout.instances
        );

        let source = [crate::RNG_WGSL, include_str!("shaders/lottery.wgsl")].concat();
        let program = ComputeProgram::new(
            ctx,
            ComputeProgramDesc {
                label: "trivolve lottery",
                source: &source,
                entry_point: "main",
                bindings: &[
                    (0, ResourceKind::storage_read_only()),
                    (1, ResourceKind::storage()),
                ],
                params_size: Some(std::mem::size_of::<LotteryParams>() as u64),
            },
        )?;

        let binding = program.bind_resources(
            ctx,
            &[
                (0, BoundResource::Buffer(scores)),
                (1, BoundResource::Buffer(parents)),
            ],
        )?;

        Ok(Self {
            program,
            binding,
            instances: layout.instances,
            pressure,
            elitism,
        })
    }

    /// Uploads this frame's seed and records the selection dispatch.
    pub fn record(
        &self,
        ctx: DeviceCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        seed: u32,
    ) -> Result<()> {
        self.program.write_params(
            ctx,
            &LotteryParams {
                instance_count: self.instances,
                seed,
                pressure: self.pressure,
                elitism: self.elitism as u32,
            },
        )?;
        self.program.dispatch(encoder, &self.binding, [1, 1, 1]);
        Ok(())
    }
}

/// Host version of the selection dispatch, drawing from the same streams.
///
/// `scores` holds one entry per candidate (no aggregate slot). Returns two
/// entries per candidate.
pub fn roulette_parents(scores: &[f32], seed: u32, pressure: f32, elitism: bool) -> Vec<u32> {
    let n = scores.len();
    if n == 0 {
        return Vec::new();
    }

    let (best, max_score) = scores
        .iter()
        .enumerate()
        .fold((0usize, 0.0f32), |(b, m), (i, &s)| if s > m { (i, s) } else { (b, m) });

    let mut cumulative = Vec::with_capacity(n);
    let mut run = 0.0f32;
    for &s in scores {
        run += selection_weight(s, max_score, pressure);
        cumulative.push(run);
    }
    let total = run;

    let draw = |u: f32| -> u32 {
        if total <= 0.0 {
            return ((u * n as f32) as usize).min(n - 1) as u32;
        }
        let r = u * total;
        cumulative.partition_point(|&c| c <= r).min(n - 1) as u32
    };

    let mut parents = Vec::with_capacity(2 * n);
    for i in 0..n {
        if elitism && i == best {
            parents.push(best as u32 | CLONE_BIT);
            parents.push(best as u32);
            continue;
        }
        let mut rng = stream(seed, i as u32);
        parents.push(draw(rng.next_f32()));
        parents.push(draw(rng.next_f32()));
    }
    parents
}

/// `(score / max_score) ^ pressure`, or 0 when nothing scored.
pub fn selection_weight(score: f32, max_score: f32, pressure: f32) -> f32 {
    if max_score <= 0.0 {
        return 0.0;
    }
    let x = score.max(0.0) / max_score;
    if x <= 0.0 { 0.0 } else { x.powf(pressure) }
}
