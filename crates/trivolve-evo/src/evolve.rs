use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use trivolve_engine::compute::{
    BoundResource, ComputeProgram, ComputeProgramDesc, ResourceBinding, ResourceKind,
};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::frame::{GenerationRoles, PingPong};
use trivolve_engine::rng::stream;

use crate::lottery::{is_clone, parent_index};
use crate::population::{PopulationLayout, PopulationStore};
use crate::vertex::Vertex;

/// Invocations per evolve workgroup.
pub const WORKGROUP_SIZE: u32 = 256;

/// Mixed into the seed of the per-vertex mutation streams so they differ
/// from the crossover streams.
const MUTATION_SALT: u32 = 0x5BD1_E995;

/// Mutation tunables.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mutation {
    pub rate: f32,
    pub position_step: f32,
    pub color_step: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct EvolveParams {
    vertex_count: u32,
    triangles_per_instance: u32,
    seed: u32,
    mutation_rate: f32,
    position_step: f32,
    color_step: f32,
    _pad: [u32; 2],
}

/// Crossover + mutation from the current generation into the next one.
pub struct Evolve {
    program: ComputeProgram,
    /// Indexed by the physical index of the current generation.
    bindings: PingPong<ResourceBinding>,
    layout: PopulationLayout,
    mutation: Mutation,
}

impl Evolve {
    pub fn new(ctx: DeviceCtx<'_>, store: &PopulationStore, mutation: Mutation) -> Result<Self> {
        let source = [crate::RNG_WGSL, include_str!("shaders/evolve.wgsl")].concat();
        let program = ComputeProgram::new(
            ctx,
            ComputeProgramDesc {
                label: "trivolve evolve",
                source: &source,
                entry_point: "main",
                bindings: &[
                    (0, ResourceKind::storage_read_only()),
                    (1, ResourceKind::storage()),
                    (2, ResourceKind::storage_read_only()),
                ],
                params_size: Some(std::mem::size_of::<EvolveParams>() as u64),
            },
        )?;

        let bind = |current: usize| {
            program.bind_resources(
                ctx,
                &[
                    (0, BoundResource::Buffer(store.generation_buffer(current))),
                    (1, BoundResource::Buffer(store.generation_buffer(1 - current))),
                    (2, BoundResource::Buffer(store.parents())),
                ],
            )
        };
        let bindings = PingPong::new(bind(0)?, bind(1)?);

        Ok(Self {
            program,
            bindings,
            layout: store.layout(),
            mutation,
        })
    }

    pub fn workgroups(&self) -> u32 {
        self.layout.vertex_count().div_ceil(WORKGROUP_SIZE)
    }

    /// Uploads this frame's seed and records the evolve dispatch.
    pub fn record(
        &self,
        ctx: DeviceCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        roles: GenerationRoles,
        seed: u32,
    ) -> Result<()> {
        self.program.write_params(
            ctx,
            &EvolveParams {
                vertex_count: self.layout.vertex_count(),
                triangles_per_instance: self.layout.triangles_per_instance,
                seed,
                mutation_rate: self.mutation.rate,
                position_step: self.mutation.position_step,
                color_step: self.mutation.color_step,
                _pad: [0; 2],
            },
        )?;
        self.program.dispatch(
            encoder,
            &self.bindings[roles.current],
            [self.workgroups(), 1, 1],
        );
        Ok(())
    }
}

/// Host version of one evolve invocation: the next value of vertex `v`.
pub fn evolve_vertex(
    current: &[Vertex],
    parents: &[u32],
    v: u32,
    triangles_per_instance: u32,
    seed: u32,
    mutation: Mutation,
) -> Vertex {
    let per_instance = 3 * triangles_per_instance;
    let instance = v / per_instance;
    let local = v % per_instance;

    let first = parents[2 * instance as usize];
    if is_clone(first) {
        return current[v as usize];
    }

    let mut tri_rng = stream(seed, v / 3);
    let parent = if tri_rng.next_f32() < 0.5 {
        parent_index(first)
    } else {
        parents[2 * instance as usize + 1]
    };
    let mut vert = current[(parent * per_instance + local) as usize];

    let mut rng = stream(seed ^ MUTATION_SALT, v);
    if rng.next_f32() < mutation.rate {
        let ps = mutation.position_step;
        let cs = mutation.color_step;
        for p in &mut vert.pos[..2] {
            *p = (*p + rng.range(-ps, ps)).clamp(-1.0, 1.0);
        }
        for c in &mut vert.color {
            *c = (*c + rng.range(-cs, cs)).clamp(0.0, 1.0);
        }
    }
    vert
}

/// Host version of a whole evolve dispatch.
pub fn evolve_generation(
    current: &[Vertex],
    parents: &[u32],
    triangles_per_instance: u32,
    seed: u32,
    mutation: Mutation,
) -> Vec<Vertex> {
    (0..current.len() as u32)
        .map(|v| evolve_vertex(current, parents, v, triangles_per_instance, seed, mutation))
        .collect()
}
