use trivolve_engine::device::DeviceCtx;
use trivolve_engine::frame::{GenerationRoles, GenerationSlot, PingPong};
use trivolve_engine::resources::{allocate_buffer, allocate_buffer_init};

use crate::vertex::{random_population, Vertex};
use crate::EvolutionConfig;

/// Population geometry shared by every stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PopulationLayout {
    pub instances: u32,
    pub triangles_per_instance: u32,
}

impl PopulationLayout {
    pub fn from_config(config: &EvolutionConfig) -> Self {
        Self {
            instances: config.instance_count(),
            triangles_per_instance: config.triangles_per_instance,
        }
    }

    pub fn vertices_per_instance(&self) -> u32 {
        3 * self.triangles_per_instance
    }

    pub fn vertex_count(&self) -> u32 {
        self.instances * self.vertices_per_instance()
    }

    /// Score slots: one per candidate plus the trailing aggregate.
    pub fn score_slots(&self) -> u32 {
        self.instances + 1
    }

    /// Parent slots: two per candidate.
    pub fn parent_slots(&self) -> u32 {
        2 * self.instances
    }
}

/// GPU buffers of the evolving population.
///
/// Two generation buffers alternate roles every frame; `scores` and
/// `parents` are rewritten each frame. Everything is allocated once.
pub struct PopulationStore {
    layout: PopulationLayout,
    generations: PingPong<wgpu::Buffer>,
    scores: wgpu::Buffer,
    parents: wgpu::Buffer,
}

impl PopulationStore {
    /// Allocates the store and seeds both generations with the same random
    /// population.
    pub fn new(ctx: DeviceCtx<'_>, layout: PopulationLayout, seed: u32) -> Self {
        let initial = random_population(seed, layout.instances, layout.triangles_per_instance);
        Self::with_vertices(ctx, layout, &initial)
    }

    /// Allocates the store with explicit initial vertices.
    pub fn with_vertices(ctx: DeviceCtx<'_>, layout: PopulationLayout, initial: &[Vertex]) -> Self {
        debug_assert_eq!(initial.len(), layout.vertex_count() as usize);

        let generation_usage = wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;
        let bytes: &[u8] = bytemuck::cast_slice(initial);

        let generations = PingPong::new(
            allocate_buffer_init(ctx, "trivolve generation 0", generation_usage, bytes),
            allocate_buffer_init(ctx, "trivolve generation 1", generation_usage, bytes),
        );

        let scores = allocate_buffer(
            ctx,
            "trivolve scores",
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            layout.score_slots() as u64 * 4,
        );

        let parents = allocate_buffer(
            ctx,
            "trivolve parents",
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
            layout.parent_slots() as u64 * 4,
        );

        log::debug!(
            "population store: {} candidates, {} vertices per generation",
            layout.instances,
            layout.vertex_count()
        );

        Self {
            layout,
            generations,
            scores,
            parents,
        }
    }

    pub fn layout(&self) -> PopulationLayout {
        self.layout
    }

    pub fn generation(&self, roles: GenerationRoles, slot: GenerationSlot) -> &wgpu::Buffer {
        self.generations.get(roles, slot)
    }

    /// Physical generation buffer `0` or `1`.
    pub fn generation_buffer(&self, index: usize) -> &wgpu::Buffer {
        &self.generations[index]
    }

    pub fn scores(&self) -> &wgpu::Buffer {
        &self.scores
    }

    pub fn parents(&self) -> &wgpu::Buffer {
        &self.parents
    }

    /// Releases GPU memory now instead of on drop. The GPU must be idle.
    pub fn destroy(&self) {
        for buffer in self.generations.iter() {
            buffer.destroy();
        }
        self.scores.destroy();
        self.parents.destroy();
    }
}
