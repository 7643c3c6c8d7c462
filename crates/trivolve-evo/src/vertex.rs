use bytemuck::{Pod, Zeroable};
use trivolve_engine::rng::Xorshift32;

/// One triangle corner.
///
/// `pos.xy` is in cell-local NDC (`[-1, 1]`); `zw` is padding. `color` is
/// straight-alpha RGBA in `[0, 1]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 4],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4, // pos
        1 => Float32x4  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Alpha range of freshly generated triangles.
const INITIAL_ALPHA: (f32, f32) = (0.2, 0.6);

/// Random initial population of `instances * triangles_per_instance` triangles.
///
/// Each triangle's three corners share a color.
pub fn random_population(seed: u32, instances: u32, triangles_per_instance: u32) -> Vec<Vertex> {
    let mut rng = Xorshift32::new(seed);
    let triangles = instances as usize * triangles_per_instance as usize;
    let mut out = Vec::with_capacity(3 * triangles);

    for _ in 0..triangles {
        let color = [
            rng.next_f32(),
            rng.next_f32(),
            rng.next_f32(),
            rng.range(INITIAL_ALPHA.0, INITIAL_ALPHA.1),
        ];
        for _ in 0..3 {
            out.push(Vertex {
                pos: [rng.range(-1.0, 1.0), rng.range(-1.0, 1.0), 0.0, 1.0],
                color,
            });
        }
    }
    out
}
