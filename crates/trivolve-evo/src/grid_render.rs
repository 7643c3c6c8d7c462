use bytemuck::{Pod, Zeroable};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::resources::{allocate_buffer_init, allocate_image, GpuImage};

use crate::population::PopulationLayout;
use crate::vertex::Vertex;

/// Offscreen format of the grid image.
pub const GRID_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GridParams {
    triangles_per_instance: u32,
    grid_width: u32,
    grid_height: u32,
    _pad: u32,
}

/// Rasterises one generation into the offscreen grid image, one candidate
/// per cell.
pub struct GridRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    target: GpuImage,
    vertex_count: u32,
}

impl GridRenderer {
    pub fn new(
        ctx: DeviceCtx<'_>,
        layout: PopulationLayout,
        grid_width: u32,
        grid_height: u32,
        image_size: (u32, u32),
    ) -> Self {
        let target = allocate_image(
            ctx,
            "trivolve grid image",
            image_size.0,
            image_size.1,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            GRID_FORMAT,
        );

        let params = GridParams {
            triangles_per_instance: layout.triangles_per_instance,
            grid_width,
            grid_height,
            _pad: 0,
        };
        let params_ubo = allocate_buffer_init(
            ctx,
            "trivolve grid params ubo",
            wgpu::BufferUsages::UNIFORM,
            bytemuck::bytes_of(&params),
        );

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trivolve grid shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/grid.wgsl").into()),
        });

        let bind_group_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("trivolve grid bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<GridParams>() as u64,
                        ),
                    },
                    count: None,
                }],
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trivolve grid bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_ubo.as_entire_binding(),
            }],
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trivolve grid pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("trivolve grid pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: GRID_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        log::debug!(
            "grid renderer: {}x{} cells into {}x{} image",
            grid_width,
            grid_height,
            image_size.0,
            image_size.1
        );

        Self {
            pipeline,
            bind_group,
            target,
            vertex_count: layout.vertex_count(),
        }
    }

    /// The offscreen image written by [`Self::record`].
    pub fn target(&self) -> &GpuImage {
        &self.target
    }

    /// Clears the grid image to opaque black and draws `generation`.
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder, generation: &wgpu::Buffer) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("trivolve grid pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, generation.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}
