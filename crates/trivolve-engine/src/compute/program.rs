use anyhow::Result;
use bytemuck::Pod;

use crate::device::DeviceCtx;

use super::{resolve_bindings, BindingError, BoundResource, ResourceKind};

/// Handle types accepted by [`ComputeProgram::bind_resources`].
pub type GpuResource<'a> = BoundResource<&'a wgpu::Buffer, &'a wgpu::TextureView>;

/// Everything needed to build a [`ComputeProgram`].
#[derive(Debug, Clone, Copy)]
pub struct ComputeProgramDesc<'a> {
    pub label: &'a str,
    /// WGSL source.
    pub source: &'a str,
    pub entry_point: &'a str,
    /// `(binding index, kind)` for every resource in `@group(0)`.
    pub bindings: &'a [(u32, ResourceKind)],
    /// Size in bytes of the inline parameter block at `@group(1) @binding(0)`.
    pub params_size: Option<u64>,
}

/// A compute pipeline plus its declared resource layout.
pub struct ComputeProgram {
    label: String,
    pipeline: wgpu::ComputePipeline,
    resource_layout: wgpu::BindGroupLayout,
    declared: Vec<(u32, ResourceKind)>,
    params: Option<ParamsBlock>,
}

struct ParamsBlock {
    size: u64,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A bind group validated against one program's declaration.
pub struct ResourceBinding {
    bind_group: wgpu::BindGroup,
    plan: Vec<(u32, ResourceKind)>,
}

impl ResourceBinding {
    /// Resolved `(index, kind)` pairs, sorted by index.
    pub fn plan(&self) -> &[(u32, ResourceKind)] {
        &self.plan
    }
}

impl ComputeProgram {
    pub fn new(ctx: DeviceCtx<'_>, desc: ComputeProgramDesc<'_>) -> Result<Self> {
        for (n, (index, _)) in desc.bindings.iter().enumerate() {
            anyhow::ensure!(
                !desc.bindings[..n].iter().any(|(i, _)| i == index),
                "{}: binding {index} declared twice",
                desc.label
            );
        }
        if let Some(size) = desc.params_size {
            anyhow::ensure!(size > 0, "{}: empty inline parameter block", desc.label);
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .bindings
            .iter()
            .map(|&(binding, kind)| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: kind.layout_type(),
                count: None,
            })
            .collect();

        let resource_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} resources bgl", desc.label)),
                entries: &entries,
            });

        let params = desc
            .params_size
            .map(|size| ParamsBlock::new(ctx, desc.label, size));

        let mut layouts = vec![&resource_layout];
        if let Some(p) = params.as_ref() {
            layouts.push(&p.layout);
        }

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} pipeline layout", desc.label)),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(desc.entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        log::debug!(
            "compute program '{}' built ({} bindings, params {:?})",
            desc.label,
            desc.bindings.len(),
            desc.params_size
        );

        Ok(Self {
            label: desc.label.to_owned(),
            pipeline,
            resource_layout,
            declared: desc.bindings.to_vec(),
            params: params.map(|p| p.block),
        })
    }

    /// Builds a bind group for `resources` after checking it against the
    /// declared layout.
    pub fn bind_resources(
        &self,
        ctx: DeviceCtx<'_>,
        resources: &[(u32, GpuResource<'_>)],
    ) -> Result<ResourceBinding, BindingError> {
        let resolved = resolve_bindings(&self.declared, resources)?;

        let entries: Vec<wgpu::BindGroupEntry> = resolved
            .iter()
            .map(|&(binding, resource)| wgpu::BindGroupEntry {
                binding,
                resource: match resource {
                    BoundResource::Buffer(buffer) => buffer.as_entire_binding(),
                    BoundResource::Image(view) => wgpu::BindingResource::TextureView(view),
                },
            })
            .collect();

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} resources", self.label)),
            layout: &self.resource_layout,
            entries: &entries,
        });

        let plan = resolved
            .iter()
            .filter_map(|&(index, _)| self.declared.iter().find(|(i, _)| *i == index).copied())
            .collect();

        Ok(ResourceBinding { bind_group, plan })
    }

    /// Uploads the inline parameter block; takes effect for the next submission.
    pub fn write_params<T: Pod>(&self, ctx: DeviceCtx<'_>, params: &T) -> Result<(), BindingError> {
        let bytes = bytemuck::bytes_of(params);
        let supplied = bytes.len() as u64;
        match self.params.as_ref() {
            Some(block) if block.size == supplied => {
                ctx.queue.write_buffer(&block.buffer, 0, bytes);
                Ok(())
            }
            Some(block) => Err(BindingError::ParamsSizeMismatch {
                expected: Some(block.size),
                supplied,
            }),
            None => Err(BindingError::ParamsSizeMismatch {
                expected: None,
                supplied,
            }),
        }
    }

    /// Records one compute pass dispatching `groups` workgroups.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        binding: &ResourceBinding,
        groups: [u32; 3],
    ) {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&self.label),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &binding.bind_group, &[]);
        if let Some(block) = self.params.as_ref() {
            cpass.set_bind_group(1, &block.bind_group, &[]);
        }
        cpass.dispatch_workgroups(groups[0], groups[1], groups[2]);
    }
}

struct ParamsLayout {
    layout: wgpu::BindGroupLayout,
    block: ParamsBlock,
}

impl ParamsBlock {
    fn new(ctx: DeviceCtx<'_>, label: &str, size: u64) -> ParamsLayout {
        // Uniform blocks are allocated in 16-byte units.
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} params ubo")),
            size: size.next_multiple_of(16),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} params bgl")),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} params")),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        ParamsLayout {
            layout,
            block: ParamsBlock {
                size,
                buffer,
                bind_group,
            },
        }
    }
}
