//! Physically based mesh rendering.
//!
//! The pass drains the frame's draw queue, writes one [`InstanceData`] block
//! per draw into a dynamic-offset slot of a single uniform buffer, and records
//! one indexed draw per request into the multisampled HDR target, resolving
//! into the single-sample HDR texture.
//!
//! # Bind groups
//!
//! - **Group 0**: common frame uniforms
//! - **Group 1**: instance block (dynamic offset)
//! - **Group 2**: material ([`MaterialLayout`])
//! - **Group 3**: irradiance cubemap and its sampler

use std::path::Path;
use std::sync::Arc;

use super::{FrameContext, RenderPass, sampler_entry, texture_entry};
use crate::draw_queue::{DrawQueue, DrawRequest, slot_offset};
use crate::error::RenderError;
use crate::frame_data::{InstanceData, UNIFORM_OFFSET_ALIGNMENT, uniform_stride};
use crate::geometry::PbrVertex;
use crate::gpu::GpuContext;
use crate::mesh::{MaterialContract, MaterialLayout, Mesh};
use crate::render_targets::{DEPTH_FORMAT, HDR_FORMAT, MSAA_SAMPLES};
use crate::resources::{self, CubeMap};
use crate::transform::Transform;

/// Why a draw was refused at enqueue time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnqueueError {
    #[error("mesh material was built against another material layout")]
    ContractMismatch {
        expected: MaterialContract,
        found: MaterialContract,
    },
    #[error("transform has a zero scale axis ({0:?})")]
    DegenerateTransform(glam::Vec3),
    #[error("mesh has no indices to draw")]
    EmptyMesh,
}

/// Draws queued meshes with the PBR pipeline.
pub struct PbrPass {
    pipeline: wgpu::RenderPipeline,
    material_layout: MaterialLayout,
    instance_buffer: wgpu::Buffer,
    instance_bind_group: wgpu::BindGroup,
    instance_stride: u32,
    max_instances: u32,
    staging: Vec<u8>,
    environment_bind_group: wgpu::BindGroup,
    queue: DrawQueue<Mesh>,
    recorded_draws: usize,
    dropped_draws: usize,
}

impl PbrPass {
    /// Build the pipeline and the instance ring.
    ///
    /// # Arguments
    ///
    /// * `gpu` - The GPU context
    /// * `asset_root` - Directory containing `shaders/vertex.wgsl` and `shaders/frag.wgsl`
    /// * `common_layout` - Layout of the per-frame uniforms bound at group 0
    /// * `irradiance` - Diffuse environment sampled for ambient light
    /// * `max_instances` - Number of instance slots; draws past it are dropped
    pub fn new(
        gpu: &GpuContext,
        asset_root: &Path,
        common_layout: &wgpu::BindGroupLayout,
        irradiance: &CubeMap,
        max_instances: u32,
    ) -> Result<Self, RenderError> {
        let device = &gpu.device;
        let vertex_shader = resources::create_shader(
            gpu,
            &asset_root.join("shaders/vertex.wgsl"),
            "PBR Vertex Shader",
        )?;
        let fragment_shader = resources::create_shader(
            gpu,
            &asset_root.join("shaders/frag.wgsl"),
            "PBR Fragment Shader",
        )?;

        let max_instances = max_instances.max(1);
        let instance_stride = uniform_stride::<InstanceData>(
            gpu.uniform_alignment().max(UNIFORM_OFFSET_ALIGNMENT),
        );
        let instance_buffer = resources::create_buffer(
            gpu,
            None,
            max_instances as u64 * instance_stride as u64,
            wgpu::BufferUsages::UNIFORM,
            "Instance Buffer",
        );

        let instance_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Instance Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<InstanceData>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let instance_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Instance Bind Group"),
            layout: &instance_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &instance_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<InstanceData>() as u64),
                }),
            }],
        });

        let material_layout = MaterialLayout::new(device);

        let environment_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Environment Bind Group Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::Cube),
                sampler_entry(1),
            ],
        });
        let environment_sampler =
            resources::create_sampler(gpu, wgpu::AddressMode::ClampToEdge, "Irradiance Sampler");
        let environment_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Environment Bind Group"),
            layout: &environment_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&environment_sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            bind_group_layouts: &[
                common_layout,
                &instance_layout,
                &material_layout.layout,
                &environment_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("PBR Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_shader,
                entry_point: Some("main"),
                buffers: &[PbrVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_shader,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: MSAA_SAMPLES,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        });

        log::info!(
            "PBR pass ready ({max_instances} instance slots, {instance_stride} byte stride)"
        );

        Ok(Self {
            pipeline,
            material_layout,
            instance_buffer,
            instance_bind_group,
            instance_stride,
            max_instances,
            staging: vec![0; max_instances as usize * instance_stride as usize],
            environment_bind_group,
            queue: DrawQueue::new(),
            recorded_draws: 0,
            dropped_draws: 0,
        })
    }

    /// The material layout meshes must be built against to be drawn here.
    pub fn material_layout(&self) -> &MaterialLayout {
        &self.material_layout
    }

    /// Queue `mesh` for the next frame.
    ///
    /// Meshes built for another material layout, meshes without indices and
    /// transforms with a zero scale axis are refused.
    pub fn enqueue(&mut self, mesh: &Arc<Mesh>, transform: Transform) -> Result<(), EnqueueError> {
        let expected = self.material_layout.contract();
        if mesh.contract() != expected {
            return Err(EnqueueError::ContractMismatch {
                expected: expected.clone(),
                found: mesh.contract().clone(),
            });
        }
        if mesh.index_count == 0 || mesh.vertex_buffer.size() == 0 {
            return Err(EnqueueError::EmptyMesh);
        }
        if transform.is_degenerate() {
            return Err(EnqueueError::DegenerateTransform(transform.scale));
        }
        self.queue.push(Arc::clone(mesh), transform);
        Ok(())
    }

    /// Draws waiting for the next frame.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Forget queued draws without recording them.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn instance_stride(&self) -> u32 {
        self.instance_stride
    }

    pub fn max_instances(&self) -> u32 {
        self.max_instances
    }

    /// Indexed draws recorded by the last [`render`](RenderPass::render).
    pub fn recorded_draws(&self) -> usize {
        self.recorded_draws
    }

    /// Draws dropped by the last render because the instance buffer was full.
    pub fn dropped_draws(&self) -> usize {
        self.dropped_draws
    }

    /// Fill the staging copy of the instance buffer and return the bytes used.
    fn stage_instances(&mut self, draws: &[DrawRequest<Mesh>]) -> usize {
        let stride = self.instance_stride as usize;
        let size = std::mem::size_of::<InstanceData>();
        for (i, draw) in draws.iter().enumerate() {
            let offset = slot_offset(i, self.instance_stride) as usize;
            let instance = InstanceData::from_transform(&draw.transform);
            self.staging[offset..offset + size].copy_from_slice(bytemuck::bytes_of(&instance));
        }
        draws.len() * stride
    }
}

impl RenderPass for PbrPass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
    ) {
        let (drain, dropped) = self.queue.drain_clamped(self.max_instances as usize);
        let draws: Vec<DrawRequest<Mesh>> = drain.collect();
        self.dropped_draws = dropped;
        self.recorded_draws = 0;

        let used = self.stage_instances(&draws);
        if used > 0 {
            ctx.gpu
                .queue
                .write_buffer(&self.instance_buffer, 0, &self.staging[..used]);
        }

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    // Only the resolved image is read afterwards.
                    store: wgpu::StoreOp::Discard,
                },
            })],
            depth_stencil_attachment: ctx.depth.map(|depth| depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, ctx.common_bind_group, &[]);
        pass.set_bind_group(3, &self.environment_bind_group, &[]);

        for (i, draw) in draws.iter().enumerate() {
            let mesh = &draw.mesh;
            // Zero-sized buffers cannot be sliced.
            if mesh.index_count == 0 || mesh.vertex_buffer.size() == 0 {
                log::warn!("Skipping draw of an empty mesh");
                continue;
            }
            pass.set_bind_group(
                1,
                &self.instance_bind_group,
                &[slot_offset(i, self.instance_stride)],
            );
            pass.set_bind_group(2, &mesh.material.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), mesh.index_format);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            self.recorded_draws += 1;
        }
    }

    fn label(&self) -> &'static str {
        "PBR Pass"
    }
}
