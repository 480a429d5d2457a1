//! Shared machinery of the passes that render one cube face at a time.
//!
//! The shader draws a full-screen triangle and reconstructs, per fragment, the
//! direction through that texel of the selected face. The face index lives in a
//! small uniform buffer with one 256-byte slot per face, selected with a
//! dynamic offset.
//!
//! | Binding | Resource                                 |
//! |---------|------------------------------------------|
//! | 0       | Source texture (2D or cube)              |
//! | 1       | Filtering sampler                        |
//! | 2       | `u32` face index (dynamic offset)        |

use std::path::Path;

use super::FrameContext;
use crate::error::RenderError;
use crate::frame_data::UNIFORM_OFFSET_ALIGNMENT;
use crate::gpu::GpuContext;
use crate::resources::{self, CUBEMAP_FORMAT, CubeMap};

pub(crate) const FACE_COUNT: u32 = 6;

/// Pipeline, face uniforms and source binding of a face-projection pass.
pub(crate) struct FaceProjection {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    face_buffer: wgpu::Buffer,
    face_stride: u32,
    bind_group: Option<wgpu::BindGroup>,
    face: u32,
}

impl FaceProjection {
    pub(crate) fn new(
        gpu: &GpuContext,
        shader_path: &Path,
        source_dimension: wgpu::TextureViewDimension,
        label: &str,
    ) -> Result<Self, RenderError> {
        let device = &gpu.device;
        let shader = resources::create_shader(gpu, shader_path, label)?;

        let face_stride = gpu.uniform_alignment().max(UNIFORM_OFFSET_ALIGNMENT);
        let mut faces = vec![0u8; (FACE_COUNT * face_stride) as usize];
        for face in 0..FACE_COUNT {
            let offset = (face * face_stride) as usize;
            faces[offset..offset + 4].copy_from_slice(&face.to_ne_bytes());
        }
        let face_buffer = resources::create_buffer(
            gpu,
            Some(&faces),
            faces.len() as u64,
            wgpu::BufferUsages::UNIFORM,
            "Face Index Buffer",
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Face Projection Bind Group Layout"),
            entries: &[
                super::texture_entry(0, source_dimension),
                super::sampler_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(4),
                    },
                    count: None,
                },
            ],
        });
        let sampler = resources::create_sampler(gpu, wgpu::AddressMode::ClampToEdge, label);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: CUBEMAP_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            layout,
            sampler,
            face_buffer,
            face_stride,
            bind_group: None,
            face: 0,
        })
    }

    /// Bind the texture the faces are projected from.
    pub(crate) fn set_source(&mut self, gpu: &GpuContext, view: &wgpu::TextureView) {
        self.bind_group = Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Face Projection Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.face_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(4),
                    }),
                },
            ],
        }));
    }

    pub(crate) fn has_source(&self) -> bool {
        self.bind_group.is_some()
    }

    /// Select the face the next [`record`](Self::record) renders. Indices past
    /// the last face wrap.
    pub(crate) fn select_face(&mut self, face: u32) {
        self.face = face % FACE_COUNT;
    }

    pub(crate) fn face(&self) -> u32 {
        self.face
    }

    pub(crate) fn face_offset(&self) -> u32 {
        self.face * self.face_stride
    }

    /// Record the selected face into `target`.
    pub(crate) fn record(
        &self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        label: &'static str,
    ) {
        let Some(bind_group) = &self.bind_group else {
            log::warn!("{label}: no source texture bound, skipping face {}", self.face);
            return;
        };

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[self.face_offset()]);
        pass.draw(0..3, 0..1);
    }

    /// Render every face of `cube`, selecting each in turn.
    pub(crate) fn record_cube(&mut self, ctx: &mut FrameContext, cube: &CubeMap, label: &'static str) {
        for (face, view) in cube.face_views.iter().enumerate() {
            self.select_face(face as u32);
            self.record(ctx, view, label);
        }
    }
}
