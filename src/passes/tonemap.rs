use std::path::Path;

use super::{FrameContext, RenderPass, sampler_entry, texture_entry};
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::resources;

/// Maps the resolved HDR image into the presentable format.
///
/// A full-screen triangle samples the HDR target. The shader receives:
/// - `hdr_texture` (group 0, binding 0): the resolved HDR image
/// - `hdr_sampler` (group 0, binding 1): a linear clamp sampler
///
/// The bind group references the HDR view directly, so it must be refreshed
/// with [`update_hdr_view`](Self::update_hdr_view) whenever the render targets
/// are rebuilt.
pub struct TonemapPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl TonemapPass {
    pub fn new(
        gpu: &GpuContext,
        asset_root: &Path,
        hdr_view: &wgpu::TextureView,
    ) -> Result<Self, RenderError> {
        let device = &gpu.device;
        let shader =
            resources::create_shader(gpu, &asset_root.join("shaders/hdr.wgsl"), "Tonemap Shader")?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tonemap Bind Group Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1),
            ],
        });
        let sampler =
            resources::create_sampler(gpu, wgpu::AddressMode::ClampToEdge, "Tonemap Sampler");
        let bind_group = Self::create_bind_group(gpu, &bind_group_layout, &sampler, hdr_view);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tonemap Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Tonemap Pipeline"),
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
                    format: gpu.surface_format(),
                    blend: Some(wgpu::BlendState::REPLACE),
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
            bind_group_layout,
            sampler,
            bind_group,
        })
    }

    fn create_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        hdr_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tonemap Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(hdr_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Point the pass at a rebuilt HDR target.
    pub fn update_hdr_view(&mut self, gpu: &GpuContext, hdr_view: &wgpu::TextureView) {
        self.bind_group =
            Self::create_bind_group(gpu, &self.bind_group_layout, &self.sampler, hdr_view);
    }
}

impl RenderPass for TonemapPass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
    ) {
        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target,
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
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn label(&self) -> &'static str {
        "Tonemap Pass"
    }
}
