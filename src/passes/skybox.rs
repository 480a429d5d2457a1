//! Environment cube drawn behind the scene.

use std::path::Path;

use glam::{Mat4, Vec3};

use super::{FrameContext, RenderPass, sampler_entry, texture_entry};
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::render_targets::{DEPTH_FORMAT, HDR_FORMAT, MSAA_SAMPLES};
use crate::resources::{self, CubeMap};

/// Corner positions of the skybox cube, two triangles per face, wound
/// counter-clockwise when seen from inside.
pub const SKYBOX_VERTICES: [[f32; 3]; 36] = cube_positions();

const fn cube_positions() -> [[f32; 3]; 36] {
    const FACES: [[[f32; 3]; 4]; 6] = [
        // +X
        [[1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
        // -X
        [[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0]],
        // +Y
        [[-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
        // -Y
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0]],
        // +Z
        [[1.0, -1.0, 1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0]],
        // -Z
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]],
    ];
    const CORNERS: [usize; 6] = [0, 1, 2, 0, 2, 3];

    let mut out = [[0.0; 3]; 36];
    let mut face = 0;
    while face < 6 {
        let mut i = 0;
        while i < 6 {
            out[face * 6 + i] = FACES[face][CORNERS[i]];
            i += 1;
        }
        face += 1;
    }
    out
}

/// Per-frame skybox uniforms (group 1, binding 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyboxUniform {
    /// Translation to the camera position, so the cube never gets closer.
    pub model: [[f32; 4]; 4],
    pub exposure: f32,
    pub _padding: [f32; 3],
}

impl SkyboxUniform {
    pub fn new(camera_position: Vec3, exposure: f32) -> Self {
        Self {
            model: Mat4::from_translation(camera_position).to_cols_array_2d(),
            exposure,
            _padding: [0.0; 3],
        }
    }
}

/// Draws the environment cubemap at the far plane and clears the frame.
///
/// The pass owns the environment cubemap. [`HdriConversionPass`](super::HdriConversionPass)
/// renders into its [`face views`](CubeMap::face_view) while baking and
/// [`IrradiancePass`](super::IrradiancePass) samples its cube view.
pub struct SkyboxPass {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    cubemap: CubeMap,
    exposure: f32,
    clear_color: wgpu::Color,
}

impl SkyboxPass {
    pub fn new(
        gpu: &GpuContext,
        asset_root: &Path,
        common_layout: &wgpu::BindGroupLayout,
        face_size: u32,
        exposure: f32,
        clear_color: wgpu::Color,
    ) -> Result<Self, RenderError> {
        let device = &gpu.device;
        let shader = resources::create_shader(
            gpu,
            &asset_root.join("shaders/skybox.wgsl"),
            "Skybox Shader",
        )?;

        let cubemap = CubeMap::new(gpu, face_size, "Skybox Cubemap");

        let vertex_buffer = resources::create_buffer(
            gpu,
            Some(bytemuck::cast_slice(&SKYBOX_VERTICES)),
            std::mem::size_of_val(&SKYBOX_VERTICES) as u64,
            wgpu::BufferUsages::VERTEX,
            "Skybox Vertex Buffer",
        );
        let uniform = SkyboxUniform::new(Vec3::ZERO, exposure);
        let uniform_buffer = resources::create_buffer(
            gpu,
            Some(bytemuck::bytes_of(&uniform)),
            std::mem::size_of::<SkyboxUniform>() as u64,
            wgpu::BufferUsages::UNIFORM,
            "Skybox Uniforms",
        );
        let sampler =
            resources::create_sampler(gpu, wgpu::AddressMode::ClampToEdge, "Skybox Sampler");

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<SkyboxUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                sampler_entry(1),
                texture_entry(2, wgpu::TextureViewDimension::Cube),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&cubemap.view),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[common_layout, &layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Skybox Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Drawn at depth 1.0 (xyww), so it needs LessEqual against the cleared buffer.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
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

        log::info!("Skybox pass ready ({face_size}px faces)");

        Ok(Self {
            pipeline,
            vertex_buffer,
            uniform_buffer,
            bind_group,
            cubemap,
            exposure,
            clear_color,
        })
    }

    /// The environment cubemap this pass samples.
    pub fn cubemap(&self) -> &CubeMap {
        &self.cubemap
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }
}

impl RenderPass for SkyboxPass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
    ) {
        let uniform = SkyboxUniform::new(ctx.camera_position, self.exposure);
        ctx.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: ctx.depth.map(|depth| depth.attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, ctx.common_bind_group, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..SKYBOX_VERTICES.len() as u32, 0..1);
    }

    fn label(&self) -> &'static str {
        "Skybox Pass"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_36_unit_corners() {
        assert_eq!(SKYBOX_VERTICES.len(), 36);
        for vertex in SKYBOX_VERTICES {
            assert!(vertex.iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn every_face_is_two_triangles_on_one_plane() {
        for face in SKYBOX_VERTICES.chunks_exact(6) {
            let shared_axes = (0..3)
                .filter(|&axis| face.iter().all(|v| v[axis] == face[0][axis]))
                .count();
            assert_eq!(shared_axes, 1);
        }
    }

    #[test]
    fn uniform_follows_camera() {
        let uniform = SkyboxUniform::new(Vec3::new(0.0, 2.0, 3.0), 3.0);

        assert_eq!(std::mem::size_of::<SkyboxUniform>(), 80);
        assert_eq!(uniform.model[3], [0.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.exposure, 3.0);
    }
}
