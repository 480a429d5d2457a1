//! GPU-resident meshes and their PBR materials.
//!
//! A [`Mesh`] owns its vertex and index buffers plus a material bind group built
//! against the PBR pass's material layout. The layout a mesh was built for is
//! recorded in its [`MaterialContract`] so the renderer can refuse meshes that
//! belong to a different pipeline.
//!
//! # Material bind group
//!
//! | Binding | Resource                         |
//! |---------|----------------------------------|
//! | 0       | [`MaterialUniform`]              |
//! | 1       | Filtering sampler                |
//! | 2       | Albedo                           |
//! | 3       | Normal map                       |
//! | 4       | Metallic (blue channel)          |
//! | 5       | Roughness (green channel)        |
//! | 6       | Ambient occlusion (red channel)  |
//! | 7       | Emissive                         |

use crate::geometry::{ImageData, MeshData};
use crate::gpu::GpuContext;
use crate::resources::{self, MipGenerator};

/// The pipeline family a material was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Pbr,
}

/// Identifies the bind group layout a mesh's material was built against.
///
/// Two contracts are equal only when they share the same layout object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterialContract {
    pub kind: MaterialKind,
    pub layout: wgpu::BindGroupLayout,
}

/// Material factors as seen by the fragment shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub occlusion_strength: f32,
    pub _padding: [f32; 2],
}

/// The material bind group layout of one PBR pipeline.
pub struct MaterialLayout {
    pub layout: wgpu::BindGroupLayout,
    contract: MaterialContract,
}

impl MaterialLayout {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PBR Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<MaterialUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture(2),
                texture(3),
                texture(4),
                texture(5),
                texture(6),
                texture(7),
            ],
        });

        Self {
            contract: MaterialContract {
                kind: MaterialKind::Pbr,
                layout: layout.clone(),
            },
            layout,
        }
    }

    pub fn contract(&self) -> &MaterialContract {
        &self.contract
    }
}

/// Uniform buffer, textures and bind group of one mesh's material.
pub struct Material {
    pub uniform_buffer: wgpu::Buffer,
    pub textures: Vec<wgpu::Texture>,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

/// GPU-resident geometry with its material.
///
/// Meshes are immutable after creation and shared through `Arc`; the renderer
/// holds a reference for every queued draw until the frame is encoded.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub index_count: u32,
    pub material: Material,
    contract: MaterialContract,
}

impl Mesh {
    /// Upload geometry, textures and material factors.
    ///
    /// Missing texture maps are replaced by neutral 1×1 textures. Mip chains for
    /// all six maps are generated with a single submission.
    pub fn upload(
        gpu: &GpuContext,
        data: &MeshData,
        layout: &MaterialLayout,
        mips: &MipGenerator,
    ) -> Self {
        let vertex_buffer = resources::create_buffer(
            gpu,
            Some(bytemuck::cast_slice(&data.vertices)),
            std::mem::size_of_val(data.vertices.as_slice()) as u64,
            wgpu::BufferUsages::VERTEX,
            "Mesh Vertex Buffer",
        );
        let index_bytes = data.indices.as_bytes();
        let index_buffer = resources::create_buffer(
            gpu,
            Some(index_bytes),
            index_bytes.len() as u64,
            wgpu::BufferUsages::INDEX,
            "Mesh Index Buffer",
        );

        let material = Self::upload_material(gpu, data, layout, mips);

        Self {
            vertex_buffer,
            index_buffer,
            index_format: data.indices.format(),
            index_count: data.indices.len() as u32,
            material,
            contract: layout.contract().clone(),
        }
    }

    fn upload_material(
        gpu: &GpuContext,
        data: &MeshData,
        layout: &MaterialLayout,
        mips: &MipGenerator,
    ) -> Material {
        let material = &data.material;
        let uniform = MaterialUniform {
            base_color: material.base_color,
            emissive: material.emissive,
            metallic: material.metallic,
            roughness: material.roughness,
            occlusion_strength: material.occlusion_strength,
            _padding: [0.0; 2],
        };
        let uniform_buffer = resources::create_buffer(
            gpu,
            Some(bytemuck::bytes_of(&uniform)),
            std::mem::size_of::<MaterialUniform>() as u64,
            wgpu::BufferUsages::UNIFORM,
            "Material Uniforms",
        );

        const WHITE: [u8; 4] = [255, 255, 255, 255];
        const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];
        let slots: [(&Option<ImageData>, [u8; 4], &str); 6] = [
            (&material.albedo, WHITE, "Albedo Texture"),
            (&material.normal, FLAT_NORMAL, "Normal Texture"),
            (&material.metallic_map, WHITE, "Metallic Texture"),
            (&material.roughness_map, WHITE, "Roughness Texture"),
            (&material.occlusion, WHITE, "Occlusion Texture"),
            (&material.emissive_map, WHITE, "Emissive Texture"),
        ];

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Material Mip Encoder"),
            });

        let textures: Vec<wgpu::Texture> = slots
            .iter()
            .map(|(image, fallback, label)| {
                let fallback_image;
                let image = match image {
                    Some(image) if image.rgba8.len() == (image.width * image.height * 4) as usize => {
                        image
                    }
                    Some(_) => {
                        log::warn!("{label} has an inconsistent pixel buffer; using a fallback");
                        fallback_image = ImageData::solid(*fallback);
                        &fallback_image
                    }
                    None => {
                        fallback_image = ImageData::solid(*fallback);
                        &fallback_image
                    }
                };
                let texture = resources::create_texture(
                    gpu,
                    image.width,
                    image.height,
                    &image.rgba8,
                    resources::mip_level_count(image.width, image.height),
                    label,
                );
                mips.encode(gpu, &mut encoder, &texture);
                texture
            })
            .collect();

        gpu.queue.submit(std::iter::once(encoder.finish()));

        let sampler = resources::create_sampler(gpu, wgpu::AddressMode::Repeat, "Material Sampler");
        let views: Vec<wgpu::TextureView> = textures
            .iter()
            .map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ];
        entries.extend(views.iter().zip(2..).map(|(view, binding)| wgpu::BindGroupEntry {
            binding,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &layout.layout,
            entries: &entries,
        });

        Material {
            uniform_buffer,
            textures,
            sampler,
            bind_group,
        }
    }

    pub fn contract(&self) -> &MaterialContract {
        &self.contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
    }

    #[test]
    fn contracts_follow_the_layout_object() {
        let Ok(gpu) = GpuContext::headless(4, 4) else {
            return;
        };
        let first = MaterialLayout::new(&gpu.device);
        let second = MaterialLayout::new(&gpu.device);

        assert_eq!(first.contract(), first.contract());
        assert_eq!(first.contract().clone(), *first.contract());
        assert_ne!(first.contract(), second.contract());
        assert_eq!(first.contract().kind, second.contract().kind);
    }
}
