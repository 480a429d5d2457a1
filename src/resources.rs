//! GPU resource creation helpers shared by the passes and the mesh loader.
//!
//! Buffers, shaders and textures are created through the free functions here so
//! that padding, usage flags and initial uploads are handled the same way
//! everywhere. Mip generation is deliberately separate from texture creation:
//! [`MipGenerator::encode`] records into a caller-owned encoder, and
//! [`MipGenerator::generate_now`] is the convenience variant that submits on its
//! own.

use std::path::Path;

use crate::error::RenderError;
use crate::gpu::GpuContext;

/// Format of every texture produced by [`create_texture`].
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Format of cubemap faces (environment and irradiance).
pub const CUBEMAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const MIP_WORKGROUP_SIZE: u32 = 8;

/// Round a buffer size up to the 4-byte copy alignment.
pub fn padded_size(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// Create a buffer and optionally fill it through the queue.
///
/// The size is padded to a multiple of 4 and `COPY_DST` is always added so the
/// buffer can be rewritten later with `queue.write_buffer`.
pub fn create_buffer(
    gpu: &GpuContext,
    data: Option<&[u8]>,
    size: u64,
    usage: wgpu::BufferUsages,
    label: &str,
) -> wgpu::Buffer {
    let size = padded_size(size.max(data.map_or(0, |d| d.len() as u64)));
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    if let Some(data) = data {
        // Queue writes must also be a multiple of 4 bytes.
        if data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            gpu.queue.write_buffer(&buffer, 0, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(padded_size(data.len() as u64) as usize, 0);
            gpu.queue.write_buffer(&buffer, 0, &padded);
        }
    }

    buffer
}

/// Read a WGSL file and compile it into a shader module.
pub fn create_shader(
    gpu: &GpuContext,
    path: &Path,
    label: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    let source = std::fs::read_to_string(path).map_err(|source| RenderError::Shader {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!("Compiling shader '{}'", path.display());
    Ok(gpu
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
}

/// Number of levels in a full mip chain for the given extent.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    width.max(height).max(1).ilog2() + 1
}

/// Extent of mip `level`, never smaller than 1×1.
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    ((width >> level).max(1), (height >> level).max(1))
}

/// Allocate a 2D RGBA8 texture and upload its top level.
///
/// Levels past the first are left undefined; fill them with a [`MipGenerator`].
pub fn create_texture(
    gpu: &GpuContext,
    width: u32,
    height: u32,
    rgba8: &[u8],
    mip_level_count: u32,
    label: &str,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba8,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    texture
}

/// A linear-filtering sampler with the same address mode on every axis.
pub fn create_sampler(
    gpu: &GpuContext,
    address_mode: wgpu::AddressMode,
    label: &str,
) -> wgpu::Sampler {
    gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Downsamples each mip level from the one above it.
///
/// Levels are written by a compute pass where the backend can store into a
/// single mip level. On GL, and on adapters without compute, each level is
/// rendered into a scratch texture by a full-screen blit and copied into place.
pub struct MipGenerator {
    strategy: MipStrategy,
}

enum MipStrategy {
    Compute {
        layout: wgpu::BindGroupLayout,
        pipeline: wgpu::ComputePipeline,
    },
    Blit {
        layout: wgpu::BindGroupLayout,
        pipeline: wgpu::RenderPipeline,
        sampler: wgpu::Sampler,
    },
}

impl MipGenerator {
    /// Build the pipeline from `<asset_root>/shaders/mip-comp.wgsl`, or from
    /// `mip-blit.wgsl` when the compute path is unavailable.
    pub fn new(gpu: &GpuContext, asset_root: &Path) -> Result<Self, RenderError> {
        Self::with_compute(gpu, asset_root, Self::supports_compute(&gpu.adapter))
    }

    fn with_compute(
        gpu: &GpuContext,
        asset_root: &Path,
        compute: bool,
    ) -> Result<Self, RenderError> {
        let strategy = if compute {
            compute_strategy(gpu, asset_root)?
        } else {
            log::info!("Generating mip chains with render passes");
            blit_strategy(gpu, asset_root)?
        };
        Ok(Self { strategy })
    }

    /// Whether `adapter` can write mip levels from a compute shader.
    ///
    /// The GL backend leaves levels written through storage views empty.
    pub fn supports_compute(adapter: &wgpu::Adapter) -> bool {
        adapter.get_info().backend != wgpu::Backend::Gl
            && adapter
                .get_downlevel_capabilities()
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
    }

    pub fn uses_compute(&self) -> bool {
        matches!(self.strategy, MipStrategy::Compute { .. })
    }

    /// Record the passes filling levels `1..mip_level_count` of `texture`.
    ///
    /// Does nothing for single-level textures. The caller decides when the
    /// encoder is submitted.
    pub fn encode(
        &self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) {
        if texture.mip_level_count() <= 1 {
            return;
        }

        match &self.strategy {
            MipStrategy::Compute { layout, pipeline } => {
                encode_compute(gpu, encoder, texture, layout, pipeline)
            }
            MipStrategy::Blit {
                layout,
                pipeline,
                sampler,
            } => encode_blit(gpu, encoder, texture, layout, pipeline, sampler),
        }
    }

    /// Generate the mip chain with a dedicated submission.
    pub fn generate_now(&self, gpu: &GpuContext, texture: &wgpu::Texture) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Mip Generation Encoder"),
            });
        self.encode(gpu, &mut encoder, texture);
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn compute_strategy(gpu: &GpuContext, asset_root: &Path) -> Result<MipStrategy, RenderError> {
    let device = &gpu.device;
    let shader = create_shader(
        gpu,
        &asset_root.join("shaders/mip-comp.wgsl"),
        "Mip Generation Shader",
    )?;

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Mip Generation Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: TEXTURE_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mip Generation Pipeline Layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Mip Generation Pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    });

    Ok(MipStrategy::Compute { layout, pipeline })
}

fn blit_strategy(gpu: &GpuContext, asset_root: &Path) -> Result<MipStrategy, RenderError> {
    let device = &gpu.device;
    let shader = create_shader(
        gpu,
        &asset_root.join("shaders/mip-blit.wgsl"),
        "Mip Blit Shader",
    )?;

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Mip Blit Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mip Blit Pipeline Layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Mip Blit Pipeline"),
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
                format: TEXTURE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    let sampler = create_sampler(gpu, wgpu::AddressMode::ClampToEdge, "Mip Blit Sampler");

    Ok(MipStrategy::Blit {
        layout,
        pipeline,
        sampler,
    })
}

/// One compute pass; level N-1 is read through a texture view, level N is
/// written through a storage view.
fn encode_compute(
    gpu: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    texture: &wgpu::Texture,
    layout: &wgpu::BindGroupLayout,
    pipeline: &wgpu::ComputePipeline,
) {
    let levels = texture.mip_level_count();
    let views: Vec<wgpu::TextureView> = (0..levels)
        .map(|level| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Mip Level View"),
                format: Some(TEXTURE_FORMAT),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_mip_level: level,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(1),
                ..Default::default()
            })
        })
        .collect();

    let bind_groups: Vec<wgpu::BindGroup> = views
        .windows(2)
        .map(|pair| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Mip Generation Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&pair[0]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&pair[1]),
                    },
                ],
            })
        })
        .collect();

    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("Mip Generation Pass"),
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);

    let size = texture.size();
    for (level, bind_group) in (1..levels).zip(&bind_groups) {
        let (width, height) = mip_extent(size.width, size.height, level);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(
            width.div_ceil(MIP_WORKGROUP_SIZE),
            height.div_ceil(MIP_WORKGROUP_SIZE),
            1,
        );
    }
}

/// One render pass per level. Sampling and rendering only touch single-level
/// scratch textures; results reach `texture` through copies.
fn encode_blit(
    gpu: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    texture: &wgpu::Texture,
    layout: &wgpu::BindGroupLayout,
    pipeline: &wgpu::RenderPipeline,
    sampler: &wgpu::Sampler,
) {
    let size = texture.size();
    let mut previous = mip_scratch(gpu, size.width, size.height);
    copy_level(encoder, texture, 0, &previous, 0, (size.width, size.height));

    for level in 1..texture.mip_level_count() {
        let extent = mip_extent(size.width, size.height, level);
        let next = mip_scratch(gpu, extent.0, extent.1);

        let source = previous.create_view(&wgpu::TextureViewDescriptor::default());
        let target = next.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mip Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mip Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        copy_level(encoder, &next, 0, texture, level, extent);
        previous = next;
    }
}

fn mip_scratch(gpu: &GpuContext, width: u32, height: u32) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Mip Scratch"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn copy_level(
    encoder: &mut wgpu::CommandEncoder,
    source: &wgpu::Texture,
    source_level: u32,
    destination: &wgpu::Texture,
    destination_level: u32,
    (width, height): (u32, u32),
) {
    encoder.copy_texture_to_texture(
        wgpu::TexelCopyTextureInfo {
            texture: source,
            mip_level: source_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyTextureInfo {
            texture: destination,
            mip_level: destination_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// A six-layer `Rgba16Float` cube texture.
///
/// Faces follow the usual `+X, -X, +Y, -Y, +Z, -Z` layer order. The cube view is
/// for sampling; the per-face views are render targets for the face-projection
/// passes.
pub struct CubeMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub face_views: [wgpu::TextureView; 6],
    pub size: u32,
}

impl CubeMap {
    pub fn new(gpu: &GpuContext, size: u32, label: &str) -> Self {
        let size = size.max(1);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CUBEMAP_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        let face_views = std::array::from_fn(|face| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Cube Face View"),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: face as u32,
                array_layer_count: Some(1),
                ..Default::default()
            })
        });

        Self {
            texture,
            view,
            face_views,
            size,
        }
    }

    pub fn face_view(&self, face: usize) -> Option<&wgpu::TextureView> {
        self.face_views.get(face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_pad_to_four_bytes() {
        assert_eq!(padded_size(0), 0);
        assert_eq!(padded_size(1), 4);
        assert_eq!(padded_size(6), 8);
        assert_eq!(padded_size(368), 368);
    }

    #[test]
    fn full_mip_chain_length() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(1024, 300), 11);
        assert_eq!(mip_level_count(300, 1000), 10);
    }

    #[test]
    fn mip_extents_halve_and_stop_at_one() {
        assert_eq!(mip_extent(256, 64, 0), (256, 64));
        assert_eq!(mip_extent(256, 64, 1), (128, 32));
        assert_eq!(mip_extent(256, 64, 7), (2, 1));
        assert_eq!(mip_extent(256, 64, 8), (1, 1));
    }

    fn headless() -> Option<GpuContext> {
        GpuContext::headless(4, 4).ok()
    }

    #[test]
    fn buffers_are_padded_and_copyable() {
        let Some(gpu) = headless() else {
            return;
        };

        let buffer = create_buffer(
            &gpu,
            Some(&[1, 2, 3, 4, 5, 6]),
            6,
            wgpu::BufferUsages::UNIFORM,
            "Test Buffer",
        );

        assert_eq!(buffer.size(), 8);
        assert!(buffer.usage().contains(wgpu::BufferUsages::COPY_DST));
    }

    #[test]
    fn missing_shader_is_an_error() {
        let Some(gpu) = headless() else {
            return;
        };

        let result = create_shader(&gpu, Path::new("no/such/shader.wgsl"), "Missing");

        assert!(matches!(result, Err(RenderError::Shader { .. })));
    }

    /// Copy the first texel of `level` back to the CPU.
    fn read_texel(gpu: &GpuContext, texture: &wgpu::Texture, level: u32) -> Vec<u8> {
        // Rows are padded to 256 bytes.
        let readback = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mip Readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
        gpu.device
            .poll(wgpu::PollType::wait_indefinitely())
            .unwrap();

        slice.get_mapped_range()[..4].to_vec()
    }

    fn assert_mip_chain_matches_base(gpu: &GpuContext, mips: &MipGenerator) {
        let pixels: Vec<u8> = [200, 100, 50, 255].repeat(16);
        let texture = create_texture(gpu, 4, 4, &pixels, mip_level_count(4, 4), "Mip Test");
        mips.generate_now(gpu, &texture);

        for level in 0..3 {
            assert_eq!(
                read_texel(gpu, &texture, level),
                vec![200, 100, 50, 255],
                "mip level {level}"
            );
        }
    }

    #[test]
    fn generated_mips_average_the_base_level() {
        let Some(gpu) = headless() else {
            return;
        };
        let root = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"));
        let mips = MipGenerator::new(&gpu, root).unwrap();

        assert_eq!(
            mips.uses_compute(),
            MipGenerator::supports_compute(&gpu.adapter)
        );
        assert_mip_chain_matches_base(&gpu, &mips);
    }

    #[test]
    fn blit_mips_work_on_every_backend() {
        let Some(gpu) = headless() else {
            return;
        };
        let root = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"));
        let mips = MipGenerator::with_compute(&gpu, root, false).unwrap();

        assert!(!mips.uses_compute());
        assert_mip_chain_matches_base(&gpu, &mips);
    }
}
