//! Equirectangular HDR environment maps.
//!
//! Maps are decoded to RGBA `f32` and narrowed to `f16` before upload, matching
//! the `Rgba16Float` source texture the cubemap conversion samples.

use std::path::Path;

use half::f16;

use crate::error::AssetError;
use crate::gpu::GpuContext;

/// An equirectangular environment image in RGBA half floats.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f16>,
}

impl EnvironmentMap {
    /// Decode an `.hdr` (or any format the `image` crate reads) from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| AssetError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba32f();
        let (width, height) = image.dimensions();
        log::info!("Loaded environment map '{}' ({width}x{height})", path.display());
        Ok(Self::from_rgba32f(width, height, image.as_raw()))
    }

    /// Load `path`, or fall back to a constant environment of `fallback` when no
    /// path is given or decoding fails.
    pub fn load_or_uniform(path: Option<&Path>, fallback: [f32; 3]) -> Self {
        match path.map(Self::from_file) {
            Some(Ok(map)) => map,
            Some(Err(error)) => {
                log::warn!("{error}; using a uniform environment instead");
                Self::uniform(fallback)
            }
            None => Self::uniform(fallback),
        }
    }

    /// Narrow RGBA `f32` texels to half precision.
    pub fn from_rgba32f(width: u32, height: u32, rgba: &[f32]) -> Self {
        Self {
            width,
            height,
            pixels: rgba.iter().copied().map(f16::from_f32).collect(),
        }
    }

    /// A constant-radiance environment.
    pub fn uniform(color: [f32; 3]) -> Self {
        let [r, g, b] = color;
        Self::from_rgba32f(1, 1, &[r, g, b, 1.0])
    }

    /// Upload as a sampleable `Rgba16Float` texture.
    pub fn upload(&self, gpu: &GpuContext) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Environment Map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4 * std::mem::size_of::<f16>() as u32),
                rows_per_image: Some(self.height),
            },
            size,
        );

        texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_map_is_one_opaque_texel() {
        let map = EnvironmentMap::uniform([0.5, 2.0, 0.25]);

        assert_eq!((map.width, map.height), (1, 1));
        let values: Vec<f32> = map.pixels.iter().map(|h| h.to_f32()).collect();
        assert_eq!(values, vec![0.5, 2.0, 0.25, 1.0]);
    }

    #[test]
    fn hdr_values_survive_narrowing() {
        let map = EnvironmentMap::from_rgba32f(2, 1, &[100.0, 0.0, 1.5, 1.0, 0.0, 0.0, 0.0, 1.0]);

        assert_eq!(map.pixels.len(), 8);
        assert_eq!(map.pixels[0].to_f32(), 100.0);
        assert_eq!(map.pixels[2].to_f32(), 1.5);
    }

    #[test]
    fn missing_file_falls_back_to_uniform() {
        let path = Path::new("no/such/environment.hdr");
        assert!(matches!(
            EnvironmentMap::from_file(path),
            Err(AssetError::Image { .. })
        ));

        let map = EnvironmentMap::load_or_uniform(Some(path), [1.0, 1.0, 1.0]);
        assert_eq!(map, EnvironmentMap::uniform([1.0, 1.0, 1.0]));
    }
}
