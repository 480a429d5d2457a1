//! glTF (`.gltf` / `.glb`) import into [`MeshData`].
//!
//! Every triangle primitive of every mesh in the document is merged into a
//! single [`MeshData`]. The material of the first primitive is used for the
//! whole mesh.

use std::path::Path;

use glam::Vec3;

use crate::error::AssetError;
use crate::geometry::{ImageData, IndexData, MaterialData, MeshData, PbrVertex};

/// Read a glTF file and its buffers/images from disk.
pub fn load_gltf(path: impl AsRef<Path>) -> Result<MeshData, AssetError> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let mut parts = Vec::new();
    let mut material = None;

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping {:?} primitive in mesh {:?}",
                    primitive.mode(),
                    mesh.name()
                );
                continue;
            }

            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            parts.push(read_primitive(&reader)?);

            if material.is_none() {
                material = Some(read_material(&primitive.material(), &images)?);
            }
        }
    }

    let mut data =
        merge_primitives(parts).ok_or_else(|| AssetError::NoGeometry(path.to_path_buf()))?;
    data.material = material.unwrap_or_default();

    log::info!(
        "Loaded '{}': {} vertices, {} indices",
        path.display(),
        data.vertices.len(),
        data.indices.len()
    );
    Ok(data)
}

fn read_primitive<'a, 's, F>(
    reader: &gltf::mesh::Reader<'a, 's, F>,
) -> Result<MeshData, AssetError>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(AssetError::MissingAttribute("POSITION"))?
        .collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .ok_or(AssetError::MissingAttribute("NORMAL"))?
        .collect();
    if positions.len() != normals.len() {
        return Err(AssetError::AttributeMismatch {
            positions: positions.len(),
            normals: normals.len(),
        });
    }

    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect())
        .unwrap_or_else(|| vec![[0.0; 2]; positions.len()]);
    let tangents: Option<Vec<[f32; 4]>> = reader
        .read_tangents()
        .map(|tangents| tangents.collect())
        .filter(|tangents: &Vec<[f32; 4]>| tangents.len() == positions.len());

    let indices = match reader
        .read_indices()
        .ok_or(AssetError::MissingAttribute("indices"))?
    {
        gltf::mesh::util::ReadIndices::U16(indices) => IndexData::U16(indices.collect()),
        gltf::mesh::util::ReadIndices::U32(indices) => IndexData::U32(indices.collect()),
        gltf::mesh::util::ReadIndices::U8(_) => return Err(AssetError::UnsupportedIndexType),
    };

    let mut vertices: Vec<PbrVertex> = positions
        .iter()
        .zip(&normals)
        .enumerate()
        .map(|(i, (&position, &normal))| {
            PbrVertex::new(position, normal, uvs.get(i).copied().unwrap_or([0.0; 2]))
        })
        .collect();

    match tangents {
        Some(tangents) => {
            for (v, [x, y, z, w]) in vertices.iter_mut().zip(tangents) {
                let normal = Vec3::from(v.normal);
                let tangent = Vec3::new(x, y, z);
                v.tangent = tangent.into();
                v.bitangent = (normal.cross(tangent) * w).into();
            }
            Ok(MeshData::new(vertices, indices))
        }
        None => {
            let mut data = MeshData::new(vertices, indices);
            data.compute_tangents();
            Ok(data)
        }
    }
}

fn read_material(
    material: &gltf::Material<'_>,
    images: &[gltf::image::Data],
) -> Result<MaterialData, AssetError> {
    let image = |index: usize| -> Result<Option<ImageData>, AssetError> {
        images.get(index).map(to_rgba8).transpose()
    };

    let pbr = material.pbr_metallic_roughness();
    let metallic_roughness = pbr
        .metallic_roughness_texture()
        .map(|info| image(info.texture().source().index()))
        .transpose()?
        .flatten();

    Ok(MaterialData {
        base_color: pbr.base_color_factor(),
        emissive: material.emissive_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        occlusion_strength: material
            .occlusion_texture()
            .map_or(1.0, |occlusion| occlusion.strength()),
        albedo: pbr
            .base_color_texture()
            .map(|info| image(info.texture().source().index()))
            .transpose()?
            .flatten(),
        normal: material
            .normal_texture()
            .map(|normal| image(normal.texture().source().index()))
            .transpose()?
            .flatten(),
        metallic_map: metallic_roughness.clone(),
        roughness_map: metallic_roughness,
        occlusion: material
            .occlusion_texture()
            .map(|occlusion| image(occlusion.texture().source().index()))
            .transpose()?
            .flatten(),
        emissive_map: material
            .emissive_texture()
            .map(|info| image(info.texture().source().index()))
            .transpose()?
            .flatten(),
    })
}

/// Expand 8-bit glTF image data to RGBA8.
fn to_rgba8(image: &gltf::image::Data) -> Result<ImageData, AssetError> {
    use gltf::image::Format;

    let rgba8 = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[1], 0, 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        other => return Err(AssetError::UnsupportedImage(other)),
    };

    Ok(ImageData {
        width: image.width,
        height: image.height,
        rgba8,
    })
}

/// Concatenate primitives, rebasing indices.
///
/// A single primitive keeps its index width; several are widened to 32 bits.
fn merge_primitives(mut parts: Vec<MeshData>) -> Option<MeshData> {
    if parts.len() <= 1 {
        return parts.pop();
    }

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for part in parts {
        let base = vertices.len() as u32;
        indices.extend(part.indices.to_u32().into_iter().map(|index| index + base));
        vertices.extend(part.vertices);
    }
    Some(MeshData::new(vertices, IndexData::U32(indices)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        let vertices = vec![
            PbrVertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            PbrVertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            PbrVertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        MeshData::new(vertices, IndexData::U16(vec![0, 1, 2]))
    }

    #[test]
    fn single_primitive_keeps_index_width() {
        let merged = merge_primitives(vec![triangle()]).unwrap();
        assert_eq!(merged.indices, IndexData::U16(vec![0, 1, 2]));
    }

    #[test]
    fn merged_primitives_rebase_indices() {
        let merged = merge_primitives(vec![triangle(), triangle()]).unwrap();

        assert_eq!(merged.vertices.len(), 6);
        assert_eq!(merged.indices, IndexData::U32(vec![0, 1, 2, 3, 4, 5]));
    }

    #[test]
    fn no_primitives_is_none() {
        assert!(merge_primitives(Vec::new()).is_none());
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };

        let image = to_rgba8(&data).unwrap();
        assert_eq!(image.rgba8, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn float_images_are_rejected() {
        let data = gltf::image::Data {
            pixels: vec![0; 16],
            format: gltf::image::Format::R32G32B32A32FLOAT,
            width: 1,
            height: 1,
        };

        assert!(matches!(
            to_rgba8(&data),
            Err(AssetError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_gltf("does/not/exist.gltf").unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
        assert!(err.to_string().contains("does/not/exist.gltf"));
    }
}
