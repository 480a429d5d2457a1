//! Error types for renderer construction, frame submission and asset loading.

use std::path::PathBuf;

/// Errors surfaced by the renderer itself.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A shader file could not be read from the asset directory.
    #[error("failed to read shader '{path}': {source}")]
    Shader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No adapter matched the requested options.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    /// The adapter refused to hand out a device.
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    /// A window surface could not be created.
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    /// The presentable surface could not provide a texture this frame.
    #[error("surface unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Errors produced while turning files on disk into CPU-side asset data.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import glTF '{path}': {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("'{0}' contains no triangle primitives")]
    NoGeometry(PathBuf),
    #[error("primitive is missing the {0} attribute")]
    MissingAttribute(&'static str),
    #[error("vertex attribute lengths differ ({positions} positions, {normals} normals)")]
    AttributeMismatch { positions: usize, normals: usize },
    #[error("unsupported index component type")]
    UnsupportedIndexType,
    #[error("unsupported image format {0:?}")]
    UnsupportedImage(gltf::image::Format),
    #[error("failed to decode image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
