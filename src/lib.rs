//! # Lumen
//!
//! **A physically based forward renderer on wgpu.**
//!
//! Lumen records a fixed sequence of render passes into one command buffer per
//! frame: an HDR environment skybox, multisampled PBR meshes lit by point lights,
//! a directional light and a baked irradiance cubemap, a tonemap into the
//! presentable image, and an optional UI overlay.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lumen::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let gpu = GpuContext::headless(800, 450)?;
//!     let mut renderer = Renderer::new(gpu, RendererConfig::new().asset_root("assets"))?;
//!
//!     let helmet = renderer
//!         .load_mesh("assets/models/helmet.glb")
//!         .unwrap_or_else(|| renderer.create_mesh(&MeshData::sphere(64, 32)));
//!
//!     renderer.draw_mesh(&helmet, Transform::new().rotation(Quat::from_rotation_y(0.5)));
//!     let stats = renderer.render()?;
//!     println!("{} draws", stats.pbr_draws);
//!     Ok(())
//! }
//! ```
//!
//! ## Resources
//!
//! - Shaders are read from `<asset_root>/shaders/*.wgsl` when the renderer is built.
//! - Meshes come from glTF files ([`load_gltf`]) or the procedural
//!   [`MeshData`] constructors, and are uploaded with [`Renderer::create_mesh`].
//! - The environment is an equirectangular `.hdr` ([`EnvironmentMap`]) baked into
//!   the skybox and irradiance cubemaps by [`Renderer::bake_environment`].

mod camera;
mod config;
mod draw_queue;
mod environment;
mod error;
mod frame_data;
mod geometry;
mod gltf_import;
mod gpu;
mod mesh;
pub mod passes;
mod render_targets;
mod renderer;
pub mod resources;
mod transform;

pub use camera::Camera;
pub use config::RendererConfig;
pub use draw_queue::{DrawQueue, DrawRequest, slot_offset};
pub use environment::EnvironmentMap;
pub use error::{AssetError, RenderError};
pub use frame_data::{
    CommonFrameData, InstanceData, MAX_INSTANCES, MAX_POINT_LIGHTS, PointLight,
    UNIFORM_OFFSET_ALIGNMENT, align_to, uniform_stride,
};
pub use geometry::{ImageData, IndexData, MaterialData, MeshData, PbrVertex};
pub use gltf_import::load_gltf;
pub use gpu::{GpuContext, OFFSCREEN_FORMAT};
pub use mesh::{Material, MaterialContract, MaterialKind, MaterialLayout, MaterialUniform, Mesh};
pub use passes::{FrameContext, RenderPass, UiOverlay};
pub use render_targets::{
    DEPTH_FORMAT, DepthTarget, Frame, HDR_FORMAT, MSAA_SAMPLES, RenderTarget, RenderTargets,
};
pub use renderer::{FrameStats, Renderer};
pub use resources::{CubeMap, MipGenerator};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
