use std::path::PathBuf;

use glam::{Quat, Vec3};

use crate::camera::Camera;
use crate::frame_data::MAX_INSTANCES;
use crate::transform::Transform;

/// Construction parameters for a [`Renderer`](crate::Renderer) and the demo window.
///
/// ```
/// use lumen::RendererConfig;
///
/// let config = RendererConfig::new()
///     .title("Helmet")
///     .size(1280, 720)
///     .environment_map("assets/textures/garden.hdr")
///     .skybox_face_size(1024);
/// assert_eq!(config.width, 1280);
/// ```
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Directory holding `shaders/` (and, by convention, `textures/`).
    pub asset_root: PathBuf,
    /// Equirectangular `.hdr` baked into the skybox; `None` uses
    /// [`environment_fallback`](Self::environment_fallback).
    pub environment_map: Option<PathBuf>,
    /// Constant radiance used when no environment map is available.
    pub environment_fallback: [f32; 3],
    pub skybox_face_size: u32,
    pub irradiance_face_size: u32,
    pub skybox_exposure: f32,
    /// Per-frame draw ceiling; draws past it are dropped.
    pub max_instances: u32,
    pub clear_color: wgpu::Color,
    pub camera: Camera,
    pub camera_transform: Transform,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "Lumen".to_string(),
            width: 1280,
            height: 720,
            asset_root: PathBuf::from("assets"),
            environment_map: None,
            environment_fallback: [0.3, 0.3, 0.3],
            skybox_face_size: 2048,
            irradiance_face_size: 32,
            skybox_exposure: 3.0,
            max_instances: MAX_INSTANCES,
            clear_color: wgpu::Color {
                r: 0.3,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
            camera: Camera::default(),
            // Negative pitch tilts the -Z view direction down toward the origin.
            camera_transform: Transform::from_translation(Vec3::new(0.0, 2.0, 3.0))
                .rotation(Quat::from_rotation_x(-30f32.to_radians())),
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn asset_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.asset_root = path.into();
        self
    }

    pub fn environment_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_map = Some(path.into());
        self
    }

    pub fn environment_fallback(mut self, color: [f32; 3]) -> Self {
        self.environment_fallback = color;
        self
    }

    pub fn skybox_face_size(mut self, size: u32) -> Self {
        self.skybox_face_size = size;
        self
    }

    pub fn irradiance_face_size(mut self, size: u32) -> Self {
        self.irradiance_face_size = size;
        self
    }

    pub fn skybox_exposure(mut self, exposure: f32) -> Self {
        self.skybox_exposure = exposure;
        self
    }

    pub fn max_instances(mut self, count: u32) -> Self {
        self.max_instances = count.max(1);
        self
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn camera_transform(mut self, transform: Transform) -> Self {
        self.camera_transform = transform;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_scene() {
        let config = RendererConfig::default();

        assert_eq!(config.max_instances, 4096);
        assert_eq!(config.skybox_exposure, 3.0);
        assert_eq!(config.camera_transform.translation, Vec3::new(0.0, 2.0, 3.0));
        // The default camera looks down towards the origin.
        let forward = config.camera_transform.rotation * Vec3::NEG_Z;
        assert!(forward.y < 0.0);
    }

    #[test]
    fn default_camera_pitches_down_thirty_degrees() {
        let rotation = RendererConfig::default().camera_transform.rotation;
        let forward = rotation * Vec3::NEG_Z;

        assert!(forward.abs_diff_eq(Vec3::new(0.0, -0.5, -(3f32.sqrt() / 2.0)), 1e-5));
        assert!((rotation * Vec3::Y).z < 0.0);
    }

    #[test]
    fn zero_max_instances_is_raised_to_one() {
        assert_eq!(RendererConfig::new().max_instances(0).max_instances, 1);
    }
}
