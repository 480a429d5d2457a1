//! Uniform data shared by every pass each frame, and the per-draw instance block.
//!
//! Both structs are uploaded verbatim, so their layout mirrors the `FrameData`
//! and `Instance` declarations in the WGSL shaders (16-byte aligned members,
//! vec3 packed with a trailing scalar).

use glam::{Mat4, Vec3, Vec4};

use crate::transform::Transform;

/// Number of point light slots in [`CommonFrameData`].
pub const MAX_POINT_LIGHTS: usize = 4;

/// Default per-frame draw ceiling of the PBR instance buffer.
pub const MAX_INSTANCES: u32 = 4096;

/// Dynamic uniform offsets must be a multiple of this on every WebGPU device.
pub const UNIFORM_OFFSET_ALIGNMENT: u32 = 256;

/// A point light as seen by the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLight {
    pub color: [f32; 4],
    pub position: [f32; 3],
    pub radius: f32,
}

impl PointLight {
    pub fn new(color: Vec4, position: Vec3, radius: f32) -> Self {
        Self {
            color: color.to_array(),
            position: position.to_array(),
            radius,
        }
    }
}

/// Camera, time, and lighting state uploaded once per frame.
///
/// Bound at group 0 by the skybox and PBR pipelines.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CommonFrameData {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// Always `proj * view`; refreshed by [`set_view`](Self::set_view) and
    /// [`set_projection`](Self::set_projection).
    pub vp: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    /// Seconds since the renderer was created.
    pub time: f32,
    pub point_lights: [PointLight; MAX_POINT_LIGHTS],
    pub light_direction: [f32; 3],
    pub normal_map_strength: f32,
    pub light_color: [f32; 4],
}

impl Default for CommonFrameData {
    fn default() -> Self {
        let white = Vec4::ONE;
        Self {
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            vp: Mat4::IDENTITY.to_cols_array_2d(),
            camera_position: [0.0; 3],
            time: 0.0,
            point_lights: [
                PointLight::new(white, Vec3::new(0.5, 0.0, 0.5), 1.0),
                PointLight::new(white, Vec3::new(0.5, 0.25, -0.5), 1.0),
                PointLight::new(white, Vec3::new(-0.5, 0.5, -0.5), 1.0),
                PointLight::new(white, Vec3::new(-0.5, 1.0, 0.5), 1.0),
            ],
            light_direction: Vec3::new(-0.3, -1.0, -0.4).normalize().to_array(),
            normal_map_strength: 0.8,
            light_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl CommonFrameData {
    pub fn set_projection(&mut self, proj: Mat4) {
        self.proj = proj.to_cols_array_2d();
        self.refresh_vp();
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view.to_cols_array_2d();
        self.refresh_vp();
    }

    pub fn view_projection(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.vp)
    }

    fn refresh_vp(&mut self) {
        let vp = Mat4::from_cols_array_2d(&self.proj) * Mat4::from_cols_array_2d(&self.view);
        self.vp = vp.to_cols_array_2d();
    }

    /// Overwrite one point light slot.
    ///
    /// An out-of-range index is a configuration error: it is logged and the light
    /// array is left untouched. Returns whether the slot was written.
    pub fn set_point_light(&mut self, index: usize, color: Vec4, position: Vec3) -> bool {
        let Some(light) = self.point_lights.get_mut(index) else {
            log::warn!(
                "Ignoring point light {index}: only {MAX_POINT_LIGHTS} slots are available"
            );
            return false;
        };
        light.color = color.to_array();
        light.position = position.to_array();
        true
    }
}

/// Per-draw transform block, written into a dynamic-offset slot of the PBR
/// instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of `model`, for normals under non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
}

impl InstanceData {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            model: transform.matrix().to_cols_array_2d(),
            normal_matrix: transform.normal_matrix().to_cols_array_2d(),
        }
    }
}

/// Round `size` up to the next multiple of `alignment`.
pub fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// Distance in bytes between consecutive dynamic-offset slots holding `T`.
pub fn uniform_stride<T>(alignment: u32) -> u32 {
    align_to(std::mem::size_of::<T>() as u64, alignment as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<PointLight>(), 32);
        assert_eq!(std::mem::size_of::<CommonFrameData>(), 368);
        assert_eq!(std::mem::size_of::<InstanceData>(), 128);
        assert_eq!(std::mem::size_of::<CommonFrameData>() % 16, 0);
    }

    #[test]
    fn instance_stride_rounds_to_256() {
        assert_eq!(uniform_stride::<InstanceData>(UNIFORM_OFFSET_ALIGNMENT), 256);
        assert_eq!(uniform_stride::<u32>(UNIFORM_OFFSET_ALIGNMENT), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(0, 256), 0);
    }

    #[test]
    fn vp_tracks_view_and_projection() {
        let mut data = CommonFrameData::default();
        let proj = Mat4::perspective_rh(1.0, 800.0 / 450.0, 0.1, 100.0);
        let view = Mat4::from_translation(Vec3::new(0.0, -2.0, -3.0));

        data.set_projection(proj);
        data.set_view(view);
        assert_eq!(data.view_projection(), proj * view);

        let moved = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        data.set_view(moved);
        assert_eq!(data.view_projection(), proj * moved);
    }

    #[test]
    fn out_of_range_light_is_ignored() {
        let mut data = CommonFrameData::default();
        let before = data.point_lights;

        let written = data.set_point_light(MAX_POINT_LIGHTS, Vec4::ZERO, Vec3::splat(9.0));

        assert!(!written);
        assert_eq!(data.point_lights, before);
    }

    #[test]
    fn light_slot_is_overwritten() {
        let mut data = CommonFrameData::default();
        let color = Vec4::new(1.0, 0.5, 0.25, 1.0);

        assert!(data.set_point_light(2, color, Vec3::new(0.0, 3.0, 0.0)));
        assert_eq!(data.point_lights[2].color, color.to_array());
        assert_eq!(data.point_lights[2].position, [0.0, 3.0, 0.0]);
        assert_eq!(data.point_lights[2].radius, 1.0);
    }
}
