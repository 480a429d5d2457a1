//! Spatial transforms for placing meshes and the camera in world space.
//!
//! [`Transform`] uses a builder pattern for ergonomic positioning:
//!
//! ```
//! use lumen::{Transform, Vec3, Quat};
//!
//! let transform = Transform::new()
//!     .translation(Vec3::new(0.0, 2.0, -5.0))
//!     .rotation(Quat::from_rotation_y(0.5))
//!     .uniform_scale(2.0);
//!
//! let positioned = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
//! ```

use glam::{Mat4, Quat, Vec3};

/// Translation, rotation, and scale of an object.
///
/// # Transformation Order
///
/// [`Transform::matrix()`] composes `Translate * Scale * Rotate`. Applied to a
/// column vector, rotation happens first in local space, then the scale, then
/// the translation.
///
/// Every scale axis must be non-zero; a degenerate transform has no inverse and
/// therefore no normal matrix. See [`Transform::is_degenerate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub translation: Vec3,
    /// Scale factors for each axis.
    pub scale: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Creates a new identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transform positioned at the given location.
    ///
    /// ```
    /// use lumen::{Transform, Vec3};
    ///
    /// let transform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
    /// assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
    /// ```
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Sets the translation component.
    pub fn translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Sets the rotation component using a quaternion.
    ///
    /// For common rotation operations, use glam's quaternion constructors:
    /// - `Quat::from_rotation_x(angle)` : Rotate around X axis
    /// - `Quat::from_rotation_y(angle)` : Rotate around Y axis
    /// - `Quat::from_euler(order, x, y, z)` : From Euler angles
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets non-uniform scale factors for each axis.
    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets uniform scale on all axes.
    ///
    /// ```
    /// use lumen::{Transform, Vec3};
    ///
    /// let transform = Transform::new().uniform_scale(2.0);
    /// assert_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    /// ```
    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Returns true when any scale axis is zero (or not finite).
    pub fn is_degenerate(&self) -> bool {
        !self.scale.is_finite() || self.scale.cmpeq(Vec3::ZERO).any()
    }

    /// Converts this transform to a 4×4 `Translate * Scale * Rotate` matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_scale(self.scale)
            * Mat4::from_quat(self.rotation)
    }

    /// The inverse-transpose of [`matrix`](Self::matrix), for transforming normals
    /// under non-uniform scale.
    ///
    /// Only the upper 3×3 block is meaningful; translation is stripped so the
    /// matrix can be applied to `w = 0` directions safely.
    pub fn normal_matrix(&self) -> Mat4 {
        let model = self.matrix();
        Mat4::from_mat3(glam::Mat3::from_mat4(model.inverse().transpose()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn origin_maps_to_translation() {
        let t = Transform::new()
            .translation(Vec3::new(3.0, -2.0, 7.5))
            .scale(Vec3::new(2.0, 0.5, 4.0))
            .rotation(Quat::from_rotation_y(1.1));

        let origin = t.matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx(origin, Vec4::new(3.0, -2.0, 7.5, 1.0)));
    }

    #[test]
    fn unit_axes_scale_by_exactly_s() {
        let t = Transform::new().scale(Vec3::new(2.0, 0.5, 4.0));
        let m = t.matrix();

        assert!(approx(m * Vec4::X, Vec4::new(2.0, 0.0, 0.0, 0.0)));
        assert!(approx(m * Vec4::Y, Vec4::new(0.0, 0.5, 0.0, 0.0)));
        assert!(approx(m * Vec4::Z, Vec4::new(0.0, 0.0, 4.0, 0.0)));
    }

    #[test]
    fn rotation_is_applied_before_scale() {
        // A quarter turn about Z sends +X to +Y, which is then scaled by S.y.
        let t = Transform::new()
            .scale(Vec3::new(2.0, 3.0, 1.0))
            .rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));

        let v = t.matrix() * Vec4::X;
        assert!(approx(v, Vec4::new(0.0, 3.0, 0.0, 0.0)));
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular() {
        let t = Transform::new().scale(Vec3::new(4.0, 1.0, 1.0));
        // Surface x = y has tangent (1, 1, 0) and normal (1, -1, 0).
        let tangent = t.matrix() * Vec4::new(1.0, 1.0, 0.0, 0.0);
        let normal = t.normal_matrix() * Vec4::new(1.0, -1.0, 0.0, 0.0);

        assert!(tangent.dot(normal).abs() < 1e-5);
        assert_eq!(t.normal_matrix().w_axis, Vec4::W);
    }

    #[test]
    fn zero_scale_is_degenerate() {
        assert!(!Transform::new().is_degenerate());
        assert!(Transform::new().scale(Vec3::new(1.0, 0.0, 1.0)).is_degenerate());
        assert!(Transform::new().uniform_scale(f32::NAN).is_degenerate());
    }
}
