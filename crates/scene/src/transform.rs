//! Transform component for game objects.
//!
//! Rotation is stored as Tait-Bryan angles in radians and applied in
//! Y (yaw), X (pitch), Z (roll) order, matching [`Camera::set_view_yxz`].
//!
//! [`Camera::set_view_yxz`]: crate::Camera::set_view_yxz

use glam::{Mat3, Mat4, Vec3};

/// Scale components smaller than this make the transform non-invertible.
const MIN_SCALE: f32 = 1e-6;

/// Translation, scale and rotation of one object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformComponent {
    pub translation: Vec3,
    pub scale: Vec3,
    /// Angles around X, Y and Z in radians.
    pub rotation: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
        }
    }
}

impl TransformComponent {
    /// Create an identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_rotation_y(self.rotation.y)
            * Mat3::from_rotation_x(self.rotation.x)
            * Mat3::from_rotation_z(self.rotation.z)
    }

    /// Model matrix: `translate * Ry * Rx * Rz * scale`.
    pub fn mat4(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_mat3(self.rotation_matrix())
            * Mat4::from_scale(self.scale)
    }

    /// Matrix that carries normals into world space.
    ///
    /// This is the inverse transpose of the upper 3x3 of [`mat4`], which for
    /// a rotation followed by a scale reduces to `R * S⁻¹`. A degenerate
    /// (zero) scale yields the identity instead of infinities.
    ///
    /// [`mat4`]: TransformComponent::mat4
    pub fn normal_matrix(&self) -> Mat4 {
        if self.scale.abs().min_element() < MIN_SCALE {
            return Mat4::IDENTITY;
        }
        Mat4::from_mat3(self.rotation_matrix() * Mat3::from_diagonal(self.scale.recip()))
    }
}
