//! Camera projection and view matrices.
//!
//! Projections target Vulkan clip space: depth runs from 0 at the near plane
//! to 1 at the far plane and +Y points down the screen. View matrices take
//! −Y as the default up direction for the same reason.

use glam::{Mat4, Vec3, Vec4};

/// Up direction used when callers don't supply one.
pub const DEFAULT_UP: Vec3 = Vec3::NEG_Y;

/// A camera holding a projection matrix and a view matrix.
///
/// Both start as identity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    /// Create a camera with identity matrices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthographic projection of the box `[left, right] × [top, bottom] × [near, far]`.
    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::from_cols(
            Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / (bottom - top), 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0 / (far - near), 0.0),
            Vec4::new(
                -(right + left) / (right - left),
                -(bottom + top) / (bottom - top),
                -near / (far - near),
                1.0,
            ),
        );
    }

    /// Perspective projection with vertical field of view `fov_y` in radians.
    pub fn set_perspective_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        debug_assert!(aspect.abs() > f32::EPSILON, "aspect ratio must be non-zero");

        let tan_half_fov_y = (fov_y / 2.0).tan();
        self.projection = Mat4::from_cols(
            Vec4::new(1.0 / (aspect * tan_half_fov_y), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0 / tan_half_fov_y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, far / (far - near), 1.0),
            Vec4::new(0.0, 0.0, -(far * near) / (far - near), 0.0),
        );
    }

    /// Look from `position` along `direction`.
    ///
    /// `direction` must be non-zero and not parallel to `up`.
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(up).normalize();
        let v = w.cross(u);
        self.view = view_from_basis(u, v, w, position);
    }

    /// Look from `position` toward `target`.
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// View from `position` with Tait-Bryan angles applied in Y, X, Z order.
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let (s3, c3) = rotation.z.sin_cos();
        let (s2, c2) = rotation.x.sin_cos();
        let (s1, c1) = rotation.y.sin_cos();

        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);
        self.view = view_from_basis(u, v, w, position);
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// `projection * view`.
    #[inline]
    pub fn projection_view(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// World-to-camera matrix for an orthonormal camera basis at `position`.
fn view_from_basis(u: Vec3, v: Vec3, w: Vec3, position: Vec3) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(u.x, v.x, w.x, 0.0),
        Vec4::new(u.y, v.y, w.y, 0.0),
        Vec4::new(u.z, v.z, w.z, 0.0),
        Vec4::new(-u.dot(position), -v.dot(position), -w.dot(position), 1.0),
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn project(m: Mat4, p: Vec3) -> Vec3 {
        let clip = m * p.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn test_default_is_identity() {
        let camera = Camera::new();
        assert_eq!(camera.projection(), Mat4::IDENTITY);
        assert_eq!(camera.view(), Mat4::IDENTITY);
    }

    #[test]
    fn test_perspective_depth_is_zero_to_one() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(50f32.to_radians(), 4.0 / 3.0, 0.1, 10.0);

        let near = project(camera.projection(), Vec3::new(0.0, 0.0, 0.1));
        let far = project(camera.projection(), Vec3::new(0.0, 0.0, 10.0));
        assert_abs_diff_eq!(near.z, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_matches_left_handed_glam() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(1.0, 1.5, 0.5, 100.0);
        let expected = Mat4::perspective_lh(1.0, 1.5, 0.5, 100.0);
        assert!(camera.projection().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_volume() {
        let mut camera = Camera::new();
        camera.set_orthographic_projection(-2.0, 2.0, -1.0, 1.0, -1.0, 1.0);

        let min = project(camera.projection(), Vec3::new(-2.0, -1.0, -1.0));
        let max = project(camera.projection(), Vec3::new(2.0, 1.0, 1.0));
        assert!(min.abs_diff_eq(Vec3::new(-1.0, -1.0, 0.0), 1e-6));
        assert!(max.abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), 1e-6));
    }

    #[test]
    fn test_view_direction_moves_eye_to_origin() {
        let mut camera = Camera::new();
        let eye = Vec3::new(1.0, -2.0, 3.0);
        camera.set_view_direction(eye, Vec3::Z, DEFAULT_UP);

        let view = camera.view();
        assert!(view.transform_point3(eye).abs_diff_eq(Vec3::ZERO, 1e-6));
        let ahead = view.transform_point3(eye + Vec3::Z * 4.0);
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, 4.0), 1e-6));
    }

    #[test]
    fn test_view_target_equals_view_direction() {
        let eye = Vec3::new(0.0, -1.0, -2.5);
        let target = Vec3::new(0.5, 0.0, 0.0);

        let mut a = Camera::new();
        a.set_view_target(eye, target, DEFAULT_UP);
        let mut b = Camera::new();
        b.set_view_direction(eye, target - eye, DEFAULT_UP);

        assert_eq!(a.view(), b.view());
    }

    #[test]
    fn test_view_yxz_without_rotation_is_translation() {
        let mut camera = Camera::new();
        let eye = Vec3::new(3.0, 4.0, 5.0);
        camera.set_view_yxz(eye, Vec3::ZERO);
        assert!(camera.view().abs_diff_eq(Mat4::from_translation(-eye), 1e-6));
    }

    #[test]
    fn test_view_yxz_yaw_turns_toward_positive_x() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::ZERO, Vec3::new(0.0, FRAC_PI_2, 0.0));

        // After a quarter turn of yaw, +X is straight ahead.
        let ahead = camera.view().transform_point3(Vec3::X);
        assert!(ahead.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_view_yxz_agrees_with_view_direction() {
        let mut a = Camera::new();
        a.set_view_yxz(Vec3::new(1.0, 0.0, -1.0), Vec3::new(0.0, FRAC_PI_2, 0.0));
        let mut b = Camera::new();
        b.set_view_direction(Vec3::new(1.0, 0.0, -1.0), Vec3::X, Vec3::NEG_Y);

        assert!(a.view().abs_diff_eq(b.view(), 1e-6));
    }
}
