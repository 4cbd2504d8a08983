//! First-person keyboard movement for the viewer object.

use std::f32::consts::TAU;

use glam::Vec3;
use renderer_core::ControlsConfig;
use renderer_platform::{InputState, KeyCode};
use renderer_scene::TransformComponent;

/// Pitch is kept inside ±this many radians so the view never flips.
const MAX_PITCH: f32 = 1.5;

/// Key bindings for [`KeyboardMovementController`].
#[derive(Clone, Copy, Debug)]
pub struct KeyMappings {
    pub move_left: KeyCode,
    pub move_right: KeyCode,
    pub move_forward: KeyCode,
    pub move_backward: KeyCode,
    pub move_up: KeyCode,
    pub move_down: KeyCode,
    pub look_left: KeyCode,
    pub look_right: KeyCode,
    pub look_up: KeyCode,
    pub look_down: KeyCode,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,
            move_forward: KeyCode::KeyW,
            move_backward: KeyCode::KeyS,
            move_up: KeyCode::Space,
            move_down: KeyCode::ShiftLeft,
            look_left: KeyCode::ArrowLeft,
            look_right: KeyCode::ArrowRight,
            look_up: KeyCode::ArrowUp,
            look_down: KeyCode::ArrowDown,
        }
    }
}

/// Moves a transform in the XZ plane and turns it with the arrow keys.
#[derive(Clone, Copy, Debug)]
pub struct KeyboardMovementController {
    pub keys: KeyMappings,
    /// Units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub look_speed: f32,
}

impl KeyboardMovementController {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            keys: KeyMappings::default(),
            move_speed: config.move_speed,
            look_speed: config.look_speed,
        }
    }

    /// Applies one frame of input held for `dt` seconds to `transform`.
    pub fn move_in_plane_xz(&self, input: &InputState, dt: f32, transform: &mut TransformComponent) {
        let axis = |positive: KeyCode, negative: KeyCode| {
            let mut value = 0.0;
            if input.is_key_pressed(positive) {
                value += 1.0;
            }
            if input.is_key_pressed(negative) {
                value -= 1.0;
            }
            value
        };

        let rotate = Vec3::new(
            axis(self.keys.look_up, self.keys.look_down),
            axis(self.keys.look_right, self.keys.look_left),
            0.0,
        );
        if rotate.length_squared() > f32::EPSILON {
            transform.rotation += self.look_speed * dt * rotate.normalize();
        }

        transform.rotation.x = transform.rotation.x.clamp(-MAX_PITCH, MAX_PITCH);
        transform.rotation.y = transform.rotation.y.rem_euclid(TAU);

        let yaw = transform.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);
        let up = Vec3::NEG_Y;

        let move_dir = forward * axis(self.keys.move_forward, self.keys.move_backward)
            + right * axis(self.keys.move_right, self.keys.move_left)
            + up * axis(self.keys.move_up, self.keys.move_down);
        if move_dir.length_squared() > f32::EPSILON {
            transform.translation += self.move_speed * dt * move_dir.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn controller() -> KeyboardMovementController {
        KeyboardMovementController::new(&ControlsConfig::default())
    }

    fn pressed(keys: &[KeyCode]) -> InputState {
        let mut input = InputState::new();
        for &key in keys {
            input.on_key_pressed(key);
        }
        input
    }

    #[test]
    fn test_no_input_leaves_transform_alone() {
        let mut transform = TransformComponent::new().with_translation(Vec3::new(1.0, 2.0, 3.0));
        controller().move_in_plane_xz(&InputState::new(), 0.5, &mut transform);
        assert_eq!(transform, TransformComponent::new().with_translation(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_forward_follows_yaw() {
        let c = controller();

        let mut transform = TransformComponent::new();
        c.move_in_plane_xz(&pressed(&[KeyCode::KeyW]), 1.0, &mut transform);
        assert!(transform.translation.abs_diff_eq(Vec3::new(0.0, 0.0, c.move_speed), 1e-5));

        let mut turned = TransformComponent::new().with_rotation(Vec3::new(0.0, FRAC_PI_2, 0.0));
        c.move_in_plane_xz(&pressed(&[KeyCode::KeyW]), 1.0, &mut turned);
        assert!(turned.translation.abs_diff_eq(Vec3::new(c.move_speed, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_space_moves_toward_negative_y() {
        let c = controller();
        let mut transform = TransformComponent::new();
        c.move_in_plane_xz(&pressed(&[KeyCode::Space]), 0.5, &mut transform);
        assert_abs_diff_eq!(transform.translation.y, -0.5 * c.move_speed, epsilon = 1e-6);
    }

    #[test]
    fn test_diagonal_movement_is_normalized() {
        let c = controller();
        let mut transform = TransformComponent::new();
        c.move_in_plane_xz(&pressed(&[KeyCode::KeyW, KeyCode::KeyD]), 1.0, &mut transform);
        assert_abs_diff_eq!(transform.translation.length(), c.move_speed, epsilon = 1e-5);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut transform = TransformComponent::new();
        controller().move_in_plane_xz(
            &pressed(&[KeyCode::KeyA, KeyCode::KeyD, KeyCode::ArrowUp, KeyCode::ArrowDown]),
            1.0,
            &mut transform,
        );
        assert_eq!(transform, TransformComponent::new());
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut transform = TransformComponent::new();
        let input = pressed(&[KeyCode::ArrowUp]);
        for _ in 0..100 {
            controller().move_in_plane_xz(&input, 0.1, &mut transform);
        }
        assert_abs_diff_eq!(transform.rotation.x, MAX_PITCH);
    }

    #[test]
    fn test_yaw_wraps_into_full_turn() {
        let mut transform = TransformComponent::new();
        controller().move_in_plane_xz(&pressed(&[KeyCode::ArrowLeft]), 1.0, &mut transform);
        assert!(transform.rotation.y >= 0.0 && transform.rotation.y < TAU);
        assert_abs_diff_eq!(transform.rotation.y, TAU - controller().look_speed, epsilon = 1e-5);
    }
}
