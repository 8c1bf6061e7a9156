//! First-person fly camera.
//!
//! Yaw/pitch Euler angles driven by relative mouse motion, WASD-style
//! translation along the view axes. All angles are in degrees.

use nalgebra::{Matrix4, Point3, Unit, Vector3};

const MOVE_SPEED: f32 = 5.0;
const MOUSE_SENSITIVITY: f32 = 0.1;
const PITCH_LIMIT: f32 = 89.0;

/// Movement intents the input layer can feed the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// A free-flying camera.
pub struct FlyCamera {
    position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    // Relative mouse motion needs a previous sample; the first one is
    // swallowed so the camera does not jump to the initial cursor position.
    last_cursor: Option<(f32, f32)>,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, -16.0),
            front: Vector3::new(0.0, 0.0, 1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            yaw: 90.0,
            pitch: 0.0,
            last_cursor: None,
        }
    }
}

impl FlyCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current eye position.
    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Normalized view direction.
    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    /// Heading in degrees, wrapped to [0, 360).
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Right-handed view matrix looking along the front vector.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &(self.position + self.front), &self.up)
    }

    /// Translate along the view axes, scaled by frame time.
    pub fn process_movement(&mut self, movement: CameraMovement, delta_time: f32) {
        let velocity = MOVE_SPEED * delta_time;
        let right = Unit::new_normalize(self.front.cross(&self.up));
        match movement {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= right.into_inner() * velocity,
            CameraMovement::Right => self.position += right.into_inner() * velocity,
        }
    }

    /// Turn the camera from an absolute cursor position.
    pub fn process_cursor(&mut self, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last_cursor.replace((x, y)) else {
            return;
        };

        // Screen y grows downward, pitch grows upward
        let dx = (x - last_x) * MOUSE_SENSITIVITY;
        let dy = (last_y - y) * MOUSE_SENSITIVITY;

        self.yaw = (self.yaw + dx).rem_euclid(360.0);
        self.pitch = (self.pitch + dy).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        self.front = Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_behind_origin_looking_forward() {
        let camera = FlyCamera::new();
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, -16.0));
        assert_relative_eq!(camera.front(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn first_cursor_sample_does_not_turn() {
        let mut camera = FlyCamera::new();
        let before = camera.front();
        camera.process_cursor(400.0, 300.0);
        assert_relative_eq!(camera.front(), before);
    }

    #[test]
    fn cursor_motion_turns_after_first_sample() {
        let mut camera = FlyCamera::new();
        camera.process_cursor(0.0, 0.0);
        camera.process_cursor(100.0, 0.0);
        assert!(camera.front() != Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = FlyCamera::new();
        camera.process_cursor(0.0, 0.0);
        // Drag far upward; pitch must stop short of vertical
        camera.process_cursor(0.0, -10_000.0);
        assert!(camera.front().y < 1.0);
        assert!(camera.front().y > 0.99);
    }

    #[test]
    fn yaw_wraps_into_positive_range() {
        let mut camera = FlyCamera::new();
        camera.process_cursor(0.0, 0.0);
        // Turning left past zero: 90 - 200 degrees lands at 250, not -110
        camera.process_cursor(-2000.0, 0.0);
        assert!(camera.yaw() >= 0.0 && camera.yaw() < 360.0);
        assert_relative_eq!(camera.yaw(), 250.0, epsilon = 1e-4);
    }

    #[test]
    fn forward_movement_scales_with_frame_time() {
        let mut camera = FlyCamera::new();
        camera.process_movement(CameraMovement::Forward, 0.5);
        assert_relative_eq!(
            camera.position(),
            Point3::new(0.0, 0.0, -13.5),
            epsilon = 1e-5
        );
    }

    #[test]
    fn strafing_moves_perpendicular_to_front() {
        let mut camera = FlyCamera::new();
        camera.process_movement(CameraMovement::Right, 1.0);
        let displacement = camera.position() - Point3::new(0.0, 0.0, -16.0);
        assert_relative_eq!(displacement.dot(&camera.front()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(displacement.norm(), 5.0, epsilon = 1e-5);
    }
}
