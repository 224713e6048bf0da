use glam::{Vec2, Vec3};

use crate::config::SPRINT_MULTIPLIER;
use crate::input::InputFlags;

pub const WORLD_UP: Vec3 = Vec3::Y;

/// Free-flying camera: a position plus an orthonormal basis.
///
/// `up` and `right` are always derived from `forward`. A forward vector
/// parallel to `WORLD_UP` leaves the basis degenerate; this is not guarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
}

impl CameraState {
    pub fn look_at(position: Vec3, target: Vec3) -> Self {
        let forward = (target - position).normalize();
        let (up, right) = basis_from_forward(forward);
        Self {
            position,
            forward,
            up,
            right,
        }
    }

    /// Applies one frame of mouse look and key translation.
    ///
    /// `mouse_delta` is the pixel offset from the window centre with y up.
    /// Returns whether the camera moved at all.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        mouse_delta: Vec2,
        keys: InputFlags,
        _width: u32,
        height: u32,
        speed: f32,
        sensitivity: f32,
        dt: f32,
    ) -> bool {
        let mut moved = false;

        if mouse_delta.length_squared() > 0.0 {
            let delta = mouse_delta * (2.0 / height as f32 * sensitivity);
            self.forward = (self.forward + delta.x * self.right + delta.y * self.up).normalize();
            (self.up, self.right) = basis_from_forward(self.forward);
            moved = true;
        }

        if !keys.intersects(InputFlags::MOVEMENT) {
            return moved;
        }

        let mut change = Vec3::ZERO;
        if keys.contains(InputFlags::W) {
            change += self.forward;
        }
        if keys.contains(InputFlags::S) {
            change -= self.forward;
        }
        if keys.contains(InputFlags::A) {
            change -= self.right;
        }
        if keys.contains(InputFlags::D) {
            change += self.right;
        }
        if keys.contains(InputFlags::E) {
            change += self.up;
        }
        if keys.contains(InputFlags::Q) {
            change -= self.up;
        }

        let speed = if keys.intersects(InputFlags::SPRINT) {
            speed * SPRINT_MULTIPLIER
        } else {
            speed
        };

        if change.length_squared() > 0.0 {
            self.position += change.normalize() * speed * dt;
            moved = true;
        }

        moved
    }
}

/// Returns `(up, right)` for the given unit forward vector.
pub fn basis_from_forward(forward: Vec3) -> (Vec3, Vec3) {
    let right = forward.cross(WORLD_UP).normalize();
    let up = right.cross(forward).normalize();
    (up, right)
}
