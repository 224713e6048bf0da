use bitflags::bitflags;
use glam::Vec2;
use winit::dpi::PhysicalPosition;
use winit::keyboard::{KeyCode, PhysicalKey};

// ====================
// === INPUT SYSTEM ===
// ====================

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InputFlags: u32 {
        const W = 1 << 0;
        const A = 1 << 1;
        const S = 1 << 2;
        const D = 1 << 3;
        const Q = 1 << 4;
        const E = 1 << 5;
        const LEFT_SHIFT = 1 << 6;
        const RIGHT_SHIFT = 1 << 7;
        const ESC = 1 << 8;
        const P = 1 << 9; // Pause the frame timer
        const R = 1 << 10; // Restart accumulation
        const MOVEMENT = Self::W.bits() | Self::A.bits() | Self::S.bits() | Self::D.bits() | Self::Q.bits() | Self::E.bits();
        const SPRINT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
    }
}

impl InputFlags {
    pub fn from_physical_key(physical_key: &PhysicalKey) -> Option<Self> {
        match physical_key {
            PhysicalKey::Code(KeyCode::KeyW) => Some(InputFlags::W),
            PhysicalKey::Code(KeyCode::KeyA) => Some(InputFlags::A),
            PhysicalKey::Code(KeyCode::KeyS) => Some(InputFlags::S),
            PhysicalKey::Code(KeyCode::KeyD) => Some(InputFlags::D),
            PhysicalKey::Code(KeyCode::KeyQ) => Some(InputFlags::Q),
            PhysicalKey::Code(KeyCode::KeyE) => Some(InputFlags::E),
            PhysicalKey::Code(KeyCode::ShiftLeft) => Some(InputFlags::LEFT_SHIFT),
            PhysicalKey::Code(KeyCode::ShiftRight) => Some(InputFlags::RIGHT_SHIFT),
            PhysicalKey::Code(KeyCode::Escape) => Some(InputFlags::ESC),
            PhysicalKey::Code(KeyCode::KeyP) => Some(InputFlags::P),
            PhysicalKey::Code(KeyCode::KeyR) => Some(InputFlags::R),
            _ => None,
        }
    }
}

/// How the mouse delta is obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseMode {
    /// Cursor is warped back to the window centre after every non-zero read.
    Recenter,
    /// Platform refuses cursor warping; raw device motion is summed instead.
    Relative,
}

pub struct InputSystem {
    pub current_keys: InputFlags,
    // Down edges seen since the last `take_pressed`, so a tap between frames is kept.
    pending_pressed: InputFlags,
    pub mouse_pos: Vec2,
    pub mouse_mode: MouseMode,
    relative_motion: Vec2,
}

impl InputSystem {
    pub fn new() -> Self {
        Self {
            current_keys: InputFlags::empty(),
            pending_pressed: InputFlags::empty(),
            mouse_pos: Vec2::ZERO,
            mouse_mode: MouseMode::Recenter,
            relative_motion: Vec2::ZERO,
        }
    }

    pub fn handle_key_input(&mut self, physical_key: &PhysicalKey, pressed: bool) {
        if let Some(flag) = InputFlags::from_physical_key(physical_key) {
            if pressed && !self.current_keys.contains(flag) {
                self.pending_pressed |= flag;
            }
            self.current_keys.set(flag, pressed);
        }
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.mouse_pos = Vec2::new(x as f32, y as f32);
    }

    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.mouse_mode == MouseMode::Relative {
            self.relative_motion += Vec2::new(dx as f32, dy as f32);
        }
    }

    /// Places the tracked cursor on the window centre, matching a warp.
    pub fn recenter(&mut self, width: u32, height: u32) {
        self.mouse_pos = window_center(width, height);
    }

    /// Recentres the tracked cursor and returns where the OS cursor must be
    /// warped so the two agree.
    pub fn warp_target(&mut self, width: u32, height: u32) -> PhysicalPosition<u32> {
        self.recenter(width, height);
        PhysicalPosition::new(width / 2, height / 2)
    }

    /// Pixel offset of the cursor from the window centre, x right and y up.
    ///
    /// In `Recenter` mode the caller must warp the cursor when the result is
    /// non-zero; the tracked position is moved to the centre here.
    pub fn take_mouse_delta(&mut self, width: u32, height: u32) -> Vec2 {
        let raw = match self.mouse_mode {
            MouseMode::Recenter => {
                let raw = self.mouse_pos - window_center(width, height);
                if raw != Vec2::ZERO {
                    self.recenter(width, height);
                }
                raw
            }
            MouseMode::Relative => std::mem::take(&mut self.relative_motion),
        };
        Vec2::new(raw.x, -raw.y)
    }

    /// Keys that went down since the last call, including ones already released.
    pub fn take_pressed(&mut self) -> InputFlags {
        std::mem::replace(&mut self.pending_pressed, InputFlags::empty())
    }
}

impl Default for InputSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn window_center(width: u32, height: u32) -> Vec2 {
    // Integer halves, as the cursor is warped to whole pixels.
    Vec2::new((width / 2) as f32, (height / 2) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_movement_and_control_keys() {
        let mut input = InputSystem::new();
        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyW), true);
        input.handle_key_input(&PhysicalKey::Code(KeyCode::ShiftRight), true);
        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyZ), true);

        assert!(input.current_keys.contains(InputFlags::W));
        assert!(input.current_keys.intersects(InputFlags::SPRINT));
        assert_eq!(input.current_keys, InputFlags::W | InputFlags::RIGHT_SHIFT);

        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyW), false);
        assert_eq!(input.current_keys, InputFlags::RIGHT_SHIFT);
    }

    #[test]
    fn delta_is_offset_from_center_with_y_up() {
        let mut input = InputSystem::new();
        input.recenter(1920, 1080);
        input.cursor_moved(1010.0, 500.0);

        assert_eq!(input.take_mouse_delta(1920, 1080), Vec2::new(50.0, 40.0));
        // Consumed: the cursor is considered recentred.
        assert_eq!(input.take_mouse_delta(1920, 1080), Vec2::ZERO);
    }

    #[test]
    fn relative_mode_sums_device_motion() {
        let mut input = InputSystem::new();
        input.mouse_mode = MouseMode::Relative;
        input.mouse_motion(3.0, 1.0);
        input.mouse_motion(2.0, -4.0);

        assert_eq!(input.take_mouse_delta(800, 600), Vec2::new(5.0, 3.0));
        assert_eq!(input.take_mouse_delta(800, 600), Vec2::ZERO);
    }

    #[test]
    fn pressed_edges_fire_once() {
        let mut input = InputSystem::new();
        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyP), true);

        assert_eq!(input.take_pressed(), InputFlags::P);
        assert_eq!(input.take_pressed(), InputFlags::empty());
    }

    #[test]
    fn tap_between_frames_is_not_lost() {
        let mut input = InputSystem::new();
        input.handle_key_input(&PhysicalKey::Code(KeyCode::Escape), true);
        input.handle_key_input(&PhysicalKey::Code(KeyCode::Escape), false);

        assert!(input.current_keys.is_empty());
        assert_eq!(input.take_pressed(), InputFlags::ESC);
        assert_eq!(input.take_pressed(), InputFlags::empty());
    }

    #[test]
    fn key_repeat_does_not_fire_again() {
        let mut input = InputSystem::new();
        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyR), true);
        assert_eq!(input.take_pressed(), InputFlags::R);

        // Held key: the OS repeats the press event.
        input.handle_key_input(&PhysicalKey::Code(KeyCode::KeyR), true);
        assert_eq!(input.take_pressed(), InputFlags::empty());
    }

    #[test]
    fn warp_target_matches_tracked_center_after_resize() {
        let mut input = InputSystem::new();
        let first = input.warp_target(1280, 720);
        assert_eq!(first, PhysicalPosition::new(640, 360));

        let target = input.warp_target(1920, 1080);
        assert_eq!(target, PhysicalPosition::new(960, 540));

        // The cursor reported at the warp target reads as no motion.
        input.cursor_moved(target.x as f64, target.y as f64);
        assert_eq!(input.take_mouse_delta(1920, 1080), Vec2::ZERO);
    }
}
