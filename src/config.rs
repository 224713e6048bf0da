use glam::Vec3;

// === CONSTANTS ===
pub const WINDOW_TITLE: &str = "tracew";
// Used when not fullscreen, or when the monitor reports no video mode.
pub const DIMX: u32 = 1280;
pub const DIMY: u32 = 720;
pub const FULLSCREEN: bool = true;
pub const CAMERA_MOVE_SPEED: f32 = 500.0;
pub const MOUSE_SENSITIVITY: f32 = 2.0;
pub const SPRINT_MULTIPLIER: f32 = 2.0;
pub const CAMERA_START_POSITION: Vec3 = Vec3::new(0.0, 0.0, -500.0);
pub const CAMERA_START_TARGET: Vec3 = Vec3::new(0.0, -200.0, 0.0);
// Must match the array length in shaders/trace.wgsl.
pub const MAX_SPHERES: usize = 16;
pub const STATS_UPDATE_INTERVAL: f32 = 0.75; // Seconds between stats log lines
pub const STATS_WINDOW: usize = 60;

/// Runtime knobs of the renderer, seeded from the constants above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub title: &'static str,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub present_mode: wgpu::PresentMode,
    pub log_stats: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: WINDOW_TITLE,
            width: DIMX,
            height: DIMY,
            fullscreen: FULLSCREEN,
            camera_speed: CAMERA_MOVE_SPEED,
            mouse_sensitivity: MOUSE_SENSITIVITY,
            camera_position: CAMERA_START_POSITION,
            camera_target: CAMERA_START_TARGET,
            present_mode: wgpu::PresentMode::AutoVsync,
            log_stats: true,
        }
    }
}
