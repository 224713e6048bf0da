use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::accumulation::{AccumulationBuffers, TargetAllocator};
use crate::camera::CameraState;
use crate::config::{RenderConfig, STATS_UPDATE_INTERVAL, STATS_WINDOW};
use crate::error::Result;
use crate::input::InputFlags;
use crate::scene::Scene;
use crate::timer::FrameTimer;

// ======================================
// === SHADER DATA STRUCTURES ===
// ======================================

// vec3 + scalar pairs pack into 16-byte rows on the WGSL side.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct TraceUniforms {
    pub camera_position: [f32; 3],
    pub frame_count: u32,
    pub camera_forward: [f32; 3],
    pub _padding0: f32,
    pub camera_up: [f32; 3],
    pub _padding1: f32,
    pub camera_right: [f32; 3],
    pub _padding2: f32,
    pub resolution: [f32; 2],
    pub _padding3: [f32; 2],
}

impl TraceUniforms {
    pub fn new(camera: &CameraState, width: u32, height: u32, frame_count: u32) -> Self {
        Self {
            camera_position: camera.position.to_array(),
            frame_count,
            camera_forward: camera.forward.to_array(),
            _padding0: 0.0,
            camera_up: camera.up.to_array(),
            _padding1: 0.0,
            camera_right: camera.right.to_array(),
            _padding2: 0.0,
            resolution: [width as f32, height as f32],
            _padding3: [0.0; 2],
        }
    }
}

// ======================================
// === BACKEND SEAM ===
// ======================================

/// The GPU work the frame loop drives.
pub trait RenderBackend: TargetAllocator {
    type Error: std::fmt::Debug;

    /// Runs the trace program into `output`, reading `history` as the
    /// previous estimate.
    fn trace(
        &mut self,
        uniforms: &TraceUniforms,
        scene: &Scene,
        history: &Self::Target,
        output: &Self::Target,
    );

    /// Copies `source` to the visible surface and presents it.
    fn present(&mut self, source: &Self::Target) -> std::result::Result<(), Self::Error>;

    fn resize_surface(&mut self, width: u32, height: u32);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Closing,
}

/// Input gathered by the window layer for one iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub mouse_delta: Vec2,
    pub keys: InputFlags,
    /// Keys that went down since the previous frame.
    pub pressed: InputFlags,
    pub exit_requested: bool,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            mouse_delta: Vec2::ZERO,
            keys: InputFlags::empty(),
            pressed: InputFlags::empty(),
            exit_requested: false,
        }
    }
}

pub struct FrameStats {
    pub frame_times: [f32; STATS_WINDOW],
    pub frame_index: usize,
    pub filled: usize,
    pub update_timer: f32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            frame_times: [0.0; STATS_WINDOW],
            frame_index: 0,
            filled: 0,
            update_timer: 0.0,
        }
    }
}

impl FrameStats {
    /// Records one frame time. Returns `(fps, avg_frame_time)` once per
    /// `STATS_UPDATE_INTERVAL`.
    pub fn record(&mut self, dt: f32) -> Option<(f32, f32)> {
        self.frame_times[self.frame_index] = dt;
        self.frame_index = (self.frame_index + 1) % STATS_WINDOW;
        self.filled = (self.filled + 1).min(STATS_WINDOW);
        self.update_timer += dt;

        if self.update_timer < STATS_UPDATE_INTERVAL {
            return None;
        }
        self.update_timer = 0.0;

        let avg_frame_time = self.frame_times[..self.filled].iter().sum::<f32>() / self.filled as f32;
        if avg_frame_time <= 0.0 {
            return None;
        }
        Some((1.0 / avg_frame_time, avg_frame_time))
    }
}

// ======================================
// === FRAME LOOP ===
// ======================================

/// Owns everything that persists across frames and runs one iteration at a
/// time.
pub struct FrameLoop<B: RenderBackend> {
    backend: B,
    buffers: AccumulationBuffers<B::Target>,
    camera: CameraState,
    scene: Scene,
    timer: FrameTimer,
    config: RenderConfig,
    stats: FrameStats,
    state: LoopState,
}

impl<B: RenderBackend> FrameLoop<B> {
    pub fn new(mut backend: B, scene: Scene, config: RenderConfig, width: u32, height: u32) -> Result<Self> {
        let buffers = AccumulationBuffers::allocate(&mut backend, width, height)?;
        let camera = CameraState::look_at(config.camera_position, config.camera_target);

        Ok(Self {
            backend,
            buffers,
            camera,
            scene,
            timer: FrameTimer::new(),
            config,
            stats: FrameStats::default(),
            state: LoopState::Running,
        })
    }

    /// Runs one iteration, sampling `dt` from the frame timer.
    ///
    /// A presentation error is returned after the iteration completes; the
    /// trace pass has still run, so accumulation state stays consistent.
    pub fn step(&mut self, input: &FrameInput) -> std::result::Result<LoopState, B::Error> {
        if self.state == LoopState::Closing {
            return Ok(LoopState::Closing);
        }
        let dt = self.timer.reset();
        self.step_with_dt(dt, input)
    }

    pub(crate) fn step_with_dt(&mut self, dt: f32, input: &FrameInput) -> std::result::Result<LoopState, B::Error> {
        if self.state == LoopState::Closing {
            return Ok(LoopState::Closing);
        }
        let (width, height) = self.buffers.size();

        let moved = self.camera.update(
            input.mouse_delta,
            input.keys,
            width,
            height,
            self.config.camera_speed,
            self.config.mouse_sensitivity,
            dt,
        );

        let uniforms = TraceUniforms::new(&self.camera, width, height, self.buffers.frame_count());
        self.backend.trace(
            &uniforms,
            &self.scene,
            self.buffers.current_read_source(),
            self.buffers.current_write_target(),
        );
        let presented = self.backend.present(self.buffers.current_write_target());

        self.buffers.advance_frame();

        if moved || input.pressed.contains(InputFlags::R) {
            self.buffers.reset(&mut self.backend);
            log::debug!("Accumulation reset ({})", if moved { "camera moved" } else { "requested" });
        }

        if input.pressed.contains(InputFlags::P) {
            self.timer.toggle_pause();
            log::info!("Frame timer {}", if self.timer.is_paused() { "paused" } else { "resumed" });
        }

        if input.exit_requested || input.pressed.contains(InputFlags::ESC) {
            self.state = LoopState::Closing;
            log::info!("Closing after {} accumulated samples", self.buffers.frame_count());
        }

        if self.config.log_stats {
            if let Some((fps, avg_frame_time)) = self.stats.record(dt) {
                log::info!(
                    "FPS: {:.1}, Frame: {:.2}ms, Samples: {}",
                    fps,
                    avg_frame_time * 1000.0,
                    self.buffers.frame_count()
                );
            }
        }

        presented.map(|_| self.state)
    }

    /// Re-creates the surface and both history targets at the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 || (width, height) == self.buffers.size() {
            return Ok(());
        }
        self.backend.resize_surface(width, height);
        self.buffers.reallocate(&mut self.backend, width, height)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn buffers(&self) -> &AccumulationBuffers<B::Target> {
        &self.buffers
    }

    pub fn size(&self) -> (u32, u32) {
        self.buffers.size()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}
