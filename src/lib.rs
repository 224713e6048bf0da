//! Progressive sphere path tracer with a free-flying camera.
//!
//! A fullscreen trace pass refines a per-pixel running mean stored in a pair
//! of ping-pong float targets. Any camera motion invalidates that history and
//! accumulation restarts from zero.

pub mod accumulation;
pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod input;
pub mod scene;
pub mod timer;

pub use accumulation::{AccumulationBuffers, TargetAllocator};
pub use app::{run, run_with, TracewApp};
pub use camera::CameraState;
pub use config::RenderConfig;
pub use error::{Result, TracewError};
pub use frame_loop::{FrameInput, FrameLoop, LoopState, RenderBackend, TraceUniforms};
pub use scene::{Scene, Sphere};
pub use timer::FrameTimer;
