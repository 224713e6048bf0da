use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Fullscreen, Window, WindowId},
};

use crate::config::RenderConfig;
use crate::error::{Result, TracewError};
use crate::frame_loop::{FrameInput, FrameLoop, LoopState};
use crate::gpu::GpuBackend;
use crate::input::{InputSystem, MouseMode};
use crate::scene::Scene;

// ======================================
// === APPLICATION ===
// ======================================

pub struct TracewApp {
    pub config: RenderConfig,
    pub input: InputSystem,
    pub frame_loop: Option<FrameLoop<GpuBackend>>,
    pub window: Option<Arc<Window>>,
    scene: Option<Scene>,
    close_requested: bool,
    setup_error: Option<TracewError>,
}

impl TracewApp {
    pub fn new(config: RenderConfig, scene: Scene) -> Self {
        Self {
            config,
            input: InputSystem::new(),
            frame_loop: None,
            window: None,
            scene: Some(scene),
            close_requested: false,
            setup_error: None,
        }
    }

    fn setup(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attributes = Window::default_attributes()
            .with_title(self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        if self.config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(event_loop.create_window(attributes)?);

        let backend = GpuBackend::new(window.clone(), self.config.present_mode)?;
        let (width, height) = (backend.config.width, backend.config.height);
        let scene = self.scene.take().unwrap_or_default();
        log::info!("Tracing {} spheres at {}x{}", scene.len(), width, height);

        if scene.is_empty() {
            log::warn!("Scene has no spheres, only the sky will be traced");
        }

        self.frame_loop = Some(FrameLoop::new(backend, scene, self.config, width, height)?);
        window.set_cursor_visible(false);
        self.window = Some(window);
        self.warp_cursor(width, height);
        Ok(())
    }

    // Parks the OS cursor on the window centre the input system measures
    // from. Falls back to a locked cursor with raw motion when the platform
    // will not warp it.
    fn warp_cursor(&mut self, width: u32, height: u32) {
        let target = self.input.warp_target(width, height);
        if self.input.mouse_mode != MouseMode::Recenter {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        if let Err(err) = window.set_cursor_position(target) {
            log::warn!("Cursor warping unavailable ({err}), using relative mouse motion");
            self.input.mouse_mode = MouseMode::Relative;
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::Locked) {
                log::warn!("Cursor lock unavailable: {err}");
            }
        }
    }

    fn gather_input(&mut self, width: u32, height: u32) -> FrameInput {
        let mouse_delta = self.input.take_mouse_delta(width, height);

        if self.input.mouse_mode == MouseMode::Recenter && mouse_delta.length_squared() > 0.0 {
            self.warp_cursor(width, height);
        }

        FrameInput {
            mouse_delta,
            keys: self.input.current_keys,
            pressed: self.input.take_pressed(),
            exit_requested: self.close_requested,
        }
    }

    pub fn update(&mut self, event_loop: &ActiveEventLoop) {
        let Some((width, height)) = self.frame_loop.as_ref().map(|fl| fl.size()) else {
            return;
        };
        let input = self.gather_input(width, height);

        let Some(frame_loop) = self.frame_loop.as_mut() else {
            return;
        };

        match frame_loop.step(&input) {
            Ok(LoopState::Running) => {}
            Ok(LoopState::Closing) => event_loop.exit(),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                frame_loop.backend_mut().reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }

        if frame_loop.state() == LoopState::Closing {
            event_loop.exit();
            return;
        }
        self.request_next_frame();
    }

    fn request_next_frame(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    pub fn take_setup_error(&mut self) -> Option<TracewError> {
        self.setup_error.take()
    }
}

impl ApplicationHandler for TracewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.setup(event_loop) {
            log::error!("Setup failed: {err}");
            self.setup_error = Some(err);
            event_loop.exit();
            return;
        }
        self.request_next_frame();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match &self.window {
            Some(window) if window.id() == id => {}
            _ => return,
        }

        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.input
                    .handle_key_input(&event.physical_key, event.state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x, position.y);
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    if let Err(err) = frame_loop.resize(physical_size.width, physical_size.height) {
                        log::error!("Resize failed: {err}");
                        self.setup_error = Some(err);
                        event_loop.exit();
                        return;
                    }
                    let (width, height) = frame_loop.size();
                    self.warp_cursor(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
                self.request_next_frame();
            }
            WindowEvent::RedrawRequested => {
                self.update(event_loop);
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.mouse_motion(delta.0, delta.1);
        }
    }
}

// ======================================
// === MAIN ENTRY POINT ===
// ======================================

pub fn run() -> Result<()> {
    run_with(RenderConfig::default(), Scene::default())
}

pub fn run_with(config: RenderConfig, scene: Scene) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TracewApp::new(config, scene);
    event_loop.run_app(&mut app)?;

    match app.take_setup_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
