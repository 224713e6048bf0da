//! Crate-wide error type.
//!
//! Everything here is a setup failure: once the window, device, programs and
//! accumulation targets exist, the frame loop itself has nothing that can fail
//! except surface acquisition, which the app handles per frame.

#[derive(thiserror::Error, Debug)]
pub enum TracewError {
    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("No suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("Device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Surface is not supported by the selected adapter")]
    UnsupportedSurface,

    #[error("Shader program '{label}' failed to build: {message}")]
    Shader { label: &'static str, message: String },

    #[error("Render target '{label}' is incomplete: {message}")]
    IncompleteTarget { label: String, message: String },

    #[error("Invalid scene: {0}")]
    Scene(String),
}

impl TracewError {
    pub fn scene<T: ToString>(msg: T) -> Self {
        TracewError::Scene(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TracewError>;
