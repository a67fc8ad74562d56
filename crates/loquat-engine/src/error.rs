use thiserror::Error;

use crate::device::ShaderStage;

/// Fatal bootstrap failures.
///
/// Surfaced synchronously from `Engine::run` before the frame loop starts;
/// never retried internally. No partially initialized window or device is
/// reachable after one of these.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Recoverable shader build failures from `ShaderRegistry::create`.
///
/// Neither variant leaves a partial program registered; intermediate
/// stage objects are released before the error is returned. Callers may
/// retry with corrected source.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader: {log}")]
    Compile {
        stage: ShaderStage,
        log: String,
        /// The rejected source, kept for diagnostics.
        rejected_source: String,
    },

    #[error("failed to link shader program: {log}")]
    Link { log: String },
}

impl ShaderError {
    /// The stage a compile failure was raised for, if this is one.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            ShaderError::Compile { stage, .. } => Some(*stage),
            ShaderError::Link { .. } => None,
        }
    }
}
