use std::fmt;

use crate::paint::Color;

use super::programs::WgpuDevice;

/// Opaque identifier for an intermediate shader-stage object.
///
/// Stage objects only exist between compile and link; the registry deletes
/// them on every exit path of its create routine.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageHandle(pub(crate) u64);

/// Opaque identifier for a linked shader program, assigned by the device
/// at link time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

impl ProgramHandle {
    /// The raw handle value, for logging and diagnostics only.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Resolved uniform location within the bound program.
///
/// Unknown names resolve to [`UniformLocation::NONE`]; setting a value
/// through `NONE` is a silent no-op, matching the underlying graphics-API
/// convention. Callers must not rely on an error for typos.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformLocation(pub(crate) Option<u32>);

impl UniformLocation {
    pub const NONE: Self = Self(None);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0.is_none()
    }
}

/// The graphics capability the engine core calls through.
///
/// The core never touches a native GPU resource except via this trait.
/// Production code uses [`WgpuDevice`]; tests drive the registry and the
/// scene controller with scripted implementations.
pub trait GraphicsDevice {
    /// Compiles one shader stage. On failure the error string is the
    /// compiler log; no stage object is retained.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<StageHandle, String>;

    /// Links a compiled vertex/fragment pair into a program. On failure
    /// the error string is the link log; no program object is retained.
    /// The stage objects stay alive either way and must be deleted by the
    /// caller.
    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<ProgramHandle, String>;

    /// Deletes a stage object. Safe on unknown handles.
    fn delete_shader(&mut self, stage: StageHandle);

    /// Deletes a linked program. Safe on unknown handles.
    fn delete_program(&mut self, program: ProgramHandle);

    /// Installs (or clears) the program uniform operations resolve against.
    fn bind_program(&mut self, program: Option<ProgramHandle>);

    fn bound_program(&self) -> Option<ProgramHandle>;

    /// Resolves a uniform name against the bound program.
    fn uniform_location(&self, name: &str) -> UniformLocation;

    /// Writes up to four `i32` components at `location`. No-op for
    /// [`UniformLocation::NONE`] or when no program is bound.
    fn set_uniform_i32(&mut self, location: UniformLocation, values: &[i32]);

    /// Writes up to four `f32` components at `location`. No-op for
    /// [`UniformLocation::NONE`] or when no program is bound.
    fn set_uniform_f32(&mut self, location: UniformLocation, values: &[f32]);

    /// Sets the color used by the frame loop's clear pass.
    fn set_clear_color(&mut self, color: Color);

    fn clear_color(&self) -> Color;

    /// Records the drawable size draw code should configure passes with.
    fn set_viewport(&mut self, width: u32, height: u32);

    fn viewport(&self) -> (u32, u32);

    /// The concrete wgpu-backed device, when this device is one. Draw
    /// paths use this to reach shader modules and bind groups; scripted
    /// test devices return `None`.
    fn as_wgpu(&self) -> Option<&WgpuDevice> {
        None
    }
}
