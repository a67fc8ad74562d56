use crate::device::GraphicsDevice;
use crate::input::InputState;
use crate::render::RenderFrame;
use crate::scene::Scene;
use crate::shader::ShaderRegistry;
use crate::window::EngineControl;

/// Window metadata snapshot for the current callback.
#[derive(Debug, Copy, Clone)]
pub struct WindowInfo {
    /// Stored window width, tracking resize notifications.
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
}

/// Per-callback context passed to scene hooks.
///
/// This is the engine's entire surface toward scene code: the graphics
/// device capability, the shader registry, input state, window metadata,
/// buffered control commands, and (during update only) the current frame.
///
/// Commands issued through [`enter_scene`](Self::enter_scene),
/// [`clear_scene`](Self::clear_scene) and [`exit`](Self::exit) are
/// buffered and applied after the current frame; see `EngineControl`.
pub struct EngineCtx<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub shaders: &'a mut ShaderRegistry,
    pub input: &'a InputState,
    pub window: WindowInfo,
    pub control: &'a mut EngineControl,
    /// The frame being recorded. `Some` only inside `on_update`; enter and
    /// exit hooks run between frames.
    pub frame: Option<RenderFrame<'a>>,
}

impl EngineCtx<'_> {
    /// Requests a transition to `scene` after the current frame.
    pub fn enter_scene(&mut self, scene: impl Scene + 'static) {
        self.control.enter_scene(scene);
    }

    /// Requests a transition to the no-scene state after the current frame.
    pub fn clear_scene(&mut self) {
        self.control.clear_scene();
    }

    /// Requests cooperative shutdown; observed at the top of the next
    /// loop iteration.
    pub fn exit(&mut self) {
        self.control.exit();
    }
}
