use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::core::{EngineCtx, WindowInfo};
use crate::device::{Gpu, GraphicsDevice, SurfaceErrorAction, WgpuDevice};
use crate::error::InitError;
use crate::input::InputState;
use crate::render::RenderFrame;
use crate::scene::{Scene, SceneController};
use crate::shader::ShaderRegistry;
use crate::time::FrameClock;

use super::config::WindowConfig;

/// Buffered engine commands.
///
/// Scene transitions and exit requests raised inside callbacks are
/// applied after the current frame, so a hook never observes the engine
/// mid-transition.
#[derive(Default)]
pub struct EngineControl {
    commands: Vec<Command>,
}

pub(crate) enum Command {
    EnterScene(Option<Box<dyn Scene>>),
    Exit,
}

impl EngineControl {
    pub fn enter_scene(&mut self, scene: impl Scene + 'static) {
        self.commands.push(Command::EnterScene(Some(Box::new(scene))));
    }

    pub fn clear_scene(&mut self) {
        self.commands.push(Command::EnterScene(None));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

/// Engine entry point.
///
/// Owns the configuration and the pre-run command queue; `run` blocks on
/// the frame loop until cooperative shutdown, then tears everything down
/// in dependency order and returns.
pub struct Engine {
    config: WindowConfig,
    control: EngineControl,
}

impl Engine {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            control: EngineControl::default(),
        }
    }

    /// Queues a scene transition applied right after bootstrap. May be
    /// called more than once; transitions run in call order, each previous
    /// scene receiving its exit notification.
    pub fn enter_scene(&mut self, scene: impl Scene + 'static) {
        self.control.enter_scene(scene);
    }

    /// Runs the frame loop until the window is closed or a scene requests
    /// exit. Bootstrap failures surface here; nothing partial stays alive.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = EngineState::new(self.config, self.control);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

/// The window, its graphics context, and the device state bound to it.
/// Exists from successful bootstrap until shutdown.
struct Shell {
    window: Arc<Window>,
    gpu: Gpu,
    device: WgpuDevice,
}

struct EngineState {
    config: WindowConfig,
    control: EngineControl,
    controller: SceneController,
    shaders: ShaderRegistry,
    input: InputState,
    clock: FrameClock,
    shell: Option<Shell>,
    exit_requested: bool,
    init_error: Option<InitError>,
}

impl EngineState {
    fn new(config: WindowConfig, control: EngineControl) -> Self {
        Self {
            config,
            control,
            controller: SceneController::new(),
            shaders: ShaderRegistry::new(),
            input: InputState::default(),
            clock: FrameClock::new(),
            shell: None,
            exit_requested: false,
            init_error: None,
        }
    }

    fn bootstrap(&mut self, event_loop: &ActiveEventLoop) -> Result<(), InitError> {
        let mut attrs = self.config.window_attributes();
        if self.config.fullscreen {
            match event_loop.primary_monitor() {
                Some(monitor) => {
                    attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
                }
                None => log::warn!(
                    "fullscreen requested but no primary monitor is available; staying windowed"
                ),
            }
        }

        let window = Arc::new(event_loop.create_window(attrs)?);
        if !self.config.fullscreen {
            center_on_primary(event_loop, &window);
        }

        let gpu = pollster::block_on(Gpu::new(window.clone(), self.config.gpu_init()))?;
        let info = gpu.adapter_info();
        log::info!("graphics adapter: {} ({:?})", info.name, info.backend);

        let mut device = WgpuDevice::new(gpu.device().clone(), gpu.queue().clone());
        device.set_clear_color(self.config.background);
        let size = gpu.size();
        device.set_viewport(size.width, size.height);
        self.config.width = size.width;
        self.config.height = size.height;

        // Show only once the context is fully configured, so no
        // unconfigured frame flashes.
        window.set_visible(true);
        window.request_redraw();

        self.clock.reset();
        self.shell = Some(Shell {
            window,
            gpu,
            device,
        });
        Ok(())
    }

    /// Applies buffered commands between frames. Commands queued by the
    /// transitions themselves stay buffered for the next round.
    fn apply_commands(&mut self) {
        if self.control.is_empty() {
            return;
        }
        let commands = self.control.take();

        let Some(shell) = self.shell.as_mut() else {
            return;
        };
        let window = WindowInfo {
            width: self.config.width,
            height: self.config.height,
            scale_factor: shell.window.scale_factor(),
        };
        let mut ctx = EngineCtx {
            device: &mut shell.device,
            shaders: &mut self.shaders,
            input: &self.input,
            window,
            control: &mut self.control,
            frame: None,
        };

        for command in commands {
            match command {
                Command::EnterScene(next) => self.controller.enter(next, &mut ctx),
                Command::Exit => self.exit_requested = true,
            }
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let Some(shell) = self.shell.as_mut() else {
            return;
        };
        // Repeat notifications with unchanged dimensions leave both the
        // stored size and the surface configuration untouched.
        if new_size == shell.gpu.size() {
            return;
        }
        shell.gpu.resize(new_size);
        shell.device.set_viewport(new_size.width, new_size.height);
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        log::trace!("resized to {}x{}", new_size.width, new_size.height);
    }

    /// One loop iteration: clear, elapsed time, scene update, present.
    fn frame(&mut self) {
        // Termination is observed once, at the top of the iteration.
        if self.exit_requested {
            return;
        }
        let Some(shell) = self.shell.as_mut() else {
            return;
        };

        let mut frame = match shell.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                if shell.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                    log::error!("fatal surface error; shutting down");
                    self.exit_requested = true;
                }
                return;
            }
        };

        // Clear the color buffer. Always the iteration's first graphics
        // side effect.
        let clear = shell.device.clear_color().to_wgpu();
        {
            let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("loquat clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let time = self.clock.tick();

        let scale_factor = shell.window.scale_factor();
        let format = shell.gpu.surface_format();
        let size = shell.gpu.size();
        let window = WindowInfo {
            width: self.config.width,
            height: self.config.height,
            scale_factor,
        };
        {
            let render = RenderFrame {
                encoder: &mut frame.encoder,
                view: &frame.view,
                format,
                size,
            };
            let mut ctx = EngineCtx {
                device: &mut shell.device,
                shaders: &mut self.shaders,
                input: &self.input,
                window,
                control: &mut self.control,
                frame: Some(render),
            };
            self.controller.update(&mut ctx, time);
        }

        shell.window.pre_present_notify();
        shell.gpu.submit(frame);

        // Transitions and exit requests raised during the update apply
        // between frames; winit polls pending events before the next one.
        self.apply_commands();
    }

    /// Tears the engine down in dependency order. Idempotent.
    fn shutdown(&mut self) {
        let Some(mut shell) = self.shell.take() else {
            return;
        };

        // The last active scene always observes its exit notification.
        let window = WindowInfo {
            width: self.config.width,
            height: self.config.height,
            scale_factor: shell.window.scale_factor(),
        };
        {
            let mut ctx = EngineCtx {
                device: &mut shell.device,
                shaders: &mut self.shaders,
                input: &self.input,
                window,
                control: &mut self.control,
                frame: None,
            };
            self.controller.enter(None, &mut ctx);
        }

        // GPU resources are released while the context is still live.
        self.shaders.destroy_all(&mut shell.device);

        // Device state first, then the surface, then the window itself.
        let Shell {
            window,
            gpu,
            device,
        } = shell;
        drop(device);
        drop(gpu);
        drop(window);
        log::debug!("engine shut down");
    }

    fn finish(mut self) -> Result<()> {
        // The loop normally tears down before exiting; this covers
        // abnormal exits.
        self.shutdown();
        if let Some(err) = self.init_error.take() {
            return Err(err.into());
        }
        Ok(())
    }
}

impl ApplicationHandler for EngineState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.shell.is_some() {
            return;
        }
        match self.bootstrap(event_loop) {
            Ok(()) => self.apply_commands(),
            Err(e) => {
                log::error!("engine bootstrap failed: {e}");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            self.shutdown();
            event_loop.exit();
            return;
        }

        // Continuous redraw with a non-blocking event poll.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(shell) = self.shell.as_ref() {
            shell.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            return;
        }
        let Some(id) = self.shell.as_ref().map(|s| s.window.id()) else {
            return;
        };
        if id != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.exit_requested = true;
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = self.shell.as_ref().map(|s| s.window.inner_size());
                if let Some(new_size) = new_size {
                    self.handle_resize(new_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.input.apply_key(&event),
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::RedrawRequested => self.frame(),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Backstop for exits the engine did not initiate itself.
        self.shutdown();
    }
}

/// Centers a windowed-mode window on the primary display, when one is
/// known and large enough.
fn center_on_primary(event_loop: &ActiveEventLoop, window: &Window) {
    let Some(monitor) = event_loop.primary_monitor() else {
        return;
    };
    let screen = monitor.size();
    let outer = window.outer_size();
    if screen.width <= outer.width || screen.height <= outer.height {
        return;
    }

    let origin = monitor.position();
    let x = origin.x + ((screen.width - outer.width) / 2) as i32;
    let y = origin.y + ((screen.height - outer.height) / 2) as i32;
    window.set_outer_position(PhysicalPosition::new(x, y));
}
