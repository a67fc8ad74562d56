use crate::core::EngineCtx;
use crate::time::FrameTime;

use super::Scene;

/// Holds the single active scene and performs enter/exit transitions.
///
/// Two states: no scene, or exactly one active scene. The previous
/// scene's `on_exit` always runs to completion before a successor's
/// `on_enter` begins.
#[derive(Default)]
pub struct SceneController {
    active: Option<Box<dyn Scene>>,
}

impl SceneController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_scene(&self) -> bool {
        self.active.is_some()
    }

    /// Exits the current scene (if any) and enters `next` (if any).
    ///
    /// The loop invokes `enter(None, ..)` at termination so the last
    /// active scene always receives its exit notification.
    pub fn enter(&mut self, next: Option<Box<dyn Scene>>, ctx: &mut EngineCtx<'_>) {
        if let Some(mut previous) = self.active.take() {
            previous.on_exit(ctx);
        }

        self.active = next;
        if let Some(scene) = self.active.as_mut() {
            scene.on_enter(ctx);
        }
    }

    /// Dispatches the per-frame update to the active scene, if any.
    pub fn update(&mut self, ctx: &mut EngineCtx<'_>, time: FrameTime) {
        if let Some(scene) = self.active.as_mut() {
            scene.on_update(ctx, time);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    use crate::core::{EngineCtx, WindowInfo};
    use crate::device::testing::RecordingDevice;
    use crate::input::InputState;
    use crate::shader::ShaderRegistry;
    use crate::window::EngineControl;

    use super::*;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        journal: Journal,
    }

    impl Recorder {
        fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                journal: journal.clone(),
            })
        }
    }

    impl Scene for Recorder {
        fn on_enter(&mut self, _ctx: &mut EngineCtx<'_>) {
            self.journal.borrow_mut().push(format!("{}.enter", self.name));
        }

        fn on_exit(&mut self, _ctx: &mut EngineCtx<'_>) {
            self.journal.borrow_mut().push(format!("{}.exit", self.name));
        }

        fn on_update(&mut self, _ctx: &mut EngineCtx<'_>, _time: FrameTime) {
            self.journal.borrow_mut().push(format!("{}.update", self.name));
        }
    }

    fn with_ctx(f: impl FnOnce(&mut EngineCtx<'_>)) {
        let mut device = RecordingDevice::default();
        let mut shaders = ShaderRegistry::new();
        let input = InputState::default();
        let mut control = EngineControl::default();
        let mut ctx = EngineCtx {
            device: &mut device,
            shaders: &mut shaders,
            input: &input,
            window: WindowInfo {
                width: 800,
                height: 600,
                scale_factor: 1.0,
            },
            control: &mut control,
            frame: None,
        };
        f(&mut ctx);
    }

    fn tick() -> FrameTime {
        FrameTime {
            dt: 1.0 / 60.0,
            now: Instant::now(),
            frame_index: 0,
        }
    }

    #[test]
    fn first_enter_has_no_exit() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| controller.enter(Some(Recorder::boxed("a", &journal)), ctx));

        assert_eq!(*journal.borrow(), vec!["a.enter"]);
        assert!(controller.has_scene());
    }

    #[test]
    fn exit_completes_before_successor_enters() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| {
            controller.enter(Some(Recorder::boxed("a", &journal)), ctx);
            controller.enter(Some(Recorder::boxed("b", &journal)), ctx);
        });

        assert_eq!(*journal.borrow(), vec!["a.enter", "a.exit", "b.enter"]);
    }

    #[test]
    fn terminal_transition_always_exits_last_scene() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| {
            controller.enter(Some(Recorder::boxed("a", &journal)), ctx);
            controller.enter(None, ctx);
        });

        assert_eq!(*journal.borrow(), vec!["a.enter", "a.exit"]);
        assert!(!controller.has_scene());
    }

    #[test]
    fn enter_none_from_no_scene_is_a_noop() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| controller.enter(None, ctx));

        assert!(journal.borrow().is_empty());
        assert!(!controller.has_scene());
    }

    #[test]
    fn exit_count_matches_scenes_ever_active() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| {
            for name in ["a", "b", "c"] {
                controller.enter(Some(Recorder::boxed(name, &journal)), ctx);
            }
            // Terminal transition at loop exit.
            controller.enter(None, ctx);
        });

        let journal = journal.borrow();
        let exits = journal.iter().filter(|e| e.ends_with(".exit")).count();
        let enters = journal.iter().filter(|e| e.ends_with(".enter")).count();
        assert_eq!(enters, 3);
        assert_eq!(exits, 3);
    }

    #[test]
    fn update_reaches_active_scene_only() {
        let journal: Journal = Journal::default();
        let mut controller = SceneController::new();

        with_ctx(|ctx| {
            controller.update(ctx, tick());
            controller.enter(Some(Recorder::boxed("a", &journal)), ctx);
            controller.enter(Some(Recorder::boxed("b", &journal)), ctx);
            controller.update(ctx, tick());
            controller.update(ctx, tick());
            controller.enter(None, ctx);
            controller.update(ctx, tick());
        });

        assert_eq!(
            *journal.borrow(),
            vec!["a.enter", "a.exit", "b.enter", "b.update", "b.update", "b.exit"]
        );
    }
}
