use winit::dpi::LogicalSize;
use winit::window::{Window, WindowAttributes};

use crate::device::GpuInit;
use crate::paint::Color;

/// Window/context configuration.
///
/// Immutable after window creation except `width`/`height`, which the
/// runtime keeps in sync with resize notifications.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,

    /// Clear color applied to every frame.
    pub background: Color,

    /// Window decorations (title bar and border).
    pub title_bar: bool,
    pub resizable: bool,

    /// Borderless fullscreen on the primary display. Falls back to
    /// windowed geometry when no display is available.
    pub fullscreen: bool,

    /// Synchronize presentation to the display refresh.
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "loquat".to_owned(),
            background: Color::rgb(0.0, 0.0, 0.0),
            title_bar: true,
            resizable: true,
            fullscreen: false,
            vsync: true,
        }
    }
}

impl WindowConfig {
    /// Base window attributes derived from this config.
    ///
    /// The window is created hidden; the runtime shows it once the
    /// context is configured, so no unconfigured frame flashes.
    /// Fullscreen/monitor resolution is layered on by the runtime, which
    /// has event-loop access.
    pub(crate) fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width as f64, self.height as f64))
            .with_decorations(self.title_bar)
            .with_resizable(self.resizable)
            .with_visible(false)
    }

    pub(crate) fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }

    pub(crate) fn gpu_init(&self) -> GpuInit {
        GpuInit {
            present_mode: self.present_mode(),
            ..GpuInit::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_follow_flags() {
        let config = WindowConfig {
            title: "T".to_owned(),
            title_bar: false,
            resizable: false,
            ..Default::default()
        };
        let attrs = config.window_attributes();

        assert_eq!(attrs.title, "T");
        assert!(!attrs.decorations);
        assert!(!attrs.resizable);
        // Created hidden; shown only after setup completes.
        assert!(!attrs.visible);
    }

    #[test]
    fn vsync_selects_present_mode() {
        let mut config = WindowConfig::default();
        assert_eq!(config.present_mode(), wgpu::PresentMode::Fifo);

        config.vsync = false;
        assert_eq!(config.present_mode(), wgpu::PresentMode::AutoNoVsync);
    }
}
