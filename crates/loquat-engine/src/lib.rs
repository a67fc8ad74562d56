//! Loquat engine crate.
//!
//! This crate owns the window/context bootstrap, the frame loop, the
//! single-scene lifecycle, and the shader-program registry used by scenes.

pub mod core;
pub mod device;
pub mod error;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod shader;
pub mod store;
pub mod time;
pub mod window;

/// Engine version string, taken from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monotonic version code for embedders that persist compatibility data.
pub const VERSION_CODE: u32 = 1;

pub use crate::core::{EngineCtx, WindowInfo};
pub use crate::error::{InitError, ShaderError};
pub use crate::paint::Color;
pub use crate::scene::{Scene, SceneController};
pub use crate::shader::ShaderRegistry;
pub use crate::window::{Engine, WindowConfig};
