mod config;
mod runtime;

pub use config::WindowConfig;
pub use runtime::{Engine, EngineControl};
