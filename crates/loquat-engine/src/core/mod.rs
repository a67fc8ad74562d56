mod ctx;

pub use ctx::{EngineCtx, WindowInfo};
