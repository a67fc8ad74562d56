mod registry;

pub use registry::{ProgramInfo, ShaderRegistry};
