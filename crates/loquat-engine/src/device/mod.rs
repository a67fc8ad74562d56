mod capability;
mod gpu;
mod programs;

pub use capability::{GraphicsDevice, ProgramHandle, ShaderStage, StageHandle, UniformLocation};
pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use programs::{ProgramRender, WgpuDevice};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted device for exercising the registry and the scene
    //! controller without a GPU.

    use std::collections::HashMap;

    use crate::paint::Color;

    use super::{GraphicsDevice, ProgramHandle, ShaderStage, StageHandle, UniformLocation};

    #[derive(Default)]
    pub struct RecordingDevice {
        /// Stage kind whose compilation should fail, if any.
        pub fail_compile: Option<ShaderStage>,
        pub fail_link: bool,

        pub compile_calls: Vec<ShaderStage>,
        pub deleted_stages: Vec<StageHandle>,
        pub deleted_programs: Vec<ProgramHandle>,
        pub bind_calls: Vec<Option<ProgramHandle>>,

        /// Uniform names the "bound program" knows, with byte offsets.
        pub uniforms: HashMap<String, u32>,
        /// Recorded uniform writes as (offset, byte length).
        pub writes: Vec<(u32, usize)>,

        pub next_id: u64,
        pub bound: Option<ProgramHandle>,
        pub clear_color: Color,
        pub viewport: (u32, u32),
    }

    impl RecordingDevice {
        fn alloc_id(&mut self) -> u64 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl GraphicsDevice for RecordingDevice {
        fn compile_shader(
            &mut self,
            stage: ShaderStage,
            _source: &str,
        ) -> Result<StageHandle, String> {
            self.compile_calls.push(stage);
            if self.fail_compile == Some(stage) {
                return Err(format!("scripted {stage} compile failure"));
            }
            Ok(StageHandle(self.alloc_id()))
        }

        fn link_program(
            &mut self,
            _vertex: StageHandle,
            _fragment: StageHandle,
        ) -> Result<ProgramHandle, String> {
            if self.fail_link {
                return Err("scripted link failure".to_owned());
            }
            Ok(ProgramHandle(self.alloc_id()))
        }

        fn delete_shader(&mut self, stage: StageHandle) {
            self.deleted_stages.push(stage);
        }

        fn delete_program(&mut self, program: ProgramHandle) {
            self.deleted_programs.push(program);
        }

        fn bind_program(&mut self, program: Option<ProgramHandle>) {
            self.bind_calls.push(program);
            self.bound = program;
        }

        fn bound_program(&self) -> Option<ProgramHandle> {
            self.bound
        }

        fn uniform_location(&self, name: &str) -> UniformLocation {
            if self.bound.is_none() {
                return UniformLocation::NONE;
            }
            UniformLocation(self.uniforms.get(name).copied())
        }

        fn set_uniform_i32(&mut self, location: UniformLocation, values: &[i32]) {
            if let Some(offset) = location.0 {
                self.writes.push((offset, values.len().min(4) * 4));
            }
        }

        fn set_uniform_f32(&mut self, location: UniformLocation, values: &[f32]) {
            if let Some(offset) = location.0 {
                self.writes.push((offset, values.len().min(4) * 4));
            }
        }

        fn set_clear_color(&mut self, color: Color) {
            self.clear_color = color;
        }

        fn clear_color(&self) -> Color {
            self.clear_color
        }

        fn set_viewport(&mut self, width: u32, height: u32) {
            self.viewport = (width, height);
        }

        fn viewport(&self) -> (u32, u32) {
            self.viewport
        }
    }
}
