use std::collections::HashMap;

use wgpu::naga;

use crate::paint::Color;

use super::capability::{
    GraphicsDevice, ProgramHandle, ShaderStage, StageHandle, UniformLocation,
};

/// A stage object between compile and link: validated naga IR plus the
/// original source, which is what wgpu consumes at module creation.
struct CompiledStage {
    stage: ShaderStage,
    source: String,
    module: naga::Module,
}

/// Reflected uniform interface of a program: member name to byte offset
/// within the block at group 0, binding 0, and the block's total span.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ReflectedBlock {
    pub members: HashMap<String, u32>,
    pub span: u32,
}

/// GPU-side uniform storage for one linked program.
struct UniformBlock {
    layout: wgpu::BindGroupLayout,
    group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
    members: HashMap<String, u32>,
    span: u32,
}

struct LinkedProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vs_entry: String,
    fs_entry: String,
    uniforms: Option<UniformBlock>,
}

/// Borrowed view of a linked program for draw-path pipeline construction.
pub struct ProgramRender<'a> {
    pub vertex: &'a wgpu::ShaderModule,
    pub fragment: &'a wgpu::ShaderModule,
    pub vs_entry: &'a str,
    pub fs_entry: &'a str,
    pub bind_group_layout: Option<&'a wgpu::BindGroupLayout>,
    pub bind_group: Option<&'a wgpu::BindGroup>,
}

/// The production [`GraphicsDevice`]: WGSL stages are "compiled" by naga
/// (parse + validate, with naga's diagnostics as the compiler log) and
/// "linked" by resolving entry points, creating the wgpu shader modules,
/// and building the reflected uniform interface.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    stages: HashMap<StageHandle, CompiledStage>,
    programs: HashMap<ProgramHandle, LinkedProgram>,
    next_id: u64,
    bound: Option<ProgramHandle>,
    clear_color: Color,
    viewport: (u32, u32),
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            stages: HashMap::new(),
            programs: HashMap::new(),
            next_id: 1,
            bound: None,
            clear_color: Color::default(),
            viewport: (0, 0),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Draw-path view of a linked program. `None` for unknown handles.
    pub fn program_render(&self, program: ProgramHandle) -> Option<ProgramRender<'_>> {
        let p = self.programs.get(&program)?;
        Some(ProgramRender {
            vertex: &p.vertex,
            fragment: &p.fragment,
            vs_entry: &p.vs_entry,
            fs_entry: &p.fs_entry,
            bind_group_layout: p.uniforms.as_ref().map(|u| &u.layout),
            bind_group: p.uniforms.as_ref().map(|u| &u.group),
        })
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn create_uniform_block(&self, reflected: ReflectedBlock) -> Option<UniformBlock> {
        let size = std::num::NonZeroU64::new(reflected.span as u64)?;

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("loquat program uniforms layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(size),
                    },
                    count: None,
                }],
            });

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("loquat program uniforms"),
            size: size.get(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("loquat program uniforms"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Some(UniformBlock {
            layout,
            group,
            buffer,
            members: reflected.members,
            span: reflected.span,
        })
    }

    fn write_uniform(&mut self, location: UniformLocation, bytes: &[u8]) {
        let Some(offset) = location.0 else { return };
        let Some(bound) = self.bound else { return };
        let Some(program) = self.programs.get(&bound) else { return };
        let Some(block) = program.uniforms.as_ref() else { return };

        if offset as u64 + bytes.len() as u64 > block.span as u64 {
            return;
        }
        self.queue.write_buffer(&block.buffer, offset as u64, bytes);
    }
}

impl GraphicsDevice for WgpuDevice {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<StageHandle, String> {
        let module =
            naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        );
        validator
            .validate(&module)
            .map_err(|e| e.emit_to_string(source))?;

        let handle = StageHandle(self.alloc_id());
        self.stages.insert(
            handle,
            CompiledStage {
                stage,
                source: source.to_owned(),
                module,
            },
        );
        Ok(handle)
    }

    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<ProgramHandle, String> {
        let vs = self
            .stages
            .get(&vertex)
            .ok_or_else(|| "unknown vertex stage object".to_owned())?;
        let fs = self
            .stages
            .get(&fragment)
            .ok_or_else(|| "unknown fragment stage object".to_owned())?;

        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("stage objects attached in the wrong order".to_owned());
        }

        let vs_entry = find_entry_point(&vs.module, naga::ShaderStage::Vertex)
            .ok_or_else(|| "vertex source declares no @vertex entry point".to_owned())?
            .to_owned();
        let fs_entry = find_entry_point(&fs.module, naga::ShaderStage::Fragment)
            .ok_or_else(|| "fragment source declares no @fragment entry point".to_owned())?
            .to_owned();

        let reflected = merge_uniform_blocks(
            reflect_uniform_block(&vs.module),
            reflect_uniform_block(&fs.module),
        );

        let vertex_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("loquat vertex stage"),
                source: wgpu::ShaderSource::Wgsl(vs.source.clone().into()),
            });
        let fragment_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("loquat fragment stage"),
                source: wgpu::ShaderSource::Wgsl(fs.source.clone().into()),
            });

        let uniforms = reflected.and_then(|r| self.create_uniform_block(r));

        let handle = ProgramHandle(self.alloc_id());
        self.programs.insert(
            handle,
            LinkedProgram {
                vertex: vertex_module,
                fragment: fragment_module,
                vs_entry,
                fs_entry,
                uniforms,
            },
        );
        Ok(handle)
    }

    fn delete_shader(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.bound == Some(program) {
            self.bound = None;
        }
        self.programs.remove(&program);
    }

    fn bind_program(&mut self, program: Option<ProgramHandle>) {
        self.bound = program;
    }

    fn bound_program(&self) -> Option<ProgramHandle> {
        self.bound
    }

    fn uniform_location(&self, name: &str) -> UniformLocation {
        let Some(bound) = self.bound else {
            return UniformLocation::NONE;
        };
        let Some(program) = self.programs.get(&bound) else {
            return UniformLocation::NONE;
        };
        let Some(block) = program.uniforms.as_ref() else {
            return UniformLocation::NONE;
        };
        UniformLocation(block.members.get(name).copied())
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, values: &[i32]) {
        let values = &values[..values.len().min(4)];
        self.write_uniform(location, bytemuck::cast_slice(values));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, values: &[f32]) {
        let values = &values[..values.len().min(4)];
        self.write_uniform(location, bytemuck::cast_slice(values));
    }

    fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color.clamped();
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

    fn as_wgpu(&self) -> Option<&WgpuDevice> {
        Some(self)
    }
}

fn find_entry_point(module: &naga::Module, stage: naga::ShaderStage) -> Option<&str> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage)
        .map(|ep| ep.name.as_str())
}

/// Reflects the uniform block at group 0, binding 0, if the module has one.
///
/// One block per program is the interface every engine shader uses; other
/// uniform bindings are reported and skipped rather than silently mis-bound.
fn reflect_uniform_block(module: &naga::Module) -> Option<ReflectedBlock> {
    let mut found: Option<ReflectedBlock> = None;

    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let Some(binding) = var.binding.as_ref() else {
            continue;
        };
        if binding.group != 0 || binding.binding != 0 {
            log::debug!(
                "uniform binding at group {} binding {} is outside the reflected interface; skipped",
                binding.group,
                binding.binding
            );
            continue;
        }

        if let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner {
            let mut table = HashMap::new();
            for member in members {
                if let Some(name) = member.name.as_ref() {
                    table.insert(name.clone(), member.offset);
                }
            }
            found = Some(ReflectedBlock {
                members: table,
                span: *span,
            });
        }
    }

    found
}

/// Merges the per-stage reflections of the shared block. Stages declaring
/// the same block agree on offsets; the union covers members only one
/// stage references.
fn merge_uniform_blocks(
    vs: Option<ReflectedBlock>,
    fs: Option<ReflectedBlock>,
) -> Option<ReflectedBlock> {
    match (vs, fs) {
        (Some(mut a), Some(b)) => {
            for (name, offset) in b.members {
                a.members.entry(name).or_insert(offset);
            }
            a.span = a.span.max(b.span);
            Some(a)
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> naga::Module {
        naga::front::wgsl::parse_str(source).unwrap()
    }

    const VS: &str = r"
        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, 1.0);
        }
    ";

    const FS: &str = r"
        struct Params {
            tint: vec4<f32>,
            intensity: f32,
        }
        @group(0) @binding(0) var<uniform> params: Params;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return params.tint * params.intensity;
        }
    ";

    #[test]
    fn entry_points_resolve_per_stage() {
        let vs = parse(VS);
        assert_eq!(find_entry_point(&vs, naga::ShaderStage::Vertex), Some("vs_main"));
        assert_eq!(find_entry_point(&vs, naga::ShaderStage::Fragment), None);

        let fs = parse(FS);
        assert_eq!(find_entry_point(&fs, naga::ShaderStage::Fragment), Some("fs_main"));
    }

    #[test]
    fn uniform_block_reflects_member_offsets() {
        let block = reflect_uniform_block(&parse(FS)).unwrap();
        assert_eq!(block.members.get("tint"), Some(&0));
        // vec4 occupies bytes 0..16, so the scalar after it starts at 16.
        assert_eq!(block.members.get("intensity"), Some(&16));
        assert!(block.span >= 20);
        assert_eq!(block.members.get("missing"), None);
    }

    #[test]
    fn module_without_uniforms_reflects_none() {
        assert_eq!(reflect_uniform_block(&parse(VS)), None);
    }

    #[test]
    fn merge_unions_members_and_takes_max_span() {
        let a = ReflectedBlock {
            members: [("tint".to_owned(), 0)].into_iter().collect(),
            span: 16,
        };
        let b = ReflectedBlock {
            members: [("tint".to_owned(), 0), ("extra".to_owned(), 16)]
                .into_iter()
                .collect(),
            span: 32,
        };
        let merged = merge_uniform_blocks(Some(a), Some(b)).unwrap();
        assert_eq!(merged.members.len(), 2);
        assert_eq!(merged.span, 32);

        assert_eq!(merge_uniform_blocks(None, None), None);
    }

    #[test]
    fn invalid_wgsl_fails_to_parse() {
        assert!(naga::front::wgsl::parse_str("not wgsl at all").is_err());
    }
}
