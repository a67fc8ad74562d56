//! Demo app: a pulsing triangle rendered through the shader registry.
//!
//! Escape exits; Tab toggles between the triangle scene and an empty
//! scene to exercise transitions.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use loquat_engine::device::{GraphicsDevice, ProgramHandle};
use loquat_engine::input::KeyCode;
use loquat_engine::time::FrameTime;
use loquat_engine::{Color, Engine, EngineCtx, Scene, WindowConfig};

const VERTEX_SHADER: &str = r"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
";

const FRAGMENT_SHADER: &str = r"
struct Params {
    tint: vec4<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return params.tint;
}
";

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const VERTICES: [Vertex; 3] = [
    Vertex { position: [-0.5, -0.5, 0.0] },
    Vertex { position: [0.5, -0.5, 0.0] },
    Vertex { position: [0.0, 0.5, 0.0] },
];

struct TriangleScene {
    program: Option<ProgramHandle>,
    vertex_buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_format: Option<wgpu::TextureFormat>,
    elapsed: f32,
    tab_held: bool,
}

impl Default for TriangleScene {
    fn default() -> Self {
        Self {
            program: None,
            vertex_buffer: None,
            bind_group: None,
            pipeline: None,
            pipeline_format: None,
            elapsed: 0.0,
            // Tab may still be held from the transition that entered us.
            tab_held: true,
        }
    }
}

impl TriangleScene {
    fn ensure_pipeline(
        &mut self,
        device: &dyn GraphicsDevice,
        program: ProgramHandle,
        format: wgpu::TextureFormat,
    ) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }
        let Some(dev) = device.as_wgpu() else { return };
        let Some(render) = dev.program_render(program) else {
            return;
        };

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            render.bind_group_layout.into_iter().collect();
        let layout = dev
            .device()
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("triangle pipeline layout"),
                bind_group_layouts: &bind_group_layouts,
                immediate_size: 0,
            });

        let pipeline = dev
            .device()
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("triangle pipeline"),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: render.vertex,
                    entry_point: Some(render.vs_entry),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: render.fragment,
                    entry_point: Some(render.fs_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        self.pipeline = Some(pipeline);
        self.pipeline_format = Some(format);
    }
}

impl Scene for TriangleScene {
    fn on_enter(&mut self, ctx: &mut EngineCtx<'_>) {
        let program = match ctx.shaders.create(ctx.device, VERTEX_SHADER, FRAGMENT_SHADER) {
            Ok(program) => program,
            Err(e) => {
                log::error!("{e}");
                ctx.exit();
                return;
            }
        };
        self.program = Some(program);

        if let Some(dev) = ctx.device.as_wgpu() {
            if let Some(render) = dev.program_render(program) {
                self.bind_group = render.bind_group.cloned();
            }
            self.vertex_buffer = Some(dev.device().create_buffer_init(
                &wgpu::util::BufferInitDescriptor {
                    label: Some("triangle vertices"),
                    contents: bytemuck::cast_slice(&VERTICES),
                    usage: wgpu::BufferUsages::VERTEX,
                },
            ));
        }
    }

    fn on_exit(&mut self, ctx: &mut EngineCtx<'_>) {
        if let Some(program) = self.program.take() {
            ctx.shaders.destroy(ctx.device, program);
        }
        self.pipeline = None;
        self.pipeline_format = None;
        self.bind_group = None;
        self.vertex_buffer = None;
    }

    fn on_update(&mut self, ctx: &mut EngineCtx<'_>, time: FrameTime) {
        if ctx.input.pressed(KeyCode::Escape) {
            ctx.exit();
            return;
        }
        let tab = ctx.input.pressed(KeyCode::Tab);
        if tab && !self.tab_held {
            ctx.enter_scene(HoldScene::default());
        }
        self.tab_held = tab;

        self.elapsed += time.dt;
        let Some(program) = self.program else { return };

        // Pulse the tint through the named-uniform path.
        let pulse = 0.35 + 0.3 * (self.elapsed * 2.0).sin();
        ctx.shaders.bind(ctx.device, program);
        ctx.shaders.set_float4(ctx.device, "tint", 1.0, pulse, 0.2, 1.0);

        let Some(format) = ctx.frame.as_ref().map(|f| f.format) else {
            return;
        };
        self.ensure_pipeline(&*ctx.device, program, format);

        let (Some(pipeline), Some(vertex_buffer)) = (&self.pipeline, &self.vertex_buffer) else {
            return;
        };
        let Some(frame) = ctx.frame.as_mut() else { return };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("triangle pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        if let Some(bind_group) = &self.bind_group {
            rpass.set_bind_group(0, bind_group, &[]);
        }
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
        rpass.draw(0..3, 0..1);
    }
}

/// Empty scene; the frame loop still clears and presents.
struct HoldScene {
    tab_held: bool,
}

impl Default for HoldScene {
    fn default() -> Self {
        Self { tab_held: true }
    }
}

impl Scene for HoldScene {
    fn on_update(&mut self, ctx: &mut EngineCtx<'_>, _time: FrameTime) {
        if ctx.input.pressed(KeyCode::Escape) {
            ctx.exit();
            return;
        }
        let tab = ctx.input.pressed(KeyCode::Tab);
        if tab && !self.tab_held {
            ctx.enter_scene(TriangleScene::default());
        }
        self.tab_held = tab;
    }
}

fn main() -> Result<()> {
    loquat_engine::logging::init();
    log::info!("loquat {} demo", loquat_engine::VERSION);

    let mut engine = Engine::new(WindowConfig {
        width: 640,
        height: 480,
        title: "loquat demo".to_owned(),
        background: Color::rgb(0.2, 0.3, 0.3),
        ..WindowConfig::default()
    });
    engine.enter_scene(TriangleScene::default());
    engine.run()
}
