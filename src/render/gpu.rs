//! wgpu backend for [`RenderDevice`].
//!
//! Draws are staged between `begin_frame` and `end_frame` and replayed in call
//! order inside a single render pass. All draws of one frame share the camera
//! of the first draw issued in that frame.

use super::{
    LineVertex, MeshData, MeshDraw, MeshHandle, MeshVertex, RenderDevice, RenderError, SurfaceSize,
};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");
const HIGHLIGHT: [f32; 3] = [1.0, 0.68, 0.24];
const HIGHLIGHT_MIX: f32 = 0.45;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct InstanceGpu {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
}

impl InstanceGpu {
    fn from_draw(draw: &MeshDraw) -> Self {
        let [model_0, model_1, model_2, model_3] = draw.world.to_cols_array_2d();
        Self {
            model_0,
            model_1,
            model_2,
            model_3,
            color: instance_color(draw.tint, draw.highlighted),
        }
    }
}

fn instance_color(tint: [f32; 4], highlighted: bool) -> [f32; 4] {
    if !highlighted {
        return tint;
    }
    let mix = |from: f32, to: f32| from + (to - from) * HIGHLIGHT_MIX;
    [
        mix(tint[0], HIGHLIGHT[0]),
        mix(tint[1], HIGHLIGHT[1]),
        mix(tint[2], HIGHLIGHT[2]),
        tint[3],
    ]
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

#[derive(Clone, Copy)]
enum StagedDraw {
    Mesh { mesh: usize, instance: u32 },
    Lines { first: u32, count: u32 },
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    clear: wgpu::Color,
    view_proj: Option<Mat4>,
    instances: Vec<InstanceGpu>,
    lines: Vec<LineVertex>,
    draws: Vec<StagedDraw>,
}

/// Grow-only GPU buffer sized in elements.
struct GrowableBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    stride: usize,
    capacity: usize,
    buffer: wgpu::Buffer,
}

impl GrowableBuffer {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        stride: usize,
        capacity: usize,
    ) -> Self {
        let buffer = Self::allocate(device, label, usage, stride, capacity);
        Self {
            label,
            usage,
            stride,
            capacity,
            buffer,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &'static str,
        usage: wgpu::BufferUsages,
        stride: usize,
        capacity: usize,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * stride) as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let mut capacity = self.capacity.max(1);
        while capacity < needed {
            capacity *= 2;
        }
        self.buffer = Self::allocate(device, self.label, self.usage, self.stride, capacity);
        self.capacity = capacity;
    }
}

pub struct GpuDevice {
    // Keeps the window alive for the surface's lifetime.
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    meshes: Vec<GpuMesh>,
    instances: GrowableBuffer,
    lines: GrowableBuffer,
    depth_view: wgpu::TextureView,
    frame: Option<Frame>,
    overlay: Option<String>,
    released: bool,
}

impl GpuDevice {
    /// Blocks on adapter and device requests; call it off the UI thread.
    pub fn create(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        window: Arc<Window>,
        size: SurfaceSize,
    ) -> Result<Self, RenderError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|_| RenderError::AdapterUnavailable)?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("leveledit_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| RenderError::DeviceRequestFailed(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                RenderError::SurfaceCreateFailed("surface reports no texture formats".to_string())
            })?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("leveledit_scene_shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_WGSL.into()),
        });
        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("leveledit_camera_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("leveledit_camera_buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("leveledit_camera_bg"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("leveledit_pipeline_layout"),
            bind_group_layouts: &[&camera_bgl],
            immediate_size: 0,
        });

        let mesh_pipeline = create_mesh_pipeline(&device, &pipeline_layout, &shader, format);
        let line_pipeline = create_line_pipeline(&device, &pipeline_layout, &shader, format);
        let instances = GrowableBuffer::new(
            &device,
            "leveledit_mesh_instances",
            wgpu::BufferUsages::VERTEX,
            std::mem::size_of::<InstanceGpu>(),
            256,
        );
        let lines = GrowableBuffer::new(
            &device,
            "leveledit_line_vertices",
            wgpu::BufferUsages::VERTEX,
            std::mem::size_of::<LineVertex>(),
            64,
        );
        let depth_view = create_depth_view(&device, config.width, config.height);

        log::info!(
            "GPU device ready: {} ({:?}), surface format {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            camera_buffer,
            camera_bind_group,
            mesh_pipeline,
            line_pipeline,
            meshes: Vec::new(),
            instances,
            lines,
            depth_view,
            frame: None,
            overlay: None,
            released: false,
        })
    }

    /// Latest overlay text, if any was drawn since the last call.
    pub fn take_overlay(&mut self) -> Option<String> {
        self.overlay.take()
    }

    fn stage_camera(frame: &mut Frame, view: Mat4, projection: Mat4) {
        if frame.view_proj.is_none() {
            frame.view_proj = Some(projection * view);
        }
    }
}

impl RenderDevice for GpuDevice {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        if self.released {
            return Err(RenderError::DeviceLost);
        }
        mesh.validate()?;
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("leveledit_mesh_vertices"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("leveledit_mesh_indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let handle = MeshHandle::new(self.meshes.len() as u32);
        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        });
        Ok(handle)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.released || width == 0 || height == 0 {
            return;
        }
        if self.config.width == width && self.config.height == height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> bool {
        if self.released {
            return false;
        }
        // A frame left open by a caller is dropped without presenting.
        self.frame = None;
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return false;
            }
            Err(err) => {
                log::debug!("Skipping frame: {err}");
                return false;
            }
        };
        let [r, g, b, a] = clear_color.map(f64::from);
        self.frame = Some(Frame {
            surface_texture,
            clear: wgpu::Color { r, g, b, a },
            view_proj: None,
            instances: Vec::new(),
            lines: Vec::new(),
            draws: Vec::new(),
        });
        true
    }

    fn draw_lines(&mut self, lines: &[LineVertex], view: Mat4, projection: Mat4) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        if lines.is_empty() {
            return;
        }
        Self::stage_camera(frame, view, projection);
        let first = frame.lines.len() as u32;
        frame.lines.extend_from_slice(lines);
        frame.draws.push(StagedDraw::Lines {
            first,
            count: lines.len() as u32,
        });
    }

    fn draw_mesh(&mut self, draw: &MeshDraw) -> Result<(), RenderError> {
        let mesh = draw.mesh.index() as usize;
        if mesh >= self.meshes.len() {
            return Err(RenderError::UnknownMesh(draw.mesh));
        }
        let Some(frame) = self.frame.as_mut() else {
            return Ok(());
        };
        Self::stage_camera(frame, draw.view, draw.projection);
        let instance = frame.instances.len() as u32;
        frame.instances.push(InstanceGpu::from_draw(draw));
        frame.draws.push(StagedDraw::Mesh { mesh, instance });
        Ok(())
    }

    fn draw_overlay_text(&mut self, text: &str) {
        self.overlay = Some(text.to_string());
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };

        self.instances
            .ensure_capacity(&self.device, frame.instances.len());
        self.lines.ensure_capacity(&self.device, frame.lines.len());
        let camera = CameraUniform {
            view_proj: frame
                .view_proj
                .unwrap_or(Mat4::IDENTITY)
                .to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));
        if !frame.instances.is_empty() {
            self.queue.write_buffer(
                &self.instances.buffer,
                0,
                bytemuck::cast_slice(&frame.instances),
            );
        }
        if !frame.lines.is_empty() {
            self.queue
                .write_buffer(&self.lines.buffer, 0, bytemuck::cast_slice(&frame.lines));
        }

        let color_view = frame
            .surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("leveledit_frame_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("leveledit_scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            for draw in &frame.draws {
                match *draw {
                    StagedDraw::Mesh { mesh, instance } => {
                        let Some(gpu_mesh) = self.meshes.get(mesh) else {
                            continue;
                        };
                        pass.set_pipeline(&self.mesh_pipeline);
                        pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
                        pass.set_vertex_buffer(1, self.instances.buffer.slice(..));
                        pass.set_index_buffer(
                            gpu_mesh.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        pass.draw_indexed(0..gpu_mesh.index_count, 0, instance..instance + 1);
                    }
                    StagedDraw::Lines { first, count } => {
                        pass.set_pipeline(&self.line_pipeline);
                        pass.set_vertex_buffer(0, self.lines.buffer.slice(..));
                        pass.draw(first..first + count, 0..1);
                    }
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        frame.surface_texture.present();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.frame = None;
        self.meshes.clear();
        self.overlay = None;
        log::info!("GPU resources released");
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("leveledit_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn depth_state(write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let instance_attributes = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];
    let vertex_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("leveledit_mesh_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_mesh"),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &vertex_attributes,
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceGpu>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &instance_attributes,
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_mesh"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(depth_state(true)),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

fn create_line_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("leveledit_line_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_line"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<LineVertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_line"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..Default::default()
        },
        depth_stencil: Some(depth_state(false)),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
