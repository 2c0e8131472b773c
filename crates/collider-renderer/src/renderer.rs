//! Scene rendering: mirrors scene geometry into GPU buffers and draws it

use std::collections::HashMap;

use collider_simulation::{Drawable, GeometryId, Scene, Topology, Vertex};
use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::camera::{InstanceUniform, SceneUniform};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_INSTANCE_CAPACITY: usize = 256;
/// Materials at or above this opacity draw in the opaque pass
const OPAQUE_THRESHOLD: f32 = 0.999;

/// Vertex and index buffers for one scene geometry
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    topology: Topology,
}

impl GpuMesh {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

struct Pipelines {
    opaque_triangles: wgpu::RenderPipeline,
    transparent_triangles: wgpu::RenderPipeline,
    opaque_lines: wgpu::RenderPipeline,
    transparent_lines: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, topology: Topology, opaque: bool) -> &wgpu::RenderPipeline {
        match (topology, opaque) {
            (Topology::Triangles, true) => &self.opaque_triangles,
            (Topology::Triangles, false) => &self.transparent_triangles,
            (Topology::Lines, true) => &self.opaque_lines,
            (Topology::Lines, false) => &self.transparent_lines,
        }
    }
}

/// Live GPU resource counts, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuStats {
    pub meshes: usize,
    pub draws: usize,
}

pub struct SceneRenderer {
    pipelines: Pipelines,
    scene_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    pub depth_texture: wgpu::TextureView,
    meshes: HashMap<GeometryId, GpuMesh>,
    clear_color: wgpu::Color,
    last_draws: usize,
}

impl SceneRenderer {
    pub fn new(device: &wgpu::Device, surface_config: &wgpu::SurfaceConfiguration) -> Self {
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let instance_buffer = Self::create_instance_buffer(device, INITIAL_INSTANCE_CAPACITY);

        let depth_texture = Self::create_depth_texture(device, surface_config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[
                // Camera + lights (Uniform) - Binding 0
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Instances (Storage) - Binding 1
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let bind_group =
            Self::create_bind_group(device, &bind_group_layout, &scene_buffer, &instance_buffer);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |topology, depth_write, label| {
            Self::create_pipeline(
                device,
                &pipeline_layout,
                &shader,
                surface_config.format,
                topology,
                depth_write,
                label,
            )
        };
        let pipelines = Pipelines {
            opaque_triangles: pipeline(
                wgpu::PrimitiveTopology::TriangleList,
                true,
                "Opaque Triangle Pipeline",
            ),
            transparent_triangles: pipeline(
                wgpu::PrimitiveTopology::TriangleList,
                false,
                "Transparent Triangle Pipeline",
            ),
            opaque_lines: pipeline(wgpu::PrimitiveTopology::LineList, true, "Opaque Line Pipeline"),
            transparent_lines: pipeline(
                wgpu::PrimitiveTopology::LineList,
                false,
                "Transparent Line Pipeline",
            ),
        };

        Self {
            pipelines,
            scene_buffer,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            bind_group_layout,
            bind_group,
            depth_texture,
            meshes: HashMap::new(),
            clear_color: mocha_base(),
            last_draws: 0,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        topology: wgpu::PrimitiveTopology,
        depth_write: bool,
        label: &str,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vertex"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fragment"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (capacity * std::mem::size_of::<InstanceUniform>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        scene_buffer: &wgpu::Buffer,
        instance_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        depth_texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, device: &wgpu::Device, new_config: &wgpu::SurfaceConfiguration) {
        self.depth_texture = Self::create_depth_texture(device, new_config);
    }

    pub fn stats(&self) -> GpuStats {
        GpuStats {
            meshes: self.meshes.len(),
            draws: self.last_draws,
        }
    }

    /// Destroy the buffers of `ids`. Returns how many were resident.
    pub fn release(&mut self, ids: impl IntoIterator<Item = GeometryId>) -> usize {
        let mut freed = 0;
        for id in ids {
            if let Some(mesh) = self.meshes.remove(&id) {
                mesh.destroy();
                freed += 1;
            }
        }
        freed
    }

    /// Drop buffers for geometry the scene has released and upload any new
    /// geometry it references
    pub fn sync(&mut self, device: &wgpu::Device, scene: &mut Scene) {
        let freed = self.release(scene.drain_released());

        let mut uploaded = 0;
        for drawable in scene.drawables() {
            if self.meshes.contains_key(&drawable.geometry) {
                continue;
            }
            let Some(geometry) = scene.geometry(drawable.geometry) else {
                continue;
            };
            if geometry.is_empty() {
                continue;
            }
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.meshes.insert(
                drawable.geometry,
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.indices.len() as u32,
                    topology: geometry.topology,
                },
            );
            uploaded += 1;
        }

        if freed > 0 || uploaded > 0 {
            log::debug!(
                "GPU meshes: +{} -{} ({} resident)",
                uploaded,
                freed,
                self.meshes.len()
            );
        }
    }

    /// Draw the scene into `surface_view`. Call [`Self::sync`] first.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        scene: &Scene,
    ) {
        queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::cast_slice(&[SceneUniform::new(scene)]),
        );

        let draws = self.draw_list(scene);
        let instances: Vec<InstanceUniform> = draws.iter().map(|draw| draw.instance).collect();
        self.ensure_instance_capacity(device, instances.len());
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.last_draws = draws.len();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.bind_group, &[]);
        for (index, draw) in draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&draw.geometry) else {
                continue;
            };
            let index = index as u32;
            render_pass.set_pipeline(self.pipelines.get(mesh.topology, draw.opaque));
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, index..index + 1);
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        self.instance_buffer.destroy();
        self.instance_buffer = Self::create_instance_buffer(device, capacity);
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.scene_buffer,
            &self.instance_buffer,
        );
        self.instance_capacity = capacity;
        log::debug!("Instance buffer grown to {} entries", capacity);
    }

    /// Opaque meshes first, then transparent ones back to front
    fn draw_list(&self, scene: &Scene) -> Vec<Draw> {
        let eye = scene.camera.position();
        let mut draws: Vec<Draw> = scene
            .drawables()
            .iter()
            .filter(|drawable| drawable.material.opacity > 0.0)
            .filter_map(|drawable| {
                let mesh = self.meshes.get(&drawable.geometry)?;
                Some(Draw::new(drawable, mesh.topology, eye))
            })
            .collect();
        sort_draws(&mut draws);
        draws
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        for (_, mesh) in self.meshes.drain() {
            mesh.destroy();
        }
    }
}

#[derive(Clone, Copy)]
struct Draw {
    geometry: GeometryId,
    instance: InstanceUniform,
    opaque: bool,
    /// Squared distance from the eye, for transparent ordering
    depth: f32,
}

impl Draw {
    fn new(drawable: &Drawable, topology: Topology, eye: Vec3) -> Self {
        let center = drawable.world.w_axis.truncate();
        Self {
            geometry: drawable.geometry,
            instance: InstanceUniform::new(drawable, topology == Topology::Triangles),
            opaque: drawable.material.opacity >= OPAQUE_THRESHOLD,
            depth: center.distance_squared(eye),
        }
    }
}

fn sort_draws(draws: &mut [Draw]) {
    draws.sort_by(|a, b| {
        b.opaque
            .cmp(&a.opaque)
            .then_with(|| b.depth.total_cmp(&a.depth))
    });
}

/// Catppuccin Mocha base as a linear clear color
fn mocha_base() -> wgpu::Color {
    let rgb = catppuccin::PALETTE.mocha.colors.base.rgb;
    let [r, g, b] = crate::camera::linear_rgb([
        rgb.r as f32 / 255.0,
        rgb.g as f32 / 255.0,
        rgb.b as f32 / 255.0,
    ]);
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}
