use bytemuck::{Pod, Zeroable};
use std::rc::Rc;

use crate::texture::{Texture, TextureRef, texture_cache};

use super::ctx::{RenderCtx, RenderTarget};
use super::mesh::{MAX_TEXTURE_SETS, MeshBuffers, Upload};
use super::stats;

/// Shader variant, selected per node by what the mesh binds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum PipelineVariant {
    /// Positions only; fill color comes from the node uniform.
    Solid,
    /// Positions + per-vertex colors (baked subtrees).
    VertexColor,
    /// Positions + texcoords + textures.
    Textured,
    /// Positions + per-vertex colors + texcoords + textures.
    TexturedVertexColor,
}

/// GPU-side twin of a `MeshBuffers`: one buffer per attribute, the node
/// uniform, and the bind group. Recreated whenever the mesh generation
/// changes (the "reallocation" event) — never partially resized.
pub(crate) struct GpuMesh {
    generation: u64,
    epoch: u64,
    variant: PipelineVariant,
    positions: wgpu::Buffer,
    indices: wgpu::Buffer,
    colors: Option<wgpu::Buffer>,
    tex_coords: [Option<wgpu::Buffer>; MAX_TEXTURE_SETS],
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// One recorded draw: everything the encode pass needs, with the GPU handles
/// cloned out of the node so encoding never re-borrows the scene graph.
pub struct DrawEntry {
    variant: PipelineVariant,
    bind_group: wgpu::BindGroup,
    positions: wgpu::Buffer,
    colors: Option<wgpu::Buffer>,
    tex_coords: [Option<wgpu::Buffer>; MAX_TEXTURE_SETS],
    indices: wgpu::Buffer,
    index_count: u32,
}

/// Emits scene draw calls.
///
/// Owns the four pipeline variants (keyed by surface format, rebuilt on
/// format change), the per-frame viewport uniform, and the placeholder
/// texture substituted for missing texture bindings.
#[derive(Default)]
pub struct MeshRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipelines: Option<Pipelines>,

    /// Bumped on pipeline rebuild; stale per-node bind groups are detected
    /// by comparing against it.
    epoch: u64,

    placeholder: Option<TextureRef>,
}

struct Pipelines {
    node_bgl_plain: wgpu::BindGroupLayout,
    node_bgl_textured: wgpu::BindGroupLayout,

    solid: wgpu::RenderPipeline,
    vertex_color: wgpu::RenderPipeline,
    textured: wgpu::RenderPipeline,
    textured_vertex_color: wgpu::RenderPipeline,

    viewport_ubo: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
}

// ── uniform layouts ───────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

/// Matches the 20-float world buffer a `Transform` maintains: row-major
/// matrix followed by RGBA. Color is premultiplied here, once, at upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct NodeUniform {
    world: [f32; 16],
    tint: [f32; 4],
}

// ── vertex attribute layouts ──────────────────────────────────────────────
//
// Attribute locations are per-variant because the same buffer sits at a
// different slot depending on which attributes are enabled.

const POS_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const COLOR_ATTRS_LOC1: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];
const UV_ATTRS_LOC1: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const UV_ATTRS_LOC2: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];
const UV_ATTRS_LOC3: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x2];

fn vb_layout(stride: u64, attrs: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: attrs,
    }
}

impl MeshRenderer {
    pub fn new() -> MeshRenderer {
        MeshRenderer::default()
    }

    // ── prepare ───────────────────────────────────────────────────────────

    /// Synchronizes one mesh with the GPU and returns its draw entry.
    ///
    /// A generation mismatch recreates every buffer and re-uploads all
    /// attributes; otherwise only the ranges recorded in the upload plan are
    /// written. Returns `None` for empty meshes (degenerate geometry draws
    /// nothing, by contract).
    pub fn prepare(
        &mut self,
        ctx: &RenderCtx<'_>,
        mesh: &mut MeshBuffers,
        world: &[f32; 20],
    ) -> Option<DrawEntry> {
        self.ensure_pipelines(ctx);

        if mesh.is_empty() {
            return None;
        }

        // A textured node needs both texcoord sets bound; the second
        // defaults to zeros sampling the placeholder.
        if mesh.texture(0).is_some() && mesh.has_tex_coords(0) && !mesh.has_tex_coords(1) {
            mesh.enable_tex_coords(1);
        }

        let variant = variant_for(mesh);
        let textures_changed = mesh.take_textures_changed();

        let needs_realloc = match mesh.gpu.as_ref() {
            None => true,
            Some(g) => {
                g.generation != mesh.generation() || g.epoch != self.epoch || g.variant != variant
            }
        };

        if needs_realloc {
            let gpu = self.create_gpu_mesh(ctx, mesh, variant, world);
            mesh.gpu = Some(gpu);
            mesh.clear_plan();
        } else {
            self.apply_plan(ctx, mesh, world, textures_changed, variant);
            mesh.clear_plan();
        }

        let g = mesh.gpu.as_ref()?;
        Some(DrawEntry {
            variant,
            bind_group: g.bind_group.clone(),
            positions: g.positions.clone(),
            colors: g.colors.clone(),
            tex_coords: g.tex_coords.clone(),
            indices: g.indices.clone(),
            index_count: mesh.indices_num() as u32,
        })
    }

    // ── encode ────────────────────────────────────────────────────────────

    /// Records all draw entries into one render pass, in order. Each entry
    /// is one indexed strip draw and bumps the global draw-call counter.
    pub fn encode(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        entries: &[DrawEntry],
    ) {
        self.ensure_pipelines(ctx);
        let Some(p) = self.pipelines.as_ref() else { return };

        ctx.queue.write_buffer(
            &p.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                viewport: [ctx.viewport.width.max(1.0), ctx.viewport.height.max(1.0)],
                _pad: [0.0; 2],
            }),
        );

        if entries.is_empty() {
            return;
        }

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tiamat scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
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

        rpass.set_bind_group(0, &p.frame_bind_group, &[]);

        let mut bound_variant = None;
        for entry in entries {
            if bound_variant != Some(entry.variant) {
                rpass.set_pipeline(match entry.variant {
                    PipelineVariant::Solid => &p.solid,
                    PipelineVariant::VertexColor => &p.vertex_color,
                    PipelineVariant::Textured => &p.textured,
                    PipelineVariant::TexturedVertexColor => &p.textured_vertex_color,
                });
                bound_variant = Some(entry.variant);
            }

            rpass.set_bind_group(1, &entry.bind_group, &[]);
            rpass.set_vertex_buffer(0, entry.positions.slice(..));

            let mut slot = 1;
            if matches!(
                entry.variant,
                PipelineVariant::VertexColor | PipelineVariant::TexturedVertexColor
            ) {
                if let Some(colors) = entry.colors.as_ref() {
                    rpass.set_vertex_buffer(slot, colors.slice(..));
                }
                slot += 1;
            }
            if matches!(
                entry.variant,
                PipelineVariant::Textured | PipelineVariant::TexturedVertexColor
            ) {
                for set in 0..MAX_TEXTURE_SETS {
                    if let Some(uv) = entry.tex_coords[set].as_ref() {
                        rpass.set_vertex_buffer(slot + set as u32, uv.slice(..));
                    }
                }
            }

            rpass.set_index_buffer(entry.indices.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..entry.index_count, 0, 0..1);
            stats::record_draw_call();
        }
    }

    // ── GPU mesh lifecycle ────────────────────────────────────────────────

    fn create_gpu_mesh(
        &mut self,
        ctx: &RenderCtx<'_>,
        mesh: &mut MeshBuffers,
        variant: PipelineVariant,
        world: &[f32; 20],
    ) -> GpuMesh {
        let device = ctx.device;
        let queue = ctx.queue;

        let positions = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat mesh positions"),
            size: (mesh.positions().len() * 8) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&positions, 0, bytemuck::cast_slice(mesh.positions()));

        let padded = mesh.padded_indices().to_vec();
        let indices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat mesh indices"),
            size: (padded.len() * 2) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&indices, 0, bytemuck::cast_slice(&padded));

        let colors = mesh.has_vertex_colors().then(|| {
            let buf = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tiamat mesh colors"),
                size: (mesh.colors().len() * 16) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            queue.write_buffer(&buf, 0, bytemuck::cast_slice(mesh.colors()));
            buf
        });

        let mut tex_coords: [Option<wgpu::Buffer>; MAX_TEXTURE_SETS] = [None, None];
        for set in 0..MAX_TEXTURE_SETS {
            if mesh.has_tex_coords(set) {
                let buf = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("tiamat mesh texcoords"),
                    size: (mesh.tex_coords(set).len() * 8) as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                queue.write_buffer(&buf, 0, bytemuck::cast_slice(mesh.tex_coords(set)));
                tex_coords[set] = Some(buf);
            }
        }

        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat node uniform"),
            size: std::mem::size_of::<NodeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&uniform, 0, bytemuck::bytes_of(&node_uniform(world)));

        let bind_group = self.create_node_bind_group(ctx, mesh, variant, &uniform);

        GpuMesh {
            generation: mesh.generation(),
            epoch: self.epoch,
            variant,
            positions,
            indices,
            colors,
            tex_coords,
            uniform,
            bind_group,
        }
    }

    fn apply_plan(
        &mut self,
        ctx: &RenderCtx<'_>,
        mesh: &mut MeshBuffers,
        world: &[f32; 20],
        textures_changed: bool,
        variant: PipelineVariant,
    ) {
        let plan = mesh.plan().clone();
        let queue = ctx.queue;

        {
            let g = mesh.gpu.as_ref().expect("apply_plan requires a live GpuMesh");

            match plan.positions {
                Upload::None => {}
                Upload::Full => {
                    queue.write_buffer(&g.positions, 0, bytemuck::cast_slice(mesh.positions()));
                }
                Upload::Sub { offset, len } => {
                    let data = &mesh.positions()[offset..offset + len];
                    queue.write_buffer(&g.positions, (offset * 8) as u64, bytemuck::cast_slice(data));
                }
            }

            match plan.colors {
                Upload::None => {}
                Upload::Full => {
                    if let Some(buf) = g.colors.as_ref() {
                        queue.write_buffer(buf, 0, bytemuck::cast_slice(mesh.colors()));
                    }
                }
                Upload::Sub { offset, len } => {
                    if let Some(buf) = g.colors.as_ref() {
                        let data = &mesh.colors()[offset..offset + len];
                        queue.write_buffer(buf, (offset * 16) as u64, bytemuck::cast_slice(data));
                    }
                }
            }

            for set in 0..MAX_TEXTURE_SETS {
                match plan.tex_coords[set] {
                    Upload::None => {}
                    Upload::Full => {
                        if let Some(buf) = g.tex_coords[set].as_ref() {
                            queue.write_buffer(buf, 0, bytemuck::cast_slice(mesh.tex_coords(set)));
                        }
                    }
                    Upload::Sub { offset, len } => {
                        if let Some(buf) = g.tex_coords[set].as_ref() {
                            let data = &mesh.tex_coords(set)[offset..offset + len];
                            queue.write_buffer(buf, (offset * 8) as u64, bytemuck::cast_slice(data));
                        }
                    }
                }
            }

            if plan.uniform {
                queue.write_buffer(&g.uniform, 0, bytemuck::bytes_of(&node_uniform(world)));
            }
        }

        // Index copies must stay 4-byte aligned; widen the range to even
        // element bounds.
        if !plan.indices.is_none() {
            let padded = mesh.padded_indices().to_vec();
            let g = mesh.gpu.as_ref().expect("apply_plan requires a live GpuMesh");
            match plan.indices {
                Upload::None => {}
                Upload::Full => queue.write_buffer(&g.indices, 0, bytemuck::cast_slice(&padded)),
                Upload::Sub { offset, len } => {
                    let start = offset & !1;
                    let end = ((offset + len + 1) & !1).min(padded.len());
                    queue.write_buffer(
                        &g.indices,
                        (start * 2) as u64,
                        bytemuck::cast_slice(&padded[start..end]),
                    );
                }
            }
        }

        if textures_changed {
            let uniform = mesh.gpu.as_ref().map(|g| g.uniform.clone());
            if let Some(uniform) = uniform {
                let bind_group = self.create_node_bind_group(ctx, mesh, variant, &uniform);
                if let Some(g) = mesh.gpu.as_mut() {
                    g.bind_group = bind_group;
                }
            }
        }
    }

    fn create_node_bind_group(
        &mut self,
        ctx: &RenderCtx<'_>,
        mesh: &MeshBuffers,
        variant: PipelineVariant,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        let p = self.pipelines.as_ref().expect("pipelines exist before bind groups");

        let textured = matches!(
            variant,
            PipelineVariant::Textured | PipelineVariant::TexturedVertexColor
        );

        if !textured {
            return ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tiamat node bind group"),
                layout: &p.node_bgl_plain,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                }],
            });
        }

        let placeholder = placeholder_texture(ctx);
        let resolve = |set: usize| -> TextureRef {
            match mesh.texture(set) {
                Some(t) if t.view().is_some() => t.clone(),
                Some(t) => {
                    log::error!("texture '{}' has no GPU data; using placeholder", t.key());
                    placeholder.clone()
                }
                None => placeholder.clone(),
            }
        };
        let t0 = resolve(0);
        let t1 = resolve(1);

        // Placeholder always carries GPU data, so these cannot miss.
        let view0 = t0.view().or_else(|| placeholder.view()).expect("placeholder has a view");
        let samp0 = t0.sampler().or_else(|| placeholder.sampler()).expect("placeholder has a sampler");
        let view1 = t1.view().or_else(|| placeholder.view()).expect("placeholder has a view");
        let samp1 = t1.sampler().or_else(|| placeholder.sampler()).expect("placeholder has a sampler");

        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat node bind group (textured)"),
            layout: &p.node_bgl_textured,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(view0) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(samp0) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(view1) },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::Sampler(samp1) },
            ],
        })
    }

    // ── pipelines ─────────────────────────────────────────────────────────

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipelines.is_some() {
            return;
        }

        let device = ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tiamat scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat frame bgl"),
            entries: &[uniform_entry(0, std::mem::size_of::<ViewportUniform>() as u64)],
        });

        let node_bgl_plain = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat node bgl"),
            entries: &[uniform_entry(0, std::mem::size_of::<NodeUniform>() as u64)],
        });

        let node_bgl_textured = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tiamat node bgl (textured)"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<NodeUniform>() as u64),
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat plain pipeline layout"),
            bind_group_layouts: &[&frame_bgl, &node_bgl_plain],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tiamat textured pipeline layout"),
            bind_group_layouts: &[&frame_bgl, &node_bgl_textured],
            immediate_size: 0,
        });

        let make = |layout: &wgpu::PipelineLayout,
                    label: &str,
                    vs: &str,
                    fs: &str,
                    buffers: &[wgpu::VertexBufferLayout<'_>]| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs),
                    compilation_options: Default::default(),
                    buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(premul_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: Some(wgpu::IndexFormat::Uint16),
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
            })
        };

        let solid = make(&plain_layout, "tiamat solid pipeline", "vs_solid", "fs_solid", &[
            vb_layout(8, &POS_ATTRS),
        ]);
        let vertex_color = make(
            &plain_layout,
            "tiamat vertex-color pipeline",
            "vs_color",
            "fs_color",
            &[vb_layout(8, &POS_ATTRS), vb_layout(16, &COLOR_ATTRS_LOC1)],
        );
        let textured = make(
            &textured_layout,
            "tiamat textured pipeline",
            "vs_tex",
            "fs_tex",
            &[
                vb_layout(8, &POS_ATTRS),
                vb_layout(8, &UV_ATTRS_LOC1),
                vb_layout(8, &UV_ATTRS_LOC2),
            ],
        );
        let textured_vertex_color = make(
            &textured_layout,
            "tiamat textured vertex-color pipeline",
            "vs_tex_color",
            "fs_tex_color",
            &[
                vb_layout(8, &POS_ATTRS),
                vb_layout(16, &COLOR_ATTRS_LOC1),
                vb_layout(8, &UV_ATTRS_LOC2),
                vb_layout(8, &UV_ATTRS_LOC3),
            ],
        );

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tiamat viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiamat frame bind group"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipelines = Some(Pipelines {
            node_bgl_plain,
            node_bgl_textured,
            solid,
            vertex_color,
            textured,
            textured_vertex_color,
            viewport_ubo,
            frame_bind_group,
        });
        self.epoch += 1;
    }
}

fn variant_for(mesh: &MeshBuffers) -> PipelineVariant {
    let textured = mesh.texture(0).is_some() && mesh.has_tex_coords(0);
    match (textured, mesh.has_vertex_colors()) {
        (false, false) => PipelineVariant::Solid,
        (false, true) => PipelineVariant::VertexColor,
        (true, false) => PipelineVariant::Textured,
        (true, true) => PipelineVariant::TexturedVertexColor,
    }
}

fn node_uniform(world: &[f32; 20]) -> NodeUniform {
    let mut matrix = [0.0f32; 16];
    matrix.copy_from_slice(&world[..16]);
    let a = world[19].clamp(0.0, 1.0);
    NodeUniform {
        world: matrix,
        tint: [
            world[16].clamp(0.0, 1.0) * a,
            world[17].clamp(0.0, 1.0) * a,
            world[18].clamp(0.0, 1.0) * a,
            a,
        ],
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(size),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// The shared 1×1 white texture, created on first use through the
/// process-wide cache so every node referencing it shares one GPU object.
fn placeholder_texture(ctx: &RenderCtx<'_>) -> TextureRef {
    texture_cache().borrow_mut().lookup_or_insert_with("#placeholder", || {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tiamat placeholder texture"),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255u8, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor::default());
        Rc::new(Texture::new("#placeholder", 1, 1).with_gpu(view, sampler))
    })
}
