//! Tiamat studio: a demo driver for the scene-graph engine.
//!
//! Owns the pieces the engine deliberately does not: the winit window, the
//! wgpu device/surface, the frame loop, and mouse-to-touch translation. The
//! demo scene exercises every node kind — shapes, sprites, a nine-patch, an
//! animated sheet, a baked batch — with tweens driving the dirty paths.

use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use tiamat_engine::coords::{Rect, Vec2, Viewport};
use tiamat_engine::logging::{LoggingConfig, init_logging};
use tiamat_engine::paint::Color;
use tiamat_engine::render::{RenderCtx, RenderTarget, stats};
use tiamat_engine::scene::shapes::PlayMode;
use tiamat_engine::scene::{
    Easing, LoopMode, Node, Scene, TouchEvent, TouchPhase, Tween, ZIndex,
};
use tiamat_engine::texture::{Texture, TextureRef, texture_cache};
use tiamat_engine::time::FrameClock;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut app = Studio::new();
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;
    Ok(())
}

// ── GPU context ───────────────────────────────────────────────────────────

/// Owns the wgpu core objects and the surface configuration for the single
/// demo window. The surface borrows the window through an `Arc`, so no
/// self-referential plumbing is needed.
struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
}

impl Gpu {
    fn new(window: Arc<Window>) -> Result<Gpu> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tiamat-studio device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Gpu { surface, device, queue, config })
    }

    /// wgpu cannot configure a 0×0 surface; such resizes are deferred until
    /// the window becomes visible again.
    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }
}

// ── procedural demo textures ──────────────────────────────────────────────
//
// The engine never decodes image files; the demo uploads generated pixels.

fn upload_texture(gpu: &Gpu, key: &str, width: u32, height: u32, pixels: &[u8]) -> TextureRef {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(key),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    let tex: TextureRef = Rc::new(Texture::new(key, width, height).with_gpu(view, sampler));
    texture_cache().borrow_mut().insert(&tex);
    tex
}

fn checkerboard(gpu: &Gpu) -> TextureRef {
    const W: u32 = 32;
    let mut pixels = Vec::with_capacity((W * W * 4) as usize);
    for y in 0..W {
        for x in 0..W {
            let light = (x / 4 + y / 4) % 2 == 0;
            let (r, g, b) = if light { (235, 235, 235) } else { (70, 120, 200) };
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    upload_texture(gpu, "demo/checker", W, W, &pixels)
}

/// 30×30 panel with a 10 px border ring, for the nine-patch.
fn panel(gpu: &Gpu) -> TextureRef {
    const W: u32 = 30;
    let mut pixels = Vec::with_capacity((W * W * 4) as usize);
    for y in 0..W {
        for x in 0..W {
            let border = x < 10 || y < 10 || x >= 20 || y >= 20;
            let (r, g, b) = if border { (200, 140, 40) } else { (40, 40, 48) };
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    upload_texture(gpu, "demo/panel", W, W, &pixels)
}

/// Four 8×8 frames in a horizontal strip, each a different hue.
fn pulse_strip(gpu: &Gpu) -> TextureRef {
    const FRAME: u32 = 8;
    const FRAMES: u32 = 4;
    let colors: [(u8, u8, u8); 4] = [(220, 60, 60), (220, 180, 60), (60, 200, 90), (60, 120, 220)];

    let width = FRAME * FRAMES;
    let mut pixels = vec![0u8; (width * FRAME * 4) as usize];
    for frame in 0..FRAMES {
        let (r, g, b) = colors[frame as usize];
        for y in 0..FRAME {
            for x in 0..FRAME {
                let px = ((y * width + frame * FRAME + x) * 4) as usize;
                pixels[px..px + 4].copy_from_slice(&[r, g, b, 255]);
            }
        }
    }
    upload_texture(gpu, "demo/pulse", width, FRAME, &pixels)
}

// ── demo scene ────────────────────────────────────────────────────────────

fn build_scene(scene: &mut Scene, gpu: &Gpu, logical: Vec2) {
    let root = scene.root().clone();

    let background = Node::new_rect("background", logical);
    background.borrow_mut().set_color(Color::from_u8(24, 24, 30, 255));
    background.borrow_mut().set_z_index(ZIndex(-10));
    root.borrow_mut().add_child(&background);

    // Spinning rectangle.
    let spinner = Node::new_rect("spinner", Vec2::new(80.0, 80.0));
    {
        let mut n = spinner.borrow_mut();
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_position(Vec2::new(160.0, 140.0));
        n.set_color(Color::from_u8(90, 200, 160, 255));
        n.run_tween(Tween::rotation(0.0, 360.0, 4.0).with_loop_mode(LoopMode::Loop));
    }
    root.borrow_mut().add_child(&spinner);

    // Breathing circle.
    let circle = Node::new_circle("pulse-circle", 90.0);
    {
        let mut n = circle.borrow_mut();
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_position(Vec2::new(360.0, 140.0));
        n.set_color(Color::from_u8(200, 90, 120, 255));
        n.run_tween(
            Tween::scale(Vec2::splat(0.8), Vec2::splat(1.2), 1.2)
                .with_easing(Easing::QuadInOut)
                .with_loop_mode(LoopMode::PingPong),
        );
    }
    root.borrow_mut().add_child(&circle);

    // Tappable checker sprite gliding back and forth.
    let sprite = Node::new_sprite("checker", Some(checkerboard(gpu)));
    {
        let mut n = sprite.borrow_mut();
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_scale(Vec2::splat(3.0));
        n.run_tween(
            Tween::position(Vec2::new(160.0, 320.0), Vec2::new(560.0, 320.0), 3.0)
                .with_easing(Easing::QuadInOut)
                .with_loop_mode(LoopMode::PingPong),
        );
        n.set_touch_enabled(true);
        n.add_touch_listener(|event, phase| {
            if phase == TouchPhase::Tapped {
                log::info!("checker tapped at {:?}", event.position);
            }
        });
    }
    root.borrow_mut().add_child(&sprite);

    // Nine-patch panel stretched well past its texture size.
    let frame = Node::new_slice9("panel", Some(panel(gpu)), Rect::new(10.0, 10.0, 10.0, 10.0));
    {
        let mut n = frame.borrow_mut();
        n.set_size(Vec2::new(220.0, 120.0));
        n.set_position(Vec2::new(60.0, 420.0));
    }
    root.borrow_mut().add_child(&frame);

    // Animated sheet: four frames, looped.
    let pulse = Node::new_sheet("pulse", Some(pulse_strip(gpu)), Vec2::new(8.0, 8.0));
    {
        let mut n = pulse.borrow_mut();
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.set_position(Vec2::new(500.0, 480.0));
        n.set_scale(Vec2::splat(8.0));
        n.start_animation(0, 3, PlayMode::Loop, None, 0.12);
    }
    root.borrow_mut().add_child(&pulse);

    // A baked batch: many static tiles, one draw call.
    let batch = Node::new_baked_group("tiles");
    for i in 0..12 {
        let tile = Node::new_rect(format!("tile-{i}"), Vec2::new(14.0, 14.0));
        let mut t = tile.borrow_mut();
        t.set_position(Vec2::new(40.0 + 18.0 * i as f32, 40.0));
        t.set_color(Color::new(0.3 + 0.05 * i as f32, 0.4, 0.9 - 0.05 * i as f32, 1.0));
        drop(t);
        batch.borrow_mut().add_child(&tile);
    }
    root.borrow_mut().add_child(&batch);
}

// ── application ───────────────────────────────────────────────────────────

struct Studio {
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    scene: Scene,
    clock: FrameClock,
    started: Instant,

    pointer: Vec2,
    pointer_start: Vec2,
    pointer_down: bool,
}

impl Studio {
    fn new() -> Studio {
        Studio {
            window: None,
            gpu: None,
            scene: Scene::new(),
            clock: FrameClock::new(),
            started: Instant::now(),
            pointer: Vec2::zero(),
            pointer_start: Vec2::zero(),
            pointer_down: false,
        }
    }

    fn logical_size(&self) -> Vec2 {
        let Some(window) = self.window.as_ref() else { return Vec2::zero() };
        let size = window.inner_size();
        let scale = window.scale_factor();
        let logical: LogicalSize<f64> = size.to_logical(scale);
        Vec2::new(logical.width as f32, logical.height as f32)
    }

    fn touch_event(&self) -> TouchEvent {
        TouchEvent {
            id: 0,
            position: self.pointer,
            prev_position: self.pointer,
            start_position: self.pointer_start,
            timestamp: self.started.elapsed().as_secs_f64(),
        }
    }

    fn frame(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else { return };

        let ft = self.clock.tick();
        self.scene.advance(ft.dt);

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface out of memory; giving up");
                std::process::exit(1);
            }
            Err(err) => {
                log::debug!("skipping frame: {err}");
                return;
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tiamat-studio frame encoder"),
            });

        // Clear pass, dropped before the scene pass loads on top of it.
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tiamat-studio clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.05, g: 0.05, b: 0.07, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        stats::reset_draw_calls();
        let logical = self.logical_size();
        let ctx = RenderCtx::new(
            &gpu.device,
            &gpu.queue,
            gpu.config.format,
            Viewport::new(logical.x, logical.y),
        );
        {
            let mut target = RenderTarget::new(&mut encoder, &view);
            self.scene.render(&ctx, &mut target);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        if let Some(window) = self.window.as_ref() {
            window.pre_present_notify();
        }
        frame.present();

        if ft.frame_index % 300 == 0 {
            log::debug!("frame {}: {} draw calls", ft.frame_index, stats::draw_calls());
        }
    }
}

impl ApplicationHandler for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("tiamat studio")
            .with_inner_size(LogicalSize::new(640.0, 560.0));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        match Gpu::new(window.clone()) {
            Ok(gpu) => {
                let logical = {
                    let size = window.inner_size();
                    let logical: LogicalSize<f64> = size.to_logical(window.scale_factor());
                    Vec2::new(logical.width as f32, logical.height as f32)
                };
                build_scene(&mut self.scene, &gpu, logical);
                self.gpu = Some(gpu);
                self.window = Some(window);
                self.clock.reset();
            }
            Err(err) => {
                log::error!("GPU initialization failed: {err:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(window) = self.window.as_ref() {
                    let logical = position.to_logical::<f64>(window.scale_factor());
                    let prev = self.pointer;
                    self.pointer = Vec2::new(logical.x as f32, logical.y as f32);
                    if self.pointer_down {
                        let mut event = self.touch_event();
                        event.prev_position = prev;
                        self.scene.dispatch_touch_moved(&event);
                    }
                }
            }

            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                ElementState::Pressed => {
                    self.pointer_down = true;
                    self.pointer_start = self.pointer;
                    let event = self.touch_event();
                    self.scene.dispatch_touch_began(&event);
                }
                ElementState::Released => {
                    if self.pointer_down {
                        self.pointer_down = false;
                        let event = self.touch_event();
                        self.scene.dispatch_touch_ended(&event);
                    }
                }
            },

            WindowEvent::RedrawRequested => self.frame(),

            _ => {}
        }
    }
}
