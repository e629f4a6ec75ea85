//! Window, event loop and per-frame orchestration.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use prism_camera::{Camera, CameraController, ControllerKind, InputState};
use prism_core::Document;
use prism_render::gpu::create_device;
use prism_render::{scene_size, FrameRenderer, GpuResources, RenderSettings, Viewport, WgpuDevice};
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::input::apply_event;
use crate::overlay::{Overlay, OverlayResponse};

/// Startup state for the interactive viewer.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub width: u32,
    pub height: u32,
    pub scene: Option<usize>,
    pub camera: Option<Camera>,
    pub settings: RenderSettings,
}

pub struct Viewer {
    document: Document,
    options: ViewerOptions,
    state: Option<WindowState>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    pub fn new(document: Document, options: ViewerOptions) -> Self {
        Self {
            document,
            options,
            state: None,
            error: None,
        }
    }

    /// Run until the window closes.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{:#}", e);
        self.error = Some(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match WindowState::new(event_loop, &self.document, &self.options) {
            Ok(state) => self.state = Some(state),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let _ = state.egui_state.on_window_event(&state.window, &event);

        match &event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(*size),
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.redraw(&self.document) {
                    self.fail(event_loop, e);
                }
            }
            _ => {
                apply_event(&mut state.input, &event);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

/// Everything that lives as long as the window.
struct WindowState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    backend: WgpuDevice,
    resources: GpuResources,
    renderer: FrameRenderer,
    controller: CameraController,
    speed: f32,
    settings: RenderSettings,
    input: InputState,
    overlay: Overlay,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    last_update: Instant,
}

impl WindowState {
    fn new(event_loop: &ActiveEventLoop, document: &Document, options: &ViewerOptions) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title("Prism")
            .with_inner_size(PhysicalSize::new(options.width, options.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let (adapter, device, queue) = pollster::block_on(create_device(&instance, Some(&surface)))?;

        let capabilities = surface.get_capabilities(&adapter);
        // egui expects a non-sRGB target; the shader encodes gamma itself
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let device = Arc::new(device);
        let queue = Arc::new(queue);
        let mut backend = WgpuDevice::new(device.clone(), queue.clone(), format)?;
        let resources = GpuResources::build(&mut backend, document)?;
        let renderer = FrameRenderer::new(&backend, document, options.scene);

        let camera = options.camera.unwrap_or_else(|| renderer.default_camera());
        let speed = 0.5 * scene_size(renderer.bounds());
        let controller = CameraController::new(ControllerKind::default(), camera, speed);

        let egui_ctx = egui::Context::default();
        let viewport_id = egui_ctx.viewport_id();
        let egui_state = egui_winit::State::new(
            egui_ctx,
            viewport_id,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        info!(
            width = config.width,
            height = config.height,
            ?format,
            controller = controller.kind().label(),
            "window ready"
        );

        Ok(Self {
            window,
            surface,
            config,
            device,
            queue,
            backend,
            resources,
            renderer,
            controller,
            speed,
            settings: options.settings,
            input: InputState::new(),
            overlay: Overlay::new(),
            egui_state,
            egui_renderer,
            last_update: Instant::now(),
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        debug!(width = size.width, height = size.height, "surface resized");
    }

    /// Draw the scene and overlay, then let the controller react to input.
    fn redraw(&mut self, document: &Document) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to acquire surface texture"),
        };

        let camera = self.controller.camera();
        let viewport = Viewport::new(self.config.width, self.config.height);
        self.backend
            .set_target_view(frame.texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.renderer.render(
            &mut self.backend,
            document,
            &self.resources,
            &camera,
            &self.settings,
            viewport,
        )?;

        let ctx = self.egui_state.egui_ctx().clone();
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let kind = self.controller.kind();
        let mut response = OverlayResponse::default();
        let output = ctx.run(raw_input, |ctx| {
            response = self.overlay.show(ctx, &camera, kind, &mut self.settings);
        });
        self.egui_state
            .handle_platform_output(&self.window, output.platform_output);
        let paint_jobs = ctx.tessellate(output.shapes, output.pixels_per_point);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: output.pixels_per_point,
        };

        for (id, delta) in &output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        let callbacks = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen,
        );
        {
            let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &paint_jobs, &screen);
        }
        self.queue
            .submit(callbacks.into_iter().chain(std::iter::once(encoder.finish())));
        for id in &output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;

        if let Some(kind) = response.controller {
            self.controller.switch_to(kind, self.speed);
            info!(controller = kind.label(), "switched camera controller");
        }
        if !(ctx.wants_pointer_input() || ctx.wants_keyboard_input()) {
            self.controller.update(&self.input, elapsed);
        }

        frame.present();
        Ok(())
    }
}
