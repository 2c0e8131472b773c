//! Particle Collision Visualizer
//!
//! Animated proton-proton collisions inside ATLAS, CMS, ALICE and LHCb style
//! detector geometry.

mod gui;
mod options;

use collider_physics::MagneticFieldTable;
use collider_renderer::{GpuContext, SceneRenderer};
use collider_simulation::{ColliderVisualizer, LayerSelection, MountTarget};
use glam::Vec2;
use gui::{Gui, UiAction, UiState};
use options::ViewerOptions;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Wheel delta per line, in the pixel units the camera zoom expects
const WHEEL_LINE_PIXELS: f32 = 100.0;

struct GpuState {
    context: GpuContext,
    renderer: SceneRenderer,
    gui: Gui,
    ui_state: UiState,
    visualizer: ColliderVisualizer,
    selections: Receiver<LayerSelection>,
    cursor: Option<Vec2>,
    last_frame_time: Instant,
    frame_times: VecDeque<f32>,
}

impl GpuState {
    async fn new(window: Arc<Window>, options: &ViewerOptions) -> Option<Self> {
        let size = window.inner_size();

        let context = match GpuContext::new(window.clone(), size.width, size.height).await {
            Ok(context) => context,
            Err(err) => {
                log::warn!("Render backend unavailable: {err}; visualization disabled");
                return None;
            }
        };

        let renderer = SceneRenderer::new(&context.device, &context.config);
        log::info!("✓ Renderer initialized");

        let gui = Gui::new(&context.device, context.config.format, &window);

        let (tx, selections) = mpsc::channel();
        let mut visualizer =
            ColliderVisualizer::new(MagneticFieldTable::default(), tx, options.seed);
        visualizer.set_detector(options.detector.name());
        let mut ui_state = UiState::new(options.detector);
        ui_state.mounted = visualizer.mount(Some(MountTarget {
            width: size.width,
            height: size.height,
        }));
        log::info!("✓ Visualizer mounted: {} (seed {})", ui_state.mounted, options.seed);

        Some(Self {
            context,
            renderer,
            gui,
            ui_state,
            visualizer,
            selections,
            cursor: None,
            last_frame_time: Instant::now(),
            frame_times: VecDeque::with_capacity(100),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size.width, new_size.height);
        self.renderer.resize(&self.context.device, &self.context.config);
        if self.visualizer.is_mounted() {
            self.visualizer.resize(new_size.width, new_size.height);
        } else {
            self.ui_state.mounted = self.visualizer.mount(Some(MountTarget {
                width: new_size.width,
                height: new_size.height,
            }));
        }
    }

    fn unmount(&mut self) {
        self.visualizer.unmount();
        let freed = self.renderer.release(self.visualizer.take_released());
        log::debug!("Freed {freed} GPU meshes on unmount");
        self.ui_state.mounted = false;
    }

    fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Run(config) => self.visualizer.run_simulation(config),
            UiAction::Clear => self.visualizer.clear_animation(),
            UiAction::SetDetector(kind) => self.visualizer.set_detector(kind.name()),
            UiAction::ToggleLabels => self.visualizer.toggle_labels(),
            UiAction::TogglePause => self.visualizer.toggle_pause(),
            UiAction::Step => self.visualizer.step(),
        }
    }

    fn render(&mut self, window: &Window) -> Result<(f32, f32), wgpu::SurfaceError> {
        // Track frame time
        let now = Instant::now();
        let elapsed = now - self.last_frame_time;
        self.last_frame_time = now;

        // Simulation, camera and labels, in that order
        let output = self.visualizer.frame(elapsed);

        while let Ok(selection) = self.selections.try_recv() {
            log::info!("Layer selected: {}", selection.layer_name);
            self.ui_state.selection = Some(selection);
        }

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        self.renderer.release(self.visualizer.take_released());
        if let Some(scene) = self.visualizer.scene_mut() {
            self.renderer.sync(&self.context.device, scene);
            self.renderer.render(
                &self.context.device,
                &self.context.queue,
                &mut encoder,
                &view,
                scene,
            );
        }

        let frame_time = elapsed.as_secs_f32() * 1000.0;
        self.frame_times.push_back(frame_time);
        if self.frame_times.len() > 100 {
            self.frame_times.pop_front();
        }
        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let fps = if avg_frame_time > 0.0 {
            1000.0 / avg_frame_time
        } else {
            0.0
        };

        let animation = self.visualizer.animation();
        self.ui_state.fps = fps;
        self.ui_state.frame_time = avg_frame_time;
        self.ui_state.paused = animation.is_paused();
        self.ui_state.frame = animation.frame();
        self.ui_state.phase = animation.phase();
        self.ui_state.labels_visible = self.visualizer.interaction().labels_visible();
        self.ui_state.hovered = self.visualizer.interaction().hovered();
        self.ui_state.summary = self.visualizer.summary_labels();
        self.ui_state.layer_labels = output.map(|output| output.labels).unwrap_or_default();
        self.ui_state.scene_stats = self.visualizer.stats();
        self.ui_state.gpu_stats = self.renderer.stats();

        let actions = self.gui.render(
            &self.context.device,
            &self.context.queue,
            &mut encoder,
            window,
            &view,
            &mut self.ui_state,
        );

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        for action in actions {
            self.apply(action);
        }

        Ok((fps, avg_frame_time))
    }

    fn handle_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = Some(position);
                self.visualizer.pointer_move(position);
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.visualizer.pointer_left();
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(cursor) = self.cursor else {
                    return;
                };
                match state {
                    ElementState::Pressed if !self.gui.wants_pointer() => {
                        self.visualizer.pointer_down(cursor)
                    }
                    ElementState::Pressed => {}
                    ElementState::Released => {
                        self.visualizer.pointer_up(cursor);
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } if !self.gui.wants_pointer() => {
                // Positive zooms out, matching a page scrolling down
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_x, y) => -y * WHEEL_LINE_PIXELS,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                };
                self.visualizer.wheel(delta_y);
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !self.gui.wants_keyboard() => match key_code {
                KeyCode::Space => self.visualizer.toggle_pause(),
                KeyCode::Period => self.visualizer.step(),
                KeyCode::KeyL => self.visualizer.toggle_labels(),
                KeyCode::KeyX => self.visualizer.clear_animation(),
                _ => {}
            },

            _ => {}
        }
    }
}

struct App {
    options: ViewerOptions,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title("Collider Visualizer")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.options.width,
                self.options.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());
        self.gpu_state = pollster::block_on(GpuState::new(window, &self.options));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Handle GUI events
        if let (Some(gpu_state), Some(window)) = (&mut self.gpu_state, &self.window) {
            if gpu_state.gui.handle_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.unmount();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::RedrawRequested => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    match gpu_state.render(window) {
                        Ok((fps, frame_time)) => {
                            window.set_title(&format!(
                                "Collider Visualizer - {:.0} FPS ({:.2}ms)",
                                fps, frame_time
                            ));
                        }
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu_state.context.reconfigure()
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            gpu_state.unmount();
                            event_loop.exit()
                        }
                        Err(e) => log::warn!("Render error: {:?}", e),
                    }
                }
            }

            other => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.handle_input(&other);
                }
            }
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = ViewerOptions::from_env();
    log::info!(
        "Starting collider visualizer ({}, {}x{})",
        options.detector,
        options.width,
        options.height
    );

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        options,
        window: None,
        gpu_state: None,
    };

    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
    }
}
