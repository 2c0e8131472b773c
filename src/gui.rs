use collider_physics::{
    DetectorKind, ReactionProduct, SimulationConfig, SimulationRequest, SummaryLabels,
    DEFAULT_ENERGY_TEV, DEFAULT_EVENT_TYPE, DEFAULT_TRACK_COUNT,
};
use collider_renderer::GpuStats;
use collider_simulation::{LayerLabel, LayerSelection, Phase, ResourceStats};
use egui::{Color32, Context};
use egui_wgpu::{Renderer, RendererOptions};
use egui_winit::State;
use wgpu::{Device, TextureFormat};
use winit::{event::WindowEvent, window::Window};

/// Beam particle id used for reaction requests (proton)
const PROTON_ID: u32 = 2212;

/// Canned backend answers for the reaction panel
const REACTIONS: [(&str, Option<f64>, usize); 3] = [
    ("Higgs → γγ", Some(125.1), 2),
    ("QCD Dijet", None, 2),
    ("Minimum Bias", None, 0),
];

/// Something the user asked for this frame
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Run(SimulationConfig),
    Clear,
    SetDetector(DetectorKind),
    ToggleLabels,
    TogglePause,
    Step,
}

pub struct UiState {
    pub fps: f32,
    pub frame_time: f32,
    pub mounted: bool,
    pub detector: DetectorKind,
    pub energy: f64,
    pub track_count: u32,
    pub event_type: String,
    pub reaction: usize,
    pub labels_visible: bool,
    pub paused: bool,
    pub frame: u32,
    pub phase: Phase,
    pub summary: Option<SummaryLabels>,
    pub selection: Option<LayerSelection>,
    pub layer_labels: Vec<LayerLabel>,
    pub hovered: Option<&'static str>,
    pub scene_stats: ResourceStats,
    pub gpu_stats: GpuStats,
}

impl UiState {
    pub fn new(detector: DetectorKind) -> Self {
        Self {
            fps: 0.0,
            frame_time: 0.0,
            mounted: false,
            detector,
            energy: DEFAULT_ENERGY_TEV,
            track_count: DEFAULT_TRACK_COUNT,
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            reaction: 0,
            labels_visible: false,
            paused: false,
            frame: 0,
            phase: Phase::Idle,
            summary: None,
            selection: None,
            layer_labels: Vec::new(),
            hovered: None,
            scene_stats: ResourceStats::default(),
            gpu_stats: GpuStats::default(),
        }
    }

    fn run_config(&self) -> SimulationConfig {
        SimulationConfig::default()
            .with_detector(self.detector.name())
            .with_energy(self.energy)
            .with_track_count(self.track_count)
            .with_event_type(self.event_type.clone())
    }

    fn reaction_config(&self) -> SimulationConfig {
        let (name, mass, product_count) = REACTIONS[self.reaction % REACTIONS.len()];
        let request = SimulationRequest {
            particle1_id: PROTON_ID,
            particle2_id: PROTON_ID,
            energy: self.energy,
        };
        let product = ReactionProduct {
            name: Some(name.to_string()),
            mass,
            product_count,
        };
        SimulationConfig::from_reaction(&request, &product, Some(self.detector.name()))
    }
}

fn mocha(color: &catppuccin::Color) -> Color32 {
    Color32::from_rgb(color.rgb.r, color.rgb.g, color.rgb.b)
}

pub struct Gui {
    context: Context,
    state: State,
    renderer: Renderer,
}

impl Gui {
    pub fn new(device: &Device, output_color_format: TextureFormat, window: &Window) -> Self {
        let context = Context::default();
        let id = context.viewport_id();

        let state = State::new(
            context.clone(),
            id,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );

        let renderer = Renderer::new(
            device,
            output_color_format,
            RendererOptions {
                msaa_samples: 1,
                depth_stencil_format: None,
                dithering: false,
                ..Default::default()
            },
        );

        Self {
            context,
            state,
            renderer,
        }
    }

    /// Returns true when egui consumed the event
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        response.consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.context.is_pointer_over_area() || self.context.wants_pointer_input()
    }

    pub fn wants_keyboard(&self) -> bool {
        self.context.wants_keyboard_input()
    }

    pub fn render(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        view: &wgpu::TextureView,
        ui_state: &mut UiState,
    ) -> Vec<UiAction> {
        let raw_input = self.state.take_egui_input(window);

        let mut actions = Vec::new();
        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui(ctx, ui_state, &mut actions);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let size = window.inner_size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        let mut render_pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
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
            })
            .forget_lifetime();

        self.renderer
            .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        drop(render_pass);

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        actions
    }

    fn ui(ctx: &Context, state: &mut UiState, actions: &mut Vec<UiAction>) {
        let palette = &catppuccin::PALETTE.mocha.colors;

        if !state.mounted {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.label("Visualization unavailable");
                });
            });
            return;
        }

        Self::paint_layer_labels(ctx, state);

        // Run Controls (Top Left)
        egui::Window::new("Collision")
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                let previous = state.detector;
                egui::ComboBox::from_label("Detector")
                    .selected_text(state.detector.name())
                    .show_ui(ui, |ui| {
                        for kind in DetectorKind::ALL {
                            ui.selectable_value(&mut state.detector, kind, kind.name());
                        }
                    });
                if state.detector != previous {
                    actions.push(UiAction::SetDetector(state.detector));
                }

                ui.add(egui::Slider::new(&mut state.energy, 0.9..=14.0).text("Energy (TeV)"));
                ui.add(egui::Slider::new(&mut state.track_count, 0..=200).text("Tracks"));
                ui.horizontal(|ui| {
                    ui.label("Event");
                    ui.text_edit_singleline(&mut state.event_type);
                });

                ui.horizontal(|ui| {
                    if ui.button("Run").clicked() {
                        actions.push(UiAction::Run(state.run_config()));
                    }
                    if ui.button("Clear").clicked() {
                        actions.push(UiAction::Clear);
                    }
                    let pause = if state.paused { "Resume" } else { "Pause" };
                    if ui.button(pause).clicked() {
                        actions.push(UiAction::TogglePause);
                    }
                    if ui
                        .add_enabled(state.paused, egui::Button::new("Step"))
                        .clicked()
                    {
                        actions.push(UiAction::Step);
                    }
                });

                let mut labels = state.labels_visible;
                if ui.checkbox(&mut labels, "Layer labels").changed() {
                    actions.push(UiAction::ToggleLabels);
                }

                ui.separator();
                ui.heading("Reaction");
                egui::ComboBox::from_label("Product")
                    .selected_text(REACTIONS[state.reaction % REACTIONS.len()].0)
                    .show_ui(ui, |ui| {
                        for (i, (name, _, _)) in REACTIONS.iter().enumerate() {
                            ui.selectable_value(&mut state.reaction, i, *name);
                        }
                    });
                if ui.button("Run reaction").clicked() {
                    actions.push(UiAction::Run(state.reaction_config()));
                }
            });

        // Event Summary (Top Right)
        egui::Window::new("Event")
            .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| match &state.summary {
                Some(summary) => {
                    egui::Grid::new("summary").num_columns(2).show(ui, |ui| {
                        for (key, value) in [
                            ("Energy", &summary.energy),
                            ("Momentum", &summary.momentum),
                            ("Tracks", &summary.track_count),
                            ("Event", &summary.event_type),
                            ("Field", &summary.magnetic_field),
                        ] {
                            ui.label(key);
                            ui.colored_label(mocha(&palette.peach), value);
                            ui.end_row();
                        }
                    });
                }
                None => {
                    ui.label("No event");
                }
            });

        // Selected Layer (Bottom Right)
        if let Some(selection) = &state.selection {
            let description = selection
                .detector
                .and_then(|kind| kind.layer(&selection.layer_name))
                .map(|layer| layer.description)
                .unwrap_or("No description available.");
            let mut open = true;
            egui::Window::new(selection.layer_name.as_str())
                .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
                .resizable(false)
                .collapsible(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    if let Some(kind) = selection.detector {
                        ui.colored_label(mocha(&palette.subtext0), kind.name());
                    }
                    ui.label(description);
                });
            if !open {
                state.selection = None;
            }
        }

        // Diagnostics (Bottom Left)
        egui::Window::new("Diagnostics")
            .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
            .resizable(false)
            .collapsible(true)
            .default_open(false)
            .show(ctx, |ui| {
                ui.label(format!("FPS: {:.1}", state.fps));
                ui.label(format!("Frame Time: {:.2} ms", state.frame_time));
                ui.label(format!("Frame: {} ({:?})", state.frame, state.phase));
                ui.separator();
                ui.label(format!("Nodes: {}", state.scene_stats.nodes));
                ui.label(format!("Geometries: {}", state.scene_stats.geometries));
                ui.label(format!("Materials: {}", state.scene_stats.materials));
                ui.label(format!("GPU meshes: {}", state.gpu_stats.meshes));
                ui.label(format!("Draws: {}", state.gpu_stats.draws));
            });
    }

    fn paint_layer_labels(ctx: &Context, state: &UiState) {
        if state.layer_labels.is_empty() {
            return;
        }
        let palette = &catppuccin::PALETTE.mocha.colors;
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Background,
            egui::Id::new("layer_labels"),
        ));
        let pixels_per_point = ctx.pixels_per_point();

        for label in &state.layer_labels {
            let color = if state.hovered == Some(label.name) {
                mocha(&palette.yellow)
            } else {
                mocha(&palette.text)
            };
            painter.text(
                egui::pos2(
                    label.position.x / pixels_per_point,
                    label.position.y / pixels_per_point,
                ),
                egui::Align2::CENTER_BOTTOM,
                label.name,
                egui::FontId::proportional(13.0),
                color,
            );
        }
    }
}
