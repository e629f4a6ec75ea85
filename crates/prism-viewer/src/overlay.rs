//! egui overlay: frame rate, camera readout and lighting controls.

use std::f32::consts::{PI, TAU};
use std::time::{Duration, Instant};

use glam::Vec3;
use prism_camera::{lookat_argument, Camera, ControllerKind};
use prism_render::RenderSettings;
use tracing::info;

const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Frames per second averaged over a short window.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// What the user changed this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayResponse {
    pub controller: Option<ControllerKind>,
}

pub struct Overlay {
    fps: FpsCounter,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    pub fn new() -> Self {
        Self {
            fps: FpsCounter::new(Instant::now()),
        }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        camera: &Camera,
        controller: ControllerKind,
        settings: &mut RenderSettings,
    ) -> OverlayResponse {
        self.fps.tick(Instant::now());
        let mut response = OverlayResponse::default();

        egui::Window::new("Prism")
            .default_pos([10.0, 10.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("{:.1} fps", self.fps.fps()));
                ui.separator();

                egui::Grid::new("camera").num_columns(2).show(ui, |ui| {
                    let rows = [
                        ("eye", camera.eye()),
                        ("center", camera.center()),
                        ("up", camera.up()),
                        ("front", camera.front()),
                        ("left", camera.left()),
                    ];
                    for (name, v) in rows {
                        ui.label(name);
                        ui.monospace(format!("{:>8.3} {:>8.3} {:>8.3}", v.x, v.y, v.z));
                        ui.end_row();
                    }
                });
                if ui.button("Copy --lookat").clicked() {
                    let argument = lookat_argument(camera);
                    info!(%argument, "copied camera");
                    ui.ctx().copy_text(argument);
                }
                ui.separator();

                let mut kind = controller;
                ui.horizontal(|ui| {
                    for option in [ControllerKind::FirstPerson, ControllerKind::Trackball] {
                        ui.radio_value(&mut kind, option, option.label());
                    }
                });
                if kind != controller {
                    response.controller = Some(kind);
                }
                ui.separator();

                ui.add(egui::Slider::new(&mut settings.light_theta, 0.0..=PI).text("light theta"));
                ui.add(egui::Slider::new(&mut settings.light_phi, 0.0..=TAU).text("light phi"));
                ui.add(egui::Slider::new(&mut settings.light_intensity, 0.0..=10.0).text("intensity"));
                ui.horizontal(|ui| {
                    let mut color = settings.light_color.to_array();
                    if ui.color_edit_button_rgb(&mut color).changed() {
                        settings.light_color = Vec3::from_array(color);
                    }
                    ui.label("light color");
                });
                ui.checkbox(&mut settings.light_from_camera, "light from camera");
                ui.checkbox(&mut settings.normal_mapping, "normal mapping");
            });

        response
    }
}
