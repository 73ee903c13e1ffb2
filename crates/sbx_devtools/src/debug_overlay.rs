//! Debug overlay rendered via egui on top of the scene.
//!
//! Integration pattern: egui requires a three-phase render split because
//! `egui_wgpu::Renderer::render()` needs a `RenderPass<'static>`, while
//! `begin_render_pass` borrows the encoder. The phases are:
//!
//!   1. `prepare()` -- run egui UI logic, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers (borrows encoder mutably)
//!   3. `paint()`   -- render into a new render pass with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! The stats panel is toggled with F3. Resources that failed to load are
//! listed in a separate banner that is shown even while the panel is hidden,
//! so a broken shader edit is visible without opening anything.

use sbx_core::time::FrameClock;
use winit::window::Window;

#[derive(Debug, Clone, Default)]
pub struct CameraStats {
    pub position: [f32; 3],
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub speed: f32,
}

/// One hot-reloaded resource as shown in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLine {
    pub label: String,
    /// "loaded", "fallback" or "stale".
    pub status: &'static str,
    pub error: Option<String>,
}

impl ResourceLine {
    pub fn summary(&self) -> String {
        format!("{:<8} {}", self.status, self.label)
    }

    /// One-line form of the error for the banner. Compiler diagnostics are
    /// many lines long and open with a `...failed:` line, so a heading that
    /// ends in a colon is joined with the first diagnostic line after it.
    pub fn error_headline(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        let mut lines = error.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines.next().unwrap_or_default();
        match lines.next() {
            Some(detail) if first.ends_with(':') => Some(format!("{first} {detail}")),
            _ => Some(first.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub draw_calls: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub vsync: bool,
    pub fullscreen: bool,
    pub mouse_look: bool,
    pub camera: CameraStats,
    pub resources: Vec<ResourceLine>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    /// User clicked "Reload all"
    pub reload_all: bool,
    pub toggle_vsync: bool,
    pub toggle_fullscreen: bool,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: true,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        clock: &FrameClock,
        stats: &OverlayStats,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if self.visible {
                egui::Window::new("Sandbox")
                    .default_pos([10.0, 10.0])
                    .show(ctx, |ui| {
                        ui.label(format!(
                            "FPS: {:.1} ({:.2} ms)",
                            clock.smoothed_fps, clock.smoothed_frame_time_ms
                        ));
                        ui.label(format!("Frame: {}", clock.frame_count));

                        ui.separator();
                        let cam = &stats.camera;
                        ui.label(format!(
                            "Camera: ({:.2}, {:.2}, {:.2})",
                            cam.position[0], cam.position[1], cam.position[2]
                        ));
                        ui.label(format!(
                            "Yaw {:.1}\u{b0}  Pitch {:.1}\u{b0}  Speed {:.2}",
                            cam.yaw_deg, cam.pitch_deg, cam.speed
                        ));
                        ui.label(if stats.mouse_look {
                            "Mouse look: ON (Esc to release)"
                        } else {
                            "Mouse look: OFF (right click)"
                        });

                        ui.separator();
                        ui.label(format!("Draw calls: {}", stats.draw_calls));
                        ui.label(format!(
                            "Vertices: {}  Triangles: {}",
                            stats.vertex_count, stats.triangle_count
                        ));

                        ui.separator();
                        ui.horizontal(|ui| {
                            let vsync = if stats.vsync { "VSync: ON" } else { "VSync: OFF" };
                            if ui.button(vsync).clicked() {
                                actions.toggle_vsync = true;
                            }
                            let fs = if stats.fullscreen { "Windowed" } else { "Fullscreen" };
                            if ui.button(fs).clicked() {
                                actions.toggle_fullscreen = true;
                            }
                            if ui.button("Reload all").clicked() {
                                actions.reload_all = true;
                            }
                        });

                        ui.separator();
                        egui::CollapsingHeader::new(format!(
                            "Resources ({})",
                            stats.resources.len()
                        ))
                        .default_open(true)
                        .show(ui, |ui| {
                            for line in &stats.resources {
                                let text = egui::RichText::new(line.summary()).monospace();
                                if line.error.is_some() {
                                    ui.label(text.color(egui::Color32::LIGHT_RED));
                                } else {
                                    ui.label(text);
                                }
                            }
                        });
                    });
            }

            let failing: Vec<&ResourceLine> =
                stats.resources.iter().filter(|r| r.error.is_some()).collect();
            if !failing.is_empty() {
                egui::Area::new(egui::Id::new("reload_errors"))
                    .anchor(egui::Align2::LEFT_BOTTOM, [10.0, -10.0])
                    .show(ctx, |ui| {
                        for line in failing {
                            ui.colored_label(
                                egui::Color32::LIGHT_RED,
                                format!(
                                    "{} ({}): {}",
                                    line.label,
                                    line.status,
                                    line.error_headline().unwrap_or_default()
                                ),
                            );
                        }
                    });
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures that egui no longer needs. Call after rendering.
    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_headline_includes_first_diagnostic() {
        let line = ResourceLine {
            label: "assets/shaders/mesh.wgsl".to_string(),
            status: "stale",
            error: Some("Shader 'mesh' parse failed:\nerror: expected ';'\n  ┌─ wgsl:3:5".to_string()),
        };
        assert_eq!(
            line.error_headline().as_deref(),
            Some("Shader 'mesh' parse failed: error: expected ';'")
        );
        assert!(line.summary().starts_with("stale"));
        assert!(line.summary().ends_with("mesh.wgsl"));
    }

    #[test]
    fn loaded_resource_has_no_headline() {
        let line = ResourceLine {
            label: "a.obj".to_string(),
            status: "loaded",
            error: None,
        };
        assert_eq!(line.error_headline(), None);
    }

    #[test]
    fn single_line_error_is_its_own_headline() {
        let line = ResourceLine {
            label: "a.obj".to_string(),
            status: "fallback",
            error: Some("Failed to read mesh file a.obj: not found\n".to_string()),
        };
        assert_eq!(
            line.error_headline().as_deref(),
            Some("Failed to read mesh file a.obj: not found")
        );
    }
}
