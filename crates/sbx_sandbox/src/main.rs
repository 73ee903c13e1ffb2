//! Render sandbox -- main loop and application entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. Everything happens in
//! `RedrawRequested` with a variable timestep:
//!
//!   1. `begin_frame()` -- measure the (capped) wall-clock delta
//!   2. Handle hotkeys, then poll hot-reload watchers at the frame boundary
//!   3. Fly the camera and upload its uniform
//!   4. Draw the static geometry and scene meshes, composite the egui overlay
//!
//! Hot reload: the scene JSON, the WGSL shader, every texture and every OBJ
//! mesh are watched via mtime polling. A reload that fails keeps the previous
//! resource and shows the error on screen.

mod config;
mod resources;
mod scene;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{SandboxConfig, CONFIG_PATH};
use resources::{DrawStats, ResourceManager};
use sbx_core::input::{InputState, Key, MouseBtn};
use sbx_core::time::FrameClock;
use sbx_devtools::{CameraStats, DebugOverlay, OverlayStats};
use sbx_platform::window::{
    create_window, set_mouse_look, DisplayState, WindowPlacement, WINDOW_PLACEMENT_PATH,
};
use sbx_render::{FlyCamera, GpuContext};

/// Pixel scroll deltas (touchpads) are converted to lines at this rate.
const PIXELS_PER_SCROLL_LINE: f64 = 40.0;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.11,
    b: 0.13,
    a: 1.0,
};

/// All mutable sandbox state. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    clock: FrameClock,
    input: InputState,
    camera: FlyCamera,
    resources: ResourceManager,
    debug_overlay: DebugOverlay,
    display: DisplayState,
    mouse_look: bool,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl EngineState {
    fn new(window: Arc<Window>, config: &SandboxConfig) -> Self {
        let gpu = GpuContext::new(window.clone(), config.vsync);
        let resources = ResourceManager::new(
            &gpu,
            PathBuf::from(&config.scene_path),
            config.poll_interval(),
        );

        let mut camera = FlyCamera::new(gpu.aspect());
        camera.vfov = config.fov_deg.to_radians();
        camera.near = config.near;
        camera.far = config.far;
        camera.base_speed = config.camera_speed;
        camera.mouse_sensitivity = config.mouse_sensitivity;
        if let Some(start) = &resources.scene().camera {
            camera.position = Vec3::from_array(start.position);
            camera.set_angles(start.yaw_deg.to_radians(), start.pitch_deg.to_radians());
        }

        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = resources
            .layouts()
            .create_camera_bind_group(&gpu.device, &camera_buffer);

        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        Self {
            window,
            gpu,
            clock: FrameClock::new(),
            input: InputState::new(),
            camera,
            resources,
            debug_overlay,
            display: DisplayState::default(),
            mouse_look: false,
            camera_buffer,
            camera_bind_group,
        }
    }

    fn set_mouse_look(&mut self, enabled: bool) {
        self.mouse_look = set_mouse_look(&self.window, enabled);
        log::info!("Mouse look: {}", if self.mouse_look { "ON" } else { "OFF" });
    }

    fn toggle_vsync(&mut self) {
        let vsync = !self.gpu.vsync();
        self.gpu.set_vsync(vsync);
    }

    fn save_window_placement(&self) {
        let Some(placement) = self.display.placement_to_save(&self.window) else {
            return;
        };
        match placement.save(Path::new(WINDOW_PLACEMENT_PATH)) {
            Ok(()) => log::info!("Window placement saved to '{WINDOW_PLACEMENT_PATH}'"),
            Err(err) => log::error!("{err}"),
        }
    }

    fn overlay_stats(&self, draw: DrawStats) -> OverlayStats {
        OverlayStats {
            draw_calls: draw.draw_calls,
            vertex_count: draw.vertices,
            triangle_count: draw.triangles,
            vsync: self.gpu.vsync(),
            fullscreen: self.display.is_fullscreen(),
            mouse_look: self.mouse_look,
            camera: CameraStats {
                position: self.camera.position.to_array(),
                yaw_deg: self.camera.yaw.to_degrees(),
                pitch_deg: self.camera.pitch.to_degrees(),
                speed: self.camera.speed(),
            },
            resources: self.resources.status_lines(),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return;
        }

        self.clock.begin_frame();

        if self.input.is_just_pressed(Key::Escape) {
            if self.mouse_look {
                self.set_mouse_look(false);
            } else {
                log::info!("Escape pressed, exiting.");
                event_loop.exit();
                return;
            }
        }
        if self.input.is_just_pressed(Key::F3) {
            self.debug_overlay.toggle();
        }
        if self.input.is_just_pressed(Key::F1) {
            self.toggle_vsync();
        }
        if self.input.is_just_pressed(Key::F11) {
            self.display.toggle_fullscreen(&self.window);
        }
        if self.input.is_mouse_just_pressed(MouseBtn::Right) {
            self.set_mouse_look(!self.mouse_look);
        }

        // Frame boundary: nothing from the previous frame still references
        // the resources about to be swapped.
        if self.input.is_just_pressed(Key::R) {
            self.resources.reload_all(&self.gpu, "manual trigger (R)");
        } else {
            self.resources.poll(&self.gpu);
        }

        self.camera.aspect = self.gpu.aspect();
        self.camera
            .update(&self.input, self.clock.dt_f32(), self.mouse_look);
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );

        let Some((output, view)) = self.gpu.begin_frame() else {
            self.input.end_frame();
            return;
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let draw_stats = {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            self.resources
                .draw(&mut render_pass, &self.camera_bind_group)
        };

        let stats = self.overlay_stats(draw_stats);
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.debug_overlay
                .prepare(&self.window, &self.clock, &stats);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // Overlay buttons take effect between frames, like the hotkeys.
        if overlay_actions.reload_all {
            self.resources.reload_all(&self.gpu, "overlay button");
        }
        if overlay_actions.toggle_vsync {
            self.toggle_vsync();
        }
        if overlay_actions.toggle_fullscreen {
            self.display.toggle_fullscreen(&self.window);
        }

        self.input.end_frame();
    }
}

struct App {
    config: SandboxConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: SandboxConfig::load_or_default(Path::new(CONFIG_PATH)),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let placement = WindowPlacement::load(Path::new(WINDOW_PLACEMENT_PATH));
        let window = create_window(event_loop, &self.config.platform(), placement.as_ref());
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        self.state = Some(EngineState::new(window.clone(), &self.config));
        window.set_visible(true);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        // Raw motion keeps working while the cursor is locked.
        if let DeviceEvent::MouseMotion { delta } = event {
            if state.mouse_look {
                state.input.add_mouse_motion(delta.0, delta.1);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        // In mouse-look mode the cursor is hidden and egui must not steal input.
        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event)
            && !state.mouse_look;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.aspect = state.gpu.aspect();
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                state.input.release_all();
                if state.mouse_look {
                    state.set_mouse_look(false);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(sandbox_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(sandbox_key),
                            ElementState::Released => state.input.key_up(sandbox_key),
                        }
                    }
                }
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } if !egui_consumed => {
                if let Some(btn) = map_mouse_button(button) {
                    match button_state {
                        ElementState::Pressed => state.input.mouse_down(btn),
                        ElementState::Released => state.input.mouse_up(btn),
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } if !egui_consumed => {
                state.input.add_scroll(scroll_lines(delta));
            }

            WindowEvent::RedrawRequested => state.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.save_window_placement();
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyQ => Some(Key::Q),
        KeyCode::KeyE => Some(Key::E),
        KeyCode::KeyR => Some(Key::R),
        KeyCode::Space => Some(Key::Space),
        KeyCode::ShiftLeft => Some(Key::LShift),
        KeyCode::ControlLeft => Some(Key::LCtrl),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F1 => Some(Key::F1),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F11 => Some(Key::F11),
        _ => None,
    }
}

fn map_mouse_button(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        MouseButton::Right => Some(MouseBtn::Right),
        MouseButton::Middle => Some(MouseBtn::Middle),
        _ => None,
    }
}

fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_SCROLL_LINE) as f32,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Render sandbox starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn movement_and_hotkeys_are_mapped() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ShiftLeft), Some(Key::LShift));
        assert_eq!(map_key(KeyCode::F11), Some(Key::F11));
        assert_eq!(map_key(KeyCode::KeyZ), None);
    }

    #[test]
    fn pixel_scroll_converts_to_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0));
        assert_eq!(scroll_lines(pixels), 2.0);
    }

    #[test]
    fn only_primary_mouse_buttons_are_tracked() {
        assert_eq!(map_mouse_button(MouseButton::Right), Some(MouseBtn::Right));
        assert_eq!(map_mouse_button(MouseButton::Back), None);
    }
}
