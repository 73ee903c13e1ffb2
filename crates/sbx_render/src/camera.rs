//! Free-flying perspective camera for a Z-up world.
//!
//! Yaw rotates about +Z with 0 looking down +X; pitch is elevation above the
//! XY plane. Horizontal movement stays in the XY plane regardless of pitch so
//! looking down while holding W does not dive into the floor.

use glam::{Mat4, Vec3};
use sbx_core::input::{InputState, Key};
use sbx_core::math::wrap_angle;

const PITCH_LIMIT_DEG: f32 = 89.0;
const FAST_MULTIPLIER: f32 = 4.0;
const SCROLL_STEP: f32 = 1.2;
const MIN_SPEED_MULTIPLIER: f32 = 0.01;
const MAX_SPEED_MULTIPLIER: f32 = 100.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub world_to_clip: [[f32; 4]; 4],
    /// xyz = camera position, w unused.
    pub cam_pos: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub vfov: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second before the speed multiplier.
    pub base_speed: f32,
    pub speed_multiplier: f32,
    /// Radians per pixel of raw mouse motion.
    pub mouse_sensitivity: f32,
    pub aspect: f32,
}

impl FlyCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, -5.0, 1.75),
            yaw: 90f32.to_radians(),
            pitch: -10f32.to_radians(),
            vfov: 70f32.to_radians(),
            near: 1.0 / 16.0,
            far: 1024.0,
            base_speed: 4.0,
            speed_multiplier: 1.0,
            mouse_sensitivity: 0.0025,
            aspect,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(cp * cy, cp * sy, sp)
    }

    fn planar_forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(cy, sy, 0.0)
    }

    fn planar_right(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(sy, -cy, 0.0)
    }

    pub fn set_angles(&mut self, yaw: f32, pitch: f32) {
        let limit = PITCH_LIMIT_DEG.to_radians();
        self.yaw = wrap_angle(yaw, std::f32::consts::TAU);
        self.pitch = pitch.clamp(-limit, limit);
    }

    pub fn speed(&self) -> f32 {
        self.base_speed * self.speed_multiplier
    }

    pub fn update(&mut self, input: &InputState, dt: f32, mouse_look: bool) {
        if mouse_look {
            let (dx, dy) = input.mouse_delta();
            let yaw = self.yaw - dx as f32 * self.mouse_sensitivity;
            let pitch = self.pitch - dy as f32 * self.mouse_sensitivity;
            self.set_angles(yaw, pitch);
        }

        let scroll = input.scroll_delta();
        if scroll != 0.0 {
            self.speed_multiplier = (self.speed_multiplier * SCROLL_STEP.powf(scroll))
                .clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER);
        }

        let axis = |pos: Key, neg: Key| -> f32 {
            (input.is_held(pos) as i32 - input.is_held(neg) as i32) as f32
        };
        let vertical = (input.is_held(Key::E) || input.is_held(Key::Space)) as i32
            - (input.is_held(Key::Q) || input.is_held(Key::LCtrl)) as i32;

        let dir = self.planar_forward() * axis(Key::W, Key::S)
            + self.planar_right() * axis(Key::D, Key::A)
            + Vec3::Z * vertical as f32;
        if dir == Vec3::ZERO {
            return;
        }

        let mut speed = self.speed();
        if input.is_held(Key::LShift) {
            speed *= FAST_MULTIPLIER;
        }
        self.position += dir.normalize() * speed * dt;
    }

    pub fn world_to_clip(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.vfov, self.aspect.max(1e-4), self.near, self.far);
        let view = Mat4::look_to_rh(self.position, self.forward(), Vec3::Z);
        proj * view
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            world_to_clip: self.world_to_clip().to_cols_array_2d(),
            cam_pos: self.position.extend(1.0).to_array(),
        }
    }
}
