//! Small scalar helpers that glam does not cover.

use glam::Vec3;

/// Convert one sRGB-encoded 8-bit channel to linear.
pub fn srgb_channel_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB 8-bit color to linear RGB.
pub fn srgb8(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(
        srgb_channel_to_linear(r),
        srgb_channel_to_linear(g),
        srgb_channel_to_linear(b),
    )
}

/// Floating modulo whose result always has the sign of `range`.
pub fn wrap_angle(value: f32, range: f32) -> f32 {
    let ret = value % range;
    if range > 0.0 {
        if ret < 0.0 {
            ret + range
        } else {
            ret
        }
    } else if ret > 0.0 {
        ret + range
    } else {
        ret
    }
}
