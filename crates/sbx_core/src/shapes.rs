//! Procedural shape generators.
//!
//! World is Z-up and every shape rests on the plane `z = pos.z`. Vertices are
//! emitted unshared (three per triangle) and carry the default normal and uv;
//! colour encodes the local-space position so faces are distinguishable
//! without lighting.

use glam::{Mat3, Vec2, Vec3};

use crate::math::srgb8;
use crate::mesh::{MeshData, MeshVertex};

const FLOOR_LIGHT: (u8, u8, u8) = (224, 226, 228);
const FLOOR_DARK: (u8, u8, u8) = (41, 49, 52);

/// Upper bound on `grid_floor`'s half extent, in tiles.
pub const MAX_FLOOR_TILES: u32 = 128;
/// Upper bound on the subdivision of cylinders and spheres.
pub const MAX_FACES: u32 = 512;

fn corner_color(local: Vec3) -> Vec3 {
    local / 2.0 + 0.5
}

/// Cube of half-size `r`, 36 vertices.
pub fn cube(r: f32, pos: Vec3, ori: Mat3) -> MeshData {
    let pos = pos + Vec3::new(0.0, 0.0, r);
    let vert = |c: Vec3| MeshVertex::colored(ori * (r * c) + pos, corner_color(c));

    let lll = Vec3::new(-1.0, -1.0, -1.0);
    let hll = Vec3::new(1.0, -1.0, -1.0);
    let lhl = Vec3::new(-1.0, 1.0, -1.0);
    let hhl = Vec3::new(1.0, 1.0, -1.0);
    let llh = Vec3::new(-1.0, -1.0, 1.0);
    let hlh = Vec3::new(1.0, -1.0, 1.0);
    let lhh = Vec3::new(-1.0, 1.0, 1.0);
    let hhh = Vec3::new(1.0, 1.0, 1.0);

    let faces = [
        [llh, hlh, hhh, lhh], // top
        [hll, lll, lhl, hhl], // bottom
        [lhl, lll, llh, lhh], // -x
        [hll, hhl, hhh, hlh], // +x
        [lll, hll, hlh, llh], // -y
        [hhl, lhl, lhh, hhh], // +y
    ];

    let mut mesh = MeshData::new();
    for [a, b, c, d] in faces {
        mesh.push_quad(vert(a), vert(b), vert(c), vert(d));
    }
    mesh
}

/// Regular tetrahedron with circumradius `r`, 12 vertices. The base sits at
/// `-r/3` in local space and is lifted so it rests on `pos.z`.
pub fn tetrahedron(r: f32, pos: Vec3, ori: Mat3) -> MeshData {
    let pos = pos + Vec3::new(0.0, 0.0, r / 3.0);
    let base_z = -1.0 / 3.0;
    let (sin120, cos120) = 120f32.to_radians().sin_cos();
    let (sin240, cos240) = 240f32.to_radians().sin_cos();

    let a = (Vec3::new(1.0, 0.0, base_z), Vec3::X);
    let b = (Vec3::new(cos120, sin120, base_z), Vec3::Y);
    let c = (Vec3::new(cos240, sin240, base_z), Vec3::Z);
    let top = (Vec3::Z, Vec3::ONE);

    let vert = |(local, col): (Vec3, Vec3)| MeshVertex::colored(ori * (r * local) + pos, col);

    let mut mesh = MeshData::new();
    for [p, q, s] in [[a, c, b], [a, b, top], [b, c, top], [c, a, top]] {
        mesh.push_triangle(vert(p), vert(q), vert(s));
    }
    mesh
}

/// Capped cylinder along Z, `faces * 12` vertices.
pub fn cylinder(r: f32, length: f32, faces: u32, pos: Vec3) -> MeshData {
    let pos = pos + Vec3::new(0.0, 0.0, length / 2.0);
    let scale = Vec3::new(r, r, length / 2.0);
    let vert = |c: Vec3| MeshVertex::colored(scale * c + pos, corner_color(c));

    let mut mesh = MeshData::new();
    for i in 0..faces {
        let a = Vec2::from_angle(std::f32::consts::TAU * (i as f32 / faces as f32));
        let b = Vec2::from_angle(std::f32::consts::TAU * ((i + 1) as f32 / faces as f32));

        mesh.push_triangle(vert(b.extend(-1.0)), vert(a.extend(-1.0)), vert(Vec3::NEG_Z));
        mesh.push_quad(
            vert(a.extend(-1.0)),
            vert(b.extend(-1.0)),
            vert(b.extend(1.0)),
            vert(a.extend(1.0)),
        );
        mesh.push_triangle(vert(a.extend(1.0)), vert(b.extend(1.0)), vert(Vec3::Z));
    }
    mesh
}

/// UV sphere with `wfaces` segments around and `hfaces` rings. Pole rings are
/// triangle fans. Fewer than two segments or rings yields an empty mesh.
pub fn iso_sphere(r: f32, wfaces: u32, hfaces: u32, pos: Vec3) -> MeshData {
    let mut mesh = MeshData::new();
    if wfaces < 2 || hfaces < 2 {
        return mesh;
    }

    let pos = pos + Vec3::new(0.0, 0.0, r);
    let vert = |c: Vec3| MeshVertex::colored(r * c + pos, corner_color(c));
    let ring = |j: u32| Mat3::from_rotation_y(std::f32::consts::PI * (j as f32 / hfaces as f32));
    let segment = |i: u32| Mat3::from_rotation_z(std::f32::consts::TAU * (i as f32 / wfaces as f32));

    for j in 0..hfaces {
        let (ha, hb) = (ring(j), ring(j + 1));
        for i in 0..wfaces {
            let (wa, wb) = (segment(i), segment(i + 1));
            if j == 0 {
                mesh.push_triangle(vert(Vec3::Z), vert(wa * hb * Vec3::Z), vert(wb * hb * Vec3::Z));
            } else if j == hfaces - 1 {
                mesh.push_triangle(vert(wb * ha * Vec3::Z), vert(wa * ha * Vec3::Z), vert(Vec3::NEG_Z));
            } else {
                mesh.push_quad(
                    vert(wb * ha * Vec3::Z),
                    vert(wa * ha * Vec3::Z),
                    vert(wa * hb * Vec3::Z),
                    vert(wb * hb * Vec3::Z),
                );
            }
        }
    }
    mesh
}

/// Checkerboard floor of `2n x 2n` tiles centred on the origin. `n` is
/// clamped to `MAX_FLOOR_TILES`.
pub fn grid_floor(half_extent_tiles: u32, tile_dim: f32, z: f32) -> MeshData {
    if half_extent_tiles > MAX_FLOOR_TILES {
        log::warn!("Floor of {half_extent_tiles} tiles clamped to {MAX_FLOOR_TILES}");
    }
    let n = i32::try_from(half_extent_tiles.min(MAX_FLOOR_TILES)).unwrap_or(0);
    let light = srgb8(FLOOR_LIGHT.0, FLOOR_LIGHT.1, FLOOR_LIGHT.2);
    let dark = srgb8(FLOOR_DARK.0, FLOOR_DARK.1, FLOOR_DARK.2);
    let h = tile_dim / 2.0;

    let mut mesh = MeshData::new();
    for y in 0..n * 2 {
        for x in 0..n * 2 {
            let col = if (x % 2 == 0) != (y % 2 == 0) { light } else { dark };
            let center = Vec3::new(
                ((x - n) as f32 + 0.5) * tile_dim,
                ((y - n) as f32 + 0.5) * tile_dim,
                z,
            );
            let v = |dx: f32, dy: f32| MeshVertex::colored(center + Vec3::new(dx, dy, 0.0), col);
            mesh.push_quad(v(-h, -h), v(h, -h), v(h, h), v(-h, h));
        }
    }
    mesh
}

/// The stock arrangement shown when a scene asks for default shapes.
pub fn default_shapes() -> MeshData {
    let mut mesh = MeshData::new();
    mesh.extend(&cube(
        1.0,
        Vec3::new(0.0, 4.0, 0.0),
        Mat3::from_rotation_z(37f32.to_radians()),
    ));
    mesh.extend(&tetrahedron(
        2.0 / (1.0 + 1.0 / 3.0),
        Vec3::new(4.0, 4.0, 0.0),
        Mat3::from_rotation_z(13f32.to_radians()),
    ));
    mesh.extend(&cylinder(1.0, 2.0, 24, Vec3::new(-4.0, 4.0, 0.0)));
    mesh.extend(&iso_sphere(1.0, 64, 32, Vec3::new(-4.0, 0.0, 0.0)));
    mesh
}
