//! Wavefront OBJ loader.
//!
//! Supports positions, texture coordinates, normals and triangle/quad faces in
//! all four corner forms (`v`, `v/vt`, `v/vt/vn`, `v//vn`). Material and group
//! statements are accepted and ignored. Problems on individual lines are logged
//! and counted; the line is skipped (or the vector set to NaN) and parsing
//! continues. A file that yields no usable triangle is an error.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Affine3A, Vec2, Vec3};

use crate::mesh::{MeshData, MeshVertex, DEFAULT_COLOR, DEFAULT_NORMAL, DEFAULT_UV};

#[derive(Debug, Clone)]
pub struct ObjMesh {
    /// Name from the last `o` statement, if any.
    pub name: Option<String>,
    pub mesh: MeshData,
    /// Number of lines that produced a warning.
    pub warnings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Corner {
    pos: usize,
    uv: Option<usize>,
    norm: Option<usize>,
}

pub fn load_obj(path: &Path, transform: Affine3A) -> Result<ObjMesh, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read mesh file {}: {e}", path.display()))?;
    parse_obj(&source, &path.display().to_string(), transform)
}

pub fn parse_obj(source: &str, label: &str, transform: Affine3A) -> Result<ObjMesh, String> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[Corner; 3]> = Vec::new();
    let mut name = None;
    let mut warnings = 0u32;

    let mut warn = |line_no: usize, msg: String| {
        log::warn!("{label}:{line_no}: {msg}");
        warnings += 1;
    };

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();

        match keyword {
            "v" | "vn" => match parse_floats::<3>(&args) {
                Ok((v, extra)) => {
                    if extra {
                        warn(line_no, format!("too many components for '{keyword}', ignoring rest"));
                    }
                    let v = Vec3::from_array(v);
                    if keyword == "v" {
                        positions.push(v);
                    } else {
                        normals.push(v);
                    }
                }
                Err(e) => {
                    warn(line_no, format!("invalid '{keyword}' ({e}), setting to NaN"));
                    if keyword == "v" {
                        positions.push(Vec3::NAN);
                    } else {
                        normals.push(Vec3::NAN);
                    }
                }
            },
            "vt" => match parse_floats::<2>(&args) {
                Ok((v, extra)) => {
                    if extra {
                        warn(line_no, "too many components for 'vt', ignoring rest".to_string());
                    }
                    uvs.push(Vec2::from_array(v));
                }
                Err(e) => {
                    warn(line_no, format!("invalid 'vt' ({e}), setting to NaN"));
                    uvs.push(Vec2::NAN);
                }
            },
            "f" => {
                match parse_face(&args, positions.len(), uvs.len(), normals.len()) {
                    Ok(corners) if corners.len() == 3 => {
                        triangles.push([corners[0], corners[1], corners[2]]);
                    }
                    Ok(corners) => {
                        triangles.push([corners[1], corners[2], corners[0]]);
                        triangles.push([corners[0], corners[2], corners[3]]);
                    }
                    Err(e) => warn(line_no, format!("bad face ({e}), skipping")),
                }
            }
            "o" => {
                let rest = line.trim_start()[1..].trim();
                if !rest.is_empty() {
                    name = Some(rest.to_string());
                }
            }
            "g" | "s" | "mtllib" | "usemtl" => {}
            k if k.starts_with('#') => {}
            other => warn(line_no, format!("unknown line token '{other}', ignoring line")),
        }
    }

    if triangles.is_empty() {
        return Err(format!("Mesh {label} contains no valid faces"));
    }

    let mesh = expand(&triangles, &positions, &uvs, &normals, transform);
    log::debug!(
        "Parsed {label}: {} vertices, {} triangles, {warnings} warnings",
        mesh.vertices.len(),
        mesh.triangle_count()
    );

    Ok(ObjMesh {
        name,
        mesh,
        warnings,
    })
}

/// Parse the first `N` floats. The flag reports whether more followed.
fn parse_floats<const N: usize>(args: &[&str]) -> Result<([f32; N], bool), String> {
    if args.len() < N {
        return Err(format!("expected {N} components, found {}", args.len()));
    }
    let mut out = [0.0f32; N];
    for (slot, raw) in out.iter_mut().zip(args) {
        *slot = raw
            .parse::<f32>()
            .map_err(|e| format!("'{raw}' is not a number: {e}"))?;
    }
    Ok((out, args.len() > N))
}

fn parse_face(
    args: &[&str],
    pos_count: usize,
    uv_count: usize,
    norm_count: usize,
) -> Result<Vec<Corner>, String> {
    if !(3..=4).contains(&args.len()) {
        return Err(format!(
            "only triangles and quads are supported, got {} corners",
            args.len()
        ));
    }
    args.iter()
        .map(|corner| {
            let mut parts = corner.split('/');
            let pos = parts.next().unwrap_or("");
            let uv = parts.next().filter(|s| !s.is_empty());
            let norm = parts.next().filter(|s| !s.is_empty());
            if parts.next().is_some() {
                return Err(format!("malformed corner '{corner}'"));
            }
            Ok(Corner {
                pos: resolve_index(pos, pos_count)?,
                uv: uv.map(|s| resolve_index(s, uv_count)).transpose()?,
                norm: norm.map(|s| resolve_index(s, norm_count)).transpose()?,
            })
        })
        .collect()
}

/// OBJ indices are 1-based; negative values count back from the current end.
fn resolve_index(raw: &str, count: usize) -> Result<usize, String> {
    let value: i64 = raw
        .parse()
        .map_err(|e| format!("'{raw}' is not an index: {e}"))?;
    let resolved = match value {
        0 => return Err("index 0 is invalid".to_string()),
        v if v > 0 => v - 1,
        v => count as i64 + v,
    };
    if resolved < 0 || resolved >= count as i64 {
        return Err(format!("index {value} out of range (have {count})"));
    }
    Ok(resolved as usize)
}

fn expand(
    triangles: &[[Corner; 3]],
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
    transform: Affine3A,
) -> MeshData {
    let mut mesh = MeshData {
        vertices: Vec::with_capacity(triangles.len() * 3),
        indices: Vec::with_capacity(triangles.len() * 3),
    };
    let mut unique: HashMap<[u32; 11], u32> = HashMap::new();

    for corner in triangles.iter().flatten() {
        let pos = transform.transform_point3(positions[corner.pos]);
        let norm = match corner.norm {
            Some(n) => transform
                .transform_vector3(normals[n].normalize_or(DEFAULT_NORMAL))
                .normalize_or(DEFAULT_NORMAL),
            None => DEFAULT_NORMAL,
        };
        let uv = corner.uv.map_or(DEFAULT_UV, |t| uvs[t]);
        let vertex = MeshVertex::new(pos, norm, uv, DEFAULT_COLOR);

        let index = *unique
            .entry(vertex_key(&vertex))
            .or_insert_with(|| mesh.push_vertex(vertex));
        mesh.indices.push(index);
    }
    mesh
}

fn vertex_key(v: &MeshVertex) -> [u32; 11] {
    let mut key = [0u32; 11];
    let floats = v.pos.iter().chain(&v.norm).chain(&v.uv).chain(&v.col);
    for (slot, f) in key.iter_mut().zip(floats) {
        *slot = f.to_bits();
    }
    key
}
