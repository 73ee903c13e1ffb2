use glam::{Affine3A, Mat3, Quat, Vec3};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use sbx_core::mesh::MeshData;
use sbx_core::shapes::{self, MAX_FACES, MAX_FLOOR_TILES};

pub const SCENE_VERSION: &str = "0.1";
pub const DEFAULT_SHADER_PATH: &str = "assets/shaders/mesh.wgsl";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SceneFile {
    pub version: String,
    pub scene_id: String,
    #[serde(default)]
    pub camera: Option<SceneCamera>,
    #[serde(default = "default_shader")]
    pub shader: String,
    #[serde(default = "default_true")]
    pub floor: bool,
    #[serde(default = "default_floor_tiles")]
    pub floor_tiles: u32,
    #[serde(default = "default_one")]
    pub floor_tile_size: f32,
    #[serde(default = "default_true")]
    pub default_shapes: bool,
    #[serde(default)]
    pub shapes: Vec<SceneShape>,
    #[serde(default)]
    pub meshes: Vec<SceneMesh>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SceneCamera {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_deg: f32,
    #[serde(default)]
    pub pitch_deg: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SceneShape {
    #[serde(flatten)]
    pub kind: ShapeKind,
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation about +Z.
    #[serde(default)]
    pub rotation_deg: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapeKind {
    Cube {
        #[serde(default = "default_one")]
        size: f32,
    },
    Tetrahedron {
        #[serde(default = "default_one")]
        size: f32,
    },
    Cylinder {
        #[serde(default = "default_one")]
        radius: f32,
        #[serde(default = "default_two")]
        length: f32,
        #[serde(default = "default_cylinder_faces")]
        faces: u32,
    },
    Sphere {
        #[serde(default = "default_one")]
        radius: f32,
        #[serde(default = "default_sphere_wfaces")]
        width_faces: u32,
        #[serde(default = "default_sphere_hfaces")]
        height_faces: u32,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SceneMesh {
    pub id: String,
    pub obj: String,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_deg: f32,
    #[serde(default = "default_one")]
    pub scale: f32,
}

impl SceneFile {
    /// Used when the scene file is missing or invalid at startup.
    pub fn builtin() -> Self {
        Self {
            version: SCENE_VERSION.to_string(),
            scene_id: "builtin".to_string(),
            camera: None,
            shader: default_shader(),
            floor: true,
            floor_tiles: default_floor_tiles(),
            floor_tile_size: default_one(),
            default_shapes: true,
            shapes: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// Floor, stock shapes and scene shapes merged into one mesh.
    pub fn build_static_geometry(&self) -> MeshData {
        let mut mesh = MeshData::new();
        if self.floor {
            mesh.extend(&shapes::grid_floor(
                self.floor_tiles,
                self.floor_tile_size,
                0.0,
            ));
        }
        if self.default_shapes {
            mesh.extend(&shapes::default_shapes());
        }
        for shape in &self.shapes {
            mesh.extend(&shape.build());
        }
        mesh
    }
}

impl SceneShape {
    pub fn build(&self) -> MeshData {
        let mut mesh = match self.kind {
            ShapeKind::Cube { size } => shapes::cube(size, Vec3::ZERO, Mat3::IDENTITY),
            ShapeKind::Tetrahedron { size } => {
                shapes::tetrahedron(size, Vec3::ZERO, Mat3::IDENTITY)
            }
            ShapeKind::Cylinder {
                radius,
                length,
                faces,
            } => shapes::cylinder(radius, length, faces, Vec3::ZERO),
            ShapeKind::Sphere {
                radius,
                width_faces,
                height_faces,
            } => shapes::iso_sphere(radius, width_faces, height_faces, Vec3::ZERO),
        };
        mesh.transform(Affine3A::from_rotation_translation(
            Quat::from_rotation_z(self.rotation_deg.to_radians()),
            Vec3::from_array(self.position),
        ));
        mesh
    }

    fn label(&self) -> &'static str {
        match self.kind {
            ShapeKind::Cube { .. } => "cube",
            ShapeKind::Tetrahedron { .. } => "tetrahedron",
            ShapeKind::Cylinder { .. } => "cylinder",
            ShapeKind::Sphere { .. } => "sphere",
        }
    }
}

impl SceneMesh {
    /// Scale, then rotate about Z, then translate. Baked into the vertices at load.
    pub fn transform(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_z(self.rotation_deg.to_radians()),
            Vec3::from_array(self.position),
        )
    }
}

pub fn load_scene_from_path(scene_path: &Path) -> Result<SceneFile, String> {
    let raw = fs::read_to_string(scene_path)
        .map_err(|e| format!("Failed to read scene file {}: {e}", scene_path.display()))?;
    let scene: SceneFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse scene JSON {}: {e}", scene_path.display()))?;
    validate_scene(&scene)?;
    Ok(scene)
}

fn validate_scene(scene: &SceneFile) -> Result<(), String> {
    if scene.version != SCENE_VERSION {
        return Err(format!(
            "Scene validation failed: unsupported version '{}', expected '{SCENE_VERSION}'",
            scene.version
        ));
    }
    if scene.scene_id.trim().is_empty() {
        return Err("Scene validation failed: scene_id is empty".to_string());
    }
    if scene.shader.trim().is_empty() {
        return Err("Scene validation failed: shader path is empty".to_string());
    }
    if scene.floor && !(scene.floor_tiles > 0 && positive(scene.floor_tile_size)) {
        return Err("Scene validation failed: floor needs positive tiles and tile size".to_string());
    }
    if scene.floor_tiles > MAX_FLOOR_TILES {
        return Err(format!(
            "Scene validation failed: floor_tiles {} exceeds {MAX_FLOOR_TILES}",
            scene.floor_tiles
        ));
    }

    for (i, shape) in scene.shapes.iter().enumerate() {
        let name = shape.label();
        let problem = match shape.kind {
            ShapeKind::Cube { size } | ShapeKind::Tetrahedron { size } if !positive(size) => {
                Some(format!("size must be positive, got {size}"))
            }
            ShapeKind::Cylinder { radius, length, .. } if !(positive(radius) && positive(length)) => {
                Some("radius and length must be positive".to_string())
            }
            ShapeKind::Cylinder { faces, .. } if !(3..=MAX_FACES).contains(&faces) => {
                Some(format!("needs 3..={MAX_FACES} faces, got {faces}"))
            }
            ShapeKind::Sphere { radius, .. } if !positive(radius) => {
                Some(format!("radius must be positive, got {radius}"))
            }
            ShapeKind::Sphere {
                width_faces,
                height_faces,
                ..
            } if !(2..=MAX_FACES).contains(&width_faces)
                || !(2..=MAX_FACES).contains(&height_faces) =>
            {
                Some(format!(
                    "needs 2..={MAX_FACES} faces each way, got {width_faces}x{height_faces}"
                ))
            }
            _ => None,
        };
        if let Some(problem) = problem {
            return Err(format!(
                "Scene validation failed: shape #{i} ({name}) {problem}"
            ));
        }
    }

    let mut mesh_ids = HashSet::new();
    for mesh in &scene.meshes {
        if mesh.id.trim().is_empty() {
            return Err("Scene validation failed: mesh with empty id".to_string());
        }
        if !mesh_ids.insert(mesh.id.as_str()) {
            return Err(format!(
                "Scene validation failed: duplicate mesh id '{}'",
                mesh.id
            ));
        }
        if mesh.obj.trim().is_empty() {
            return Err(format!(
                "Scene validation failed: mesh '{}' has no obj path",
                mesh.id
            ));
        }
        if !positive(mesh.scale) {
            return Err(format!(
                "Scene validation failed: mesh '{}' scale must be positive, got {}",
                mesh.id, mesh.scale
            ));
        }
    }

    if !scene.floor && !scene.default_shapes && scene.shapes.is_empty() && scene.meshes.is_empty()
    {
        log::warn!(
            "Scene '{}' draws nothing. This is allowed but often accidental.",
            scene.scene_id
        );
    }

    Ok(())
}

/// Finite and greater than zero.
fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn default_shader() -> String {
    DEFAULT_SHADER_PATH.to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_one() -> f32 {
    1.0
}

const fn default_two() -> f32 {
    2.0
}

const fn default_floor_tiles() -> u32 {
    16
}

const fn default_cylinder_faces() -> u32 {
    24
}

const fn default_sphere_wfaces() -> u32 {
    64
}

const fn default_sphere_hfaces() -> u32 {
    32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "sbx_scene_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn load_str(name_hint: &str, body: &str) -> Result<SceneFile, String> {
        let path = temp_file_path(name_hint);
        fs::write(&path, body).expect("failed to write temp scene file");
        let result = load_scene_from_path(&path);
        let _ = fs::remove_file(path);
        result
    }

    #[test]
    fn load_scene_from_path_parses_valid_scene() {
        let scene = load_str(
            "valid",
            r#"
            {
              "version": "0.1",
              "scene_id": "test_scene",
              "camera": { "position": [0, -8, 2], "yaw_deg": 90, "pitch_deg": -15 },
              "shapes": [
                { "kind": "cube", "size": 0.5, "position": [2, 0, 0], "rotation_deg": 45 },
                { "kind": "sphere", "radius": 0.75, "width_faces": 16, "height_faces": 8 }
              ],
              "meshes": [
                { "id": "pyramid", "obj": "assets/meshes/pyramid.obj",
                  "texture": "assets/textures/stone.png", "scale": 2.0 }
              ]
            }
            "#,
        )
        .expect("scene should parse");

        assert_eq!(scene.scene_id, "test_scene");
        assert_eq!(scene.shader, DEFAULT_SHADER_PATH);
        assert!(scene.floor);
        assert!(scene.default_shapes);
        assert_eq!(scene.camera.as_ref().map(|c| c.pitch_deg), Some(-15.0));
        assert_eq!(scene.shapes.len(), 2);
        assert_eq!(scene.shapes[0].kind, ShapeKind::Cube { size: 0.5 });
        assert_eq!(scene.shapes[0].rotation_deg, 45.0);
        assert_eq!(
            scene.shapes[1].kind,
            ShapeKind::Sphere {
                radius: 0.75,
                width_faces: 16,
                height_faces: 8
            }
        );
        assert_eq!(scene.meshes[0].texture.as_deref(), Some("assets/textures/stone.png"));
        assert_eq!(scene.meshes[0].rotation_deg, 0.0);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = load_str("version", r#"{ "version": "2.0", "scene_id": "s" }"#)
            .expect_err("version must match");
        assert!(err.contains("unsupported version"), "unexpected error: {err}");
    }

    #[test]
    fn duplicate_mesh_ids_are_rejected() {
        let err = load_str(
            "dup",
            r#"{ "version": "0.1", "scene_id": "s", "meshes": [
                { "id": "a", "obj": "x.obj" },
                { "id": "a", "obj": "y.obj" }
            ] }"#,
        )
        .expect_err("ids must be unique");
        assert!(err.contains("duplicate mesh id 'a'"), "unexpected error: {err}");
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let cylinder = load_str(
            "cyl",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [
                { "kind": "cylinder", "faces": 2 }
            ] }"#,
        )
        .expect_err("two-faced cylinder");
        assert!(cylinder.contains("cylinder"), "unexpected error: {cylinder}");

        let sphere = load_str(
            "sph",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [
                { "kind": "sphere", "width_faces": 1 }
            ] }"#,
        )
        .expect_err("sphere needs 2 faces");
        assert!(sphere.contains("sphere"), "unexpected error: {sphere}");

        let cube = load_str(
            "cube",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [
                { "kind": "cube", "size": -1 }
            ] }"#,
        )
        .expect_err("negative size");
        assert!(cube.contains("size must be positive"), "unexpected error: {cube}");
    }

    #[test]
    fn oversized_resolutions_are_rejected() {
        let floor = load_str(
            "floor",
            r#"{ "version": "0.1", "scene_id": "s", "floor_tiles": 200000 }"#,
        )
        .expect_err("floor too large");
        assert!(floor.contains("floor_tiles 200000"), "unexpected error: {floor}");

        let sphere = load_str(
            "big_sphere",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [
                { "kind": "sphere", "width_faces": 100000, "height_faces": 8 }
            ] }"#,
        )
        .expect_err("sphere too fine");
        assert!(sphere.contains("100000x8"), "unexpected error: {sphere}");

        let cylinder = load_str(
            "big_cyl",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [
                { "kind": "cylinder", "faces": 4096 }
            ] }"#,
        )
        .expect_err("cylinder too fine");
        assert!(cylinder.contains("4096"), "unexpected error: {cylinder}");

        let at_limit = format!(
            r#"{{ "version": "0.1", "scene_id": "s", "floor_tiles": {MAX_FLOOR_TILES}, "shapes": [
                {{ "kind": "cylinder", "faces": {MAX_FACES} }}
            ] }}"#
        );
        assert!(load_str("at_limit", &at_limit).is_ok());
    }

    #[test]
    fn unknown_shape_kind_is_a_parse_error() {
        let err = load_str(
            "kind",
            r#"{ "version": "0.1", "scene_id": "s", "shapes": [ { "kind": "torus" } ] }"#,
        )
        .expect_err("torus is not a shape");
        assert!(err.contains("Failed to parse scene JSON"), "unexpected error: {err}");
    }

    #[test]
    fn static_geometry_combines_enabled_parts() {
        let mut scene = SceneFile::builtin();
        scene.floor_tiles = 2;
        let floor_only_tiles = 4 * 4;

        scene.default_shapes = false;
        assert_eq!(
            scene.build_static_geometry().vertices.len(),
            floor_only_tiles * 6
        );

        scene.shapes.push(SceneShape {
            kind: ShapeKind::Cube { size: 1.0 },
            position: [0.0, 0.0, 0.0],
            rotation_deg: 0.0,
        });
        assert_eq!(
            scene.build_static_geometry().vertices.len(),
            floor_only_tiles * 6 + 36
        );

        scene.floor = false;
        scene.shapes.clear();
        assert!(scene.build_static_geometry().is_empty());
    }

    #[test]
    fn shape_placement_moves_the_base() {
        let shape = SceneShape {
            kind: ShapeKind::Cylinder {
                radius: 1.0,
                length: 2.0,
                faces: 8,
            },
            position: [10.0, 0.0, 3.0],
            rotation_deg: 90.0,
        };
        let mesh = shape.build();
        let min_z = mesh
            .vertices
            .iter()
            .map(|v| v.pos[2])
            .fold(f32::MAX, f32::min);
        assert!((min_z - 3.0).abs() < 1e-5);
        assert!(mesh.vertices.iter().all(|v| (v.pos[0] - 10.0).abs() <= 1.0 + 1e-5));
    }

    #[test]
    fn mesh_transform_scales_rotates_then_translates() {
        let mesh = SceneMesh {
            id: "m".to_string(),
            obj: "m.obj".to_string(),
            texture: None,
            position: [1.0, 2.0, 3.0],
            rotation_deg: 90.0,
            scale: 2.0,
        };
        let p = mesh.transform().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 4.0, 3.0)).length() < 1e-5);
    }
}
