//! Every file-backed GPU resource the sandbox draws with.
//!
//! Each resource lives in a `HotReload` slot, and `poll()` runs once per frame
//! at the frame boundary, before any GPU work is recorded. A failed reload
//! leaves the old resource in place.
//!
//! - The scene file decides which shader, textures and meshes exist. A
//!   reloaded scene is diffed against the live slots, so unchanged meshes
//!   and textures are not reloaded.
//! - The shader slot holds a built pipeline, not source text. It only swaps
//!   once the device has accepted the new pipeline.
//! - Textures are shared by path. Each one caches the generation its bind
//!   group was built for.
//! - Meshes belong to a scene entry because the entry's transform is baked
//!   into the vertices.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glam::Affine3A;
use sbx_core::dds::load_dds;
use sbx_core::hot_reload::{HotReload, ReloadOutcome};
use sbx_core::obj::load_obj;
use sbx_devtools::ResourceLine;
use sbx_render::shader::{load_shader_source, BUILTIN_MESH_SHADER};
use sbx_render::{GpuContext, GpuMesh, MeshBindLayouts, MeshPipeline, Texture};

use crate::scene::{load_scene_from_path, SceneFile, SceneMesh};

const MISSING_TEXTURE_A: [u8; 4] = [255, 0, 255, 255];
const MISSING_TEXTURE_B: [u8; 4] = [24, 24, 24, 255];
const MISSING_TEXTURE_CELLS: u32 = 8;
const STATIC_GEOMETRY_LABEL: &str = "Static Geometry";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFileKind {
    Dds,
    /// Anything `image` can decode (PNG, JPEG).
    Image,
}

impl TextureFileKind {
    pub fn from_path(path: &Path) -> Self {
        let is_dds = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("dds"));
        if is_dds {
            Self::Dds
        } else {
            Self::Image
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draw_calls: u32,
    pub vertices: u32,
    pub triangles: u32,
}

impl DrawStats {
    fn record(&mut self, vertex_count: u32, index_count: u32) {
        if index_count == 0 {
            return;
        }
        self.draw_calls += 1;
        self.vertices += vertex_count;
        self.triangles += index_count / 3;
    }
}

struct TextureSlot {
    texture: HotReload<Texture>,
    bind_group: wgpu::BindGroup,
    bound_generation: u64,
}

struct MeshInstance<M = HotReload<GpuMesh>> {
    source: SceneMesh,
    mesh: M,
}

pub struct ResourceManager {
    layouts: MeshBindLayouts,
    poll_interval: Duration,
    scene: HotReload<SceneFile>,
    shader: HotReload<MeshPipeline>,
    textures: BTreeMap<String, TextureSlot>,
    meshes: Vec<MeshInstance>,
    static_mesh: GpuMesh,
    white_bind_group: wgpu::BindGroup,
}

impl ResourceManager {
    pub fn new(gpu: &GpuContext, scene_path: PathBuf, poll_interval: Duration) -> Self {
        let layouts = MeshBindLayouts::new(&gpu.device);
        let white = match Texture::white(&gpu.device, &gpu.queue) {
            Ok(texture) => texture,
            Err(err) => panic!("Built-in white texture rejected: {err}"),
        };
        let white_bind_group = layouts.create_texture_bind_group(&gpu.device, &white);

        let scene = HotReload::load(scene_path, load_scene_from_path, SceneFile::builtin)
            .with_poll_interval(poll_interval);
        let shader = load_shader_slot(gpu, &layouts, &scene.value().shader, poll_interval);
        let static_mesh = upload_static_geometry(gpu, scene.value()).unwrap_or_else(|err| {
            log::error!("{err}; drawing no static geometry");
            GpuMesh::empty(&gpu.device, STATIC_GEOMETRY_LABEL)
        });

        let mut manager = Self {
            layouts,
            poll_interval,
            scene,
            shader,
            textures: BTreeMap::new(),
            meshes: Vec::new(),
            static_mesh,
            white_bind_group,
        };
        manager.sync_scene_content(gpu);
        manager
    }

    pub fn scene(&self) -> &SceneFile {
        self.scene.value()
    }

    pub fn layouts(&self) -> &MeshBindLayouts {
        &self.layouts
    }

    /// Check every watcher and swap whatever changed.
    pub fn poll(&mut self, gpu: &GpuContext) {
        if self.scene.poll(load_scene_from_path) == ReloadOutcome::Reloaded {
            self.apply_scene(gpu);
        }

        let layouts = &self.layouts;
        self.shader.poll(|path| build_pipeline(gpu, layouts, path));

        for slot in self.textures.values_mut() {
            slot.texture.poll(|path| load_texture(gpu, path));
        }

        for instance in &mut self.meshes {
            let transform = instance.source.transform();
            let id = instance.source.id.as_str();
            instance
                .mesh
                .poll(|path| load_mesh(gpu, id, path, transform));
        }

        self.refresh_bind_groups(gpu);
    }

    /// Reload everything regardless of timestamps.
    ///
    /// The scene goes last: slots it adds are loaded once by `apply_scene`,
    /// and slots it keeps were already reloaded above.
    pub fn reload_all(&mut self, gpu: &GpuContext, reason: &str) {
        log::info!("Reloading all resources ({reason})");

        let layouts = &self.layouts;
        self.shader
            .force_reload(|path| build_pipeline(gpu, layouts, path), reason);

        for slot in self.textures.values_mut() {
            slot.texture
                .force_reload(|path| load_texture(gpu, path), reason);
        }

        for instance in &mut self.meshes {
            let transform = instance.source.transform();
            let id = instance.source.id.as_str();
            instance
                .mesh
                .force_reload(|path| load_mesh(gpu, id, path, transform), reason);
        }

        if self.scene.force_reload(load_scene_from_path, reason) == ReloadOutcome::Reloaded {
            self.apply_scene(gpu);
        }

        self.refresh_bind_groups(gpu);
    }

    /// Record draws for the static geometry and every scene mesh. Expects the
    /// camera bind group for group 0.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
    ) -> DrawStats {
        let mut stats = DrawStats::default();

        pass.set_pipeline(&self.shader.value().render_pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);

        pass.set_bind_group(1, &self.white_bind_group, &[]);
        self.static_mesh.draw(pass);
        stats.record(self.static_mesh.vertex_count, self.static_mesh.index_count);

        for instance in &self.meshes {
            let bind_group = instance
                .source
                .texture
                .as_ref()
                .and_then(|key| self.textures.get(key))
                .map_or(&self.white_bind_group, |slot| &slot.bind_group);
            pass.set_bind_group(1, bind_group, &[]);

            let mesh = instance.mesh.value();
            mesh.draw(pass);
            stats.record(mesh.vertex_count, mesh.index_count);
        }

        stats
    }

    pub fn status_lines(&self) -> Vec<ResourceLine> {
        let mut lines = vec![
            status_line("scene", &self.scene),
            status_line("shader", &self.shader),
        ];
        lines.extend(
            self.textures
                .values()
                .map(|slot| status_line("texture", &slot.texture)),
        );
        lines.extend(
            self.meshes
                .iter()
                .map(|instance| status_line("mesh", &instance.mesh)),
        );
        lines
    }

    fn apply_scene(&mut self, gpu: &GpuContext) {
        let scene = self.scene.value();
        match upload_static_geometry(gpu, scene) {
            Ok(mesh) => self.static_mesh = mesh,
            Err(err) => log::error!("{err}; keeping previous static geometry"),
        }

        if self.shader.path() != Path::new(&scene.shader) {
            log::info!("Scene switched shader to '{}'", scene.shader);
            self.shader = load_shader_slot(gpu, &self.layouts, &scene.shader, self.poll_interval);
        }

        self.sync_scene_content(gpu);
    }

    /// Bring texture and mesh slots in line with the current scene.
    fn sync_scene_content(&mut self, gpu: &GpuContext) {
        let scene = self.scene.value();
        let poll_interval = self.poll_interval;

        let wanted = referenced_textures(scene);
        self.textures.retain(|key, _| wanted.contains(key));
        for key in wanted {
            if self.textures.contains_key(&key) {
                continue;
            }
            let texture = HotReload::load(
                PathBuf::from(&key),
                |path| load_texture(gpu, path),
                || missing_texture(gpu),
            )
            .with_poll_interval(poll_interval);
            let bind_group = self
                .layouts
                .create_texture_bind_group(&gpu.device, texture.value());
            let bound_generation = texture.generation();
            self.textures.insert(
                key,
                TextureSlot {
                    texture,
                    bind_group,
                    bound_generation,
                },
            );
        }

        let previous = std::mem::take(&mut self.meshes);
        self.meshes = reconcile_meshes(previous, &scene.meshes, |source| {
            HotReload::load(
                PathBuf::from(&source.obj),
                |path| load_mesh(gpu, &source.id, path, source.transform()),
                || GpuMesh::empty(&gpu.device, &source.id),
            )
            .with_poll_interval(poll_interval)
        });
    }

    fn refresh_bind_groups(&mut self, gpu: &GpuContext) {
        for slot in self.textures.values_mut() {
            let generation = slot.texture.generation();
            if generation != slot.bound_generation {
                slot.bind_group = self
                    .layouts
                    .create_texture_bind_group(&gpu.device, slot.texture.value());
                slot.bound_generation = generation;
            }
        }
    }
}

/// Texture paths referenced by scene meshes, deduplicated, in first-use order.
pub fn referenced_textures(scene: &SceneFile) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for texture in scene.meshes.iter().filter_map(|m| m.texture.as_ref()) {
        if !paths.contains(texture) {
            paths.push(texture.clone());
        }
    }
    paths
}

/// Match mesh slots to the scene's entries by id. A slot survives when its
/// geometry is unchanged; `create` runs only for new or changed entries.
fn reconcile_meshes<M>(
    previous: Vec<MeshInstance<M>>,
    wanted: &[SceneMesh],
    mut create: impl FnMut(&SceneMesh) -> M,
) -> Vec<MeshInstance<M>> {
    let mut previous: HashMap<String, MeshInstance<M>> = previous
        .into_iter()
        .map(|instance| (instance.source.id.clone(), instance))
        .collect();
    wanted
        .iter()
        .map(|source| match previous.remove(&source.id) {
            Some(mut instance) if same_geometry(&instance.source, source) => {
                instance.source = source.clone();
                instance
            }
            _ => MeshInstance {
                source: source.clone(),
                mesh: create(source),
            },
        })
        .collect()
}

/// Whether an existing mesh slot can be kept when the scene entry changes.
pub fn same_geometry(a: &SceneMesh, b: &SceneMesh) -> bool {
    a.obj == b.obj
        && a.position == b.position
        && a.rotation_deg == b.rotation_deg
        && a.scale == b.scale
}

pub fn status_line<T>(kind: &str, slot: &HotReload<T>) -> ResourceLine {
    ResourceLine {
        label: format!("{kind} {}", slot.path().display()),
        status: slot.status().label(),
        error: slot.status().error().map(str::to_string),
    }
}

fn load_shader_slot(
    gpu: &GpuContext,
    layouts: &MeshBindLayouts,
    path: &str,
    poll_interval: Duration,
) -> HotReload<MeshPipeline> {
    HotReload::load(
        PathBuf::from(path),
        |path| build_pipeline(gpu, layouts, path),
        || builtin_pipeline(gpu, layouts),
    )
    .with_poll_interval(poll_interval)
}

fn build_pipeline(
    gpu: &GpuContext,
    layouts: &MeshBindLayouts,
    path: &Path,
) -> Result<MeshPipeline, String> {
    let source = load_shader_source(path)?;
    MeshPipeline::new(
        &gpu.device,
        gpu.surface_format,
        layouts,
        &path.display().to_string(),
        &source,
    )
}

fn builtin_pipeline(gpu: &GpuContext, layouts: &MeshBindLayouts) -> MeshPipeline {
    match MeshPipeline::new(
        &gpu.device,
        gpu.surface_format,
        layouts,
        "Built-in Mesh Shader",
        BUILTIN_MESH_SHADER,
    ) {
        Ok(pipeline) => pipeline,
        Err(err) => panic!("Built-in mesh shader rejected: {err}"),
    }
}

fn load_texture(gpu: &GpuContext, path: &Path) -> Result<Texture, String> {
    let label = path.display().to_string();
    match TextureFileKind::from_path(path) {
        TextureFileKind::Dds => {
            let dds = load_dds(path)?;
            Texture::from_dds(&gpu.device, &gpu.queue, &dds, gpu.supports_bc(), &label)
        }
        TextureFileKind::Image => {
            let bytes = fs::read(path)
                .map_err(|e| format!("Failed to read texture {}: {e}", path.display()))?;
            Texture::from_image_bytes(&gpu.device, &gpu.queue, &bytes, &label)
        }
    }
}

fn missing_texture(gpu: &GpuContext) -> Texture {
    match Texture::checkerboard(
        &gpu.device,
        &gpu.queue,
        MISSING_TEXTURE_CELLS,
        MISSING_TEXTURE_A,
        MISSING_TEXTURE_B,
    ) {
        Ok(texture) => texture,
        Err(err) => panic!("Built-in fallback texture rejected: {err}"),
    }
}

fn upload_static_geometry(gpu: &GpuContext, scene: &SceneFile) -> Result<GpuMesh, String> {
    GpuMesh::upload(
        &gpu.device,
        STATIC_GEOMETRY_LABEL,
        &scene.build_static_geometry(),
    )
}

fn load_mesh(
    gpu: &GpuContext,
    id: &str,
    path: &Path,
    transform: Affine3A,
) -> Result<GpuMesh, String> {
    let obj = load_obj(path, transform)?;
    if obj.warnings > 0 {
        log::warn!(
            "Mesh '{id}' ({}) loaded with {} warning(s)",
            path.display(),
            obj.warnings
        );
    }
    GpuMesh::upload(&gpu.device, id, &obj.mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_mesh(id: &str, obj: &str, texture: Option<&str>) -> SceneMesh {
        SceneMesh {
            id: id.to_string(),
            obj: obj.to_string(),
            texture: texture.map(str::to_string),
            position: [0.0; 3],
            rotation_deg: 0.0,
            scale: 1.0,
        }
    }

    #[test]
    fn texture_kind_follows_extension() {
        assert_eq!(
            TextureFileKind::from_path(Path::new("assets/textures/rock.dds")),
            TextureFileKind::Dds
        );
        assert_eq!(
            TextureFileKind::from_path(Path::new("ROCK.DDS")),
            TextureFileKind::Dds
        );
        assert_eq!(
            TextureFileKind::from_path(Path::new("rock.png")),
            TextureFileKind::Image
        );
        assert_eq!(
            TextureFileKind::from_path(Path::new("no_extension")),
            TextureFileKind::Image
        );
    }

    #[test]
    fn referenced_textures_are_deduplicated_in_order() {
        let mut scene = SceneFile::builtin();
        scene.meshes = vec![
            scene_mesh("a", "a.obj", Some("b.png")),
            scene_mesh("b", "b.obj", None),
            scene_mesh("c", "c.obj", Some("a.dds")),
            scene_mesh("d", "d.obj", Some("b.png")),
        ];
        assert_eq!(referenced_textures(&scene), vec!["b.png", "a.dds"]);
    }

    #[test]
    fn texture_change_keeps_geometry() {
        let before = scene_mesh("a", "a.obj", Some("x.png"));
        let retextured = scene_mesh("a", "a.obj", Some("y.png"));
        assert!(same_geometry(&before, &retextured));

        let mut moved = before.clone();
        moved.position = [1.0, 0.0, 0.0];
        assert!(!same_geometry(&before, &moved));

        let other_file = scene_mesh("a", "b.obj", Some("x.png"));
        assert!(!same_geometry(&before, &other_file));
    }

    #[test]
    fn scene_change_creates_only_new_or_moved_meshes() {
        let a = scene_mesh("a", "a.obj", Some("x.png"));
        let b = scene_mesh("b", "b.obj", None);
        let mut created = Vec::new();
        let slots = reconcile_meshes(Vec::new(), &[a.clone(), b.clone()], |m| {
            created.push(m.id.clone());
            1u32
        });
        assert_eq!(created, vec!["a", "b"]);

        // Simulates a full reload: existing slots are reloaded in place, then
        // the new scene retextures `a`, moves `b` and adds `c`.
        let reloaded: Vec<MeshInstance<u32>> = slots
            .into_iter()
            .map(|mut slot| {
                slot.mesh += 1;
                slot
            })
            .collect();
        let retextured_a = scene_mesh("a", "a.obj", Some("y.png"));
        let mut moved_b = b.clone();
        moved_b.position = [0.0, 2.0, 0.0];
        let c = scene_mesh("c", "c.obj", None);

        created.clear();
        let slots = reconcile_meshes(reloaded, &[retextured_a, moved_b, c], |m| {
            created.push(m.id.clone());
            1u32
        });
        assert_eq!(created, vec!["b", "c"]);
        let loads: Vec<(&str, u32)> = slots
            .iter()
            .map(|slot| (slot.source.id.as_str(), slot.mesh))
            .collect();
        assert_eq!(loads, vec![("a", 2), ("b", 1), ("c", 1)]);
        assert_eq!(slots[0].source.texture.as_deref(), Some("y.png"));
    }

    #[test]
    fn status_line_reports_fallback_error() {
        let slot: HotReload<u32> = HotReload::load(
            PathBuf::from("assets/does/not/exist.obj"),
            |path| Err(format!("Failed to read mesh file {}", path.display())),
            || 0,
        );
        let line = status_line("mesh", &slot);
        assert_eq!(line.label, "mesh assets/does/not/exist.obj");
        assert_eq!(line.status, "fallback");
        assert!(line
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Failed to read mesh file")));
    }

    #[test]
    fn draw_stats_skip_empty_meshes() {
        let mut stats = DrawStats::default();
        stats.record(100, 120);
        stats.record(0, 0);
        stats.record(8, 36);
        assert_eq!(
            stats,
            DrawStats {
                draw_calls: 2,
                vertices: 108,
                triangles: 52
            }
        );
    }
}
