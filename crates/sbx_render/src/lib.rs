pub mod camera;
pub mod gpu_context;
pub mod gpu_mesh;
pub mod mesh_pipeline;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use camera::{CameraUniform, FlyCamera};
pub use gpu_context::GpuContext;
pub use gpu_mesh::GpuMesh;
pub use mesh_pipeline::{MeshBindLayouts, MeshPipeline};
pub use texture::Texture;
pub use vertex::mesh_vertex_layout;
