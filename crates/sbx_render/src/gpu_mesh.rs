use bytemuck::Zeroable;
use sbx_core::mesh::{MeshData, MeshVertex};
use wgpu::util::DeviceExt;

/// Immutable vertex + index buffers for one mesh.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_count: u32,
}

impl GpuMesh {
    /// Upload a mesh, rejecting buffers larger than the device allows.
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Result<Self, String> {
        let max = device.limits().max_buffer_size;
        check_buffer_size(label, "vertex", vertex_bytes(mesh), max)?;
        check_buffer_size(label, "index", index_bytes(mesh), max)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let uploaded = Self::create(device, label, mesh);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("Mesh '{label}' rejected by device: {err}"));
        }
        Ok(uploaded)
    }

    /// Placeholder buffers that draw nothing.
    pub fn empty(device: &wgpu::Device, label: &str) -> Self {
        Self::create(device, label, &MeshData::new())
    }

    fn create(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        // Zero-sized buffers are not bindable; an empty mesh gets a single
        // placeholder element and draws nothing.
        let placeholder_vertex = [MeshVertex::zeroed()];
        let vertices: &[MeshVertex] = if mesh.vertices.is_empty() {
            &placeholder_vertex
        } else {
            &mesh.vertices
        };
        let indices: &[u32] = if mesh.indices.is_empty() {
            &[0]
        } else {
            &mesh.indices
        };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            vertex_count: mesh.vertices.len() as u32,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

fn vertex_bytes(mesh: &MeshData) -> u64 {
    std::mem::size_of_val(mesh.vertices.as_slice()) as u64
}

fn index_bytes(mesh: &MeshData) -> u64 {
    std::mem::size_of_val(mesh.indices.as_slice()) as u64
}

pub fn check_buffer_size(label: &str, kind: &str, bytes: u64, max: u64) -> Result<(), String> {
    if bytes > max {
        return Err(format!(
            "Mesh '{label}': {kind} data is {bytes} bytes, device limit is {max}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_size_limit() {
        let max = wgpu::Limits::default().max_buffer_size;
        assert!(check_buffer_size("floor", "vertex", max, max).is_ok());
        let err = check_buffer_size("floor", "index", max + 1, max).unwrap_err();
        assert!(err.contains("'floor'") && err.contains("index"), "{err}");
    }

    #[test]
    fn byte_sizes_follow_element_counts() {
        let mut mesh = MeshData::new();
        let v = MeshVertex::zeroed();
        mesh.push_triangle(v, v, v);
        assert_eq!(vertex_bytes(&mesh), 3 * std::mem::size_of::<MeshVertex>() as u64);
        assert_eq!(index_bytes(&mesh), 3 * 4);
    }
}
