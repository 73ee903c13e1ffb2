use sbx_core::mesh::MeshVertex;

const MESH_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
    // pos
    wgpu::VertexAttribute {
        offset: std::mem::offset_of!(MeshVertex, pos) as wgpu::BufferAddress,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    // norm
    wgpu::VertexAttribute {
        offset: std::mem::offset_of!(MeshVertex, norm) as wgpu::BufferAddress,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x3,
    },
    // uv
    wgpu::VertexAttribute {
        offset: std::mem::offset_of!(MeshVertex, uv) as wgpu::BufferAddress,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x2,
    },
    // col
    wgpu::VertexAttribute {
        offset: std::mem::offset_of!(MeshVertex, col) as wgpu::BufferAddress,
        shader_location: 3,
        format: wgpu::VertexFormat::Float32x3,
    },
];

pub fn mesh_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_VERTEX_ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_contiguous_and_fill_the_stride() {
        let layout = mesh_vertex_layout();
        let mut expected_offset = 0;
        for (i, attr) in layout.attributes.iter().enumerate() {
            assert_eq!(attr.shader_location, i as u32);
            assert_eq!(attr.offset, expected_offset);
            expected_offset += attr.format.size();
        }
        assert_eq!(expected_offset, layout.array_stride);
    }
}
