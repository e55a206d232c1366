//! CPU meshes, primitive generation and uploaded GPU meshes

use glam::{Vec2, Vec3};

use crate::backend::types::{BufferHandle, ProgramHandle, VertexArrayHandle};
use crate::shader::LinkedProgram;

use super::texture::GpuTexture;
use super::vertex::{ColorVertex, Vertex, VertexFormat};

/// A mesh with vertex and index data, not yet on the GPU
#[derive(Debug, Clone)]
pub struct Mesh<V = Vertex> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl<V: VertexFormat> Mesh<V> {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Triangle count, from indices when present
    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.vertices.len() / 3
        } else {
            self.indices.len() / 3
        }
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl Mesh<ColorVertex> {
    /// The classic RGB triangle in normalized device coordinates
    pub fn triangle() -> Self {
        let mut mesh = Mesh::new("triangle");
        mesh.vertices = vec![
            ColorVertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec3::X),
            ColorVertex::new(Vec3::new(0.5, -0.5, 0.0), Vec3::Y),
            ColorVertex::new(Vec3::new(0.0, 0.5, 0.0), Vec3::Z),
        ];
        mesh
    }
}

impl Mesh<Vertex> {
    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        // (normal, tangent) per face; bitangent = normal x tangent
        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];
        let corners = [
            (Vec2::new(-0.5, -0.5), Vec2::new(0.0, 1.0)),
            (Vec2::new(0.5, -0.5), Vec2::new(1.0, 1.0)),
            (Vec2::new(0.5, 0.5), Vec2::new(1.0, 0.0)),
            (Vec2::new(-0.5, 0.5), Vec2::new(0.0, 0.0)),
        ];

        for (normal, tangent) in faces {
            let bitangent = normal.cross(tangent);
            for (corner, uv) in corners {
                let position = normal * 0.5 + tangent * corner.x + bitangent * corner.y;
                mesh.vertices.push(Vertex {
                    position,
                    normal,
                    uv,
                    tangent,
                    bitangent,
                    ..Default::default()
                });
            }
        }

        // Two triangles per face
        for face in 0..6 {
            let base = face * 4;
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a plane on the XZ axis
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let mut mesh = Mesh::new("plane");
        let subdivisions = subdivisions.max(1);

        let half_width = width / 2.0;
        let half_depth = depth / 2.0;
        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                let px = -half_width + x as f32 * step_x;
                let pz = -half_depth + z as f32 * step_z;

                mesh.vertices.push(Vertex {
                    position: Vec3::new(px, 0.0, pz),
                    normal: Vec3::Y,
                    uv: Vec2::new(x as f32 / subdivisions as f32, z as f32 / subdivisions as f32),
                    tangent: Vec3::X,
                    bitangent: Vec3::Z,
                    ..Default::default()
                });
            }
        }

        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;

                mesh.indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        mesh
    }
}

/// Lifecycle of a [`GpuMesh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshState {
    #[default]
    Unallocated,
    Uploaded,
    /// Terminal; further releases do nothing
    Released,
}

/// A mesh uploaded to the GPU.
///
/// Created by [`RenderContext::upload_mesh`](crate::RenderContext::upload_mesh)
/// and released with
/// [`RenderContext::release_mesh`](crate::RenderContext::release_mesh), which
/// also deletes the textures attached to it.
#[derive(Debug)]
pub struct GpuMesh<V = Vertex> {
    pub(crate) vertex_array: VertexArrayHandle,
    pub(crate) vertex_buffer: BufferHandle,
    pub(crate) index_buffer: BufferHandle,
    pub(crate) vertices: Option<Vec<V>>,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub textures: Vec<GpuTexture>,
    pub(crate) program: Option<ProgramHandle>,
    pub(crate) state: MeshState,
}

impl<V> GpuMesh<V> {
    pub fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    /// Allocated even for unindexed meshes, where it stays empty
    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn state(&self) -> MeshState {
        self.state
    }

    /// CPU copy of the vertices, unless discarded
    pub fn vertices(&self) -> Option<&[V]> {
        self.vertices.as_deref()
    }

    /// Drop the CPU copy of the vertices; the GPU data is unaffected.
    pub fn discard_cpu_data(&mut self) -> Option<Vec<V>> {
        self.vertices.take()
    }

    /// Attach a texture, bound on draw as `<role prefix><n>`.
    ///
    /// The mesh takes ownership: releasing the mesh deletes the texture.
    pub fn attach_texture(&mut self, texture: GpuTexture) {
        self.textures.push(texture);
    }

    /// Program used by [`RenderContext::draw_mesh`](crate::RenderContext::draw_mesh)
    pub fn bind_program(&mut self, program: &LinkedProgram) {
        self.program = (!program.is_destroyed()).then(|| program.handle());
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube() {
        let cube = Mesh::<Vertex>::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.triangle_count(), 12);
        for v in &cube.vertices {
            // Every corner sits on the face its normal points to.
            assert!((v.position.dot(v.normal) - 0.5).abs() < 1e-6);
            assert!((v.bitangent - v.normal.cross(v.tangent)).length() < 1e-6);
        }
    }

    #[test]
    fn test_plane() {
        let plane = Mesh::<Vertex>::plane(2.0, 2.0, 2);
        assert_eq!(plane.vertex_count(), 9);
        assert_eq!(plane.triangle_count(), 8);
        assert!(plane.indices.iter().all(|&i| (i as usize) < plane.vertex_count()));
    }

    #[test]
    fn test_triangle_without_indices() {
        let triangle = Mesh::<ColorVertex>::triangle();
        assert_eq!(triangle.triangle_count(), 1);
        assert_eq!(triangle.vertex_bytes().len(), 3 * 24);
        assert!(triangle.index_bytes().is_empty());
    }
}
