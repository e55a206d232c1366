//! Multi-mesh models

use std::path::PathBuf;

use super::mesh::GpuMesh;
use super::texture::GpuTexture;
use super::vertex::Vertex;

/// A set of uploaded meshes plus the textures they share.
///
/// Meshes may hold clones of entries in `textures`;
/// [`RenderContext::release_model`](crate::RenderContext::release_model)
/// deletes each texture once.
#[derive(Debug)]
pub struct Model<V = Vertex> {
    pub meshes: Vec<GpuMesh<V>>,
    pub textures: Vec<GpuTexture>,
    pub path: Option<PathBuf>,
}

impl<V> Default for Model<V> {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            textures: Vec::new(),
            path: None,
        }
    }
}

impl<V> Model<V> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn add_mesh(&mut self, mesh: GpuMesh<V>) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Add a texture shared by several meshes
    pub fn add_texture(&mut self, texture: GpuTexture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
