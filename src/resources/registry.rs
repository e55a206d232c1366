//! Tracking of live GPU objects owned by a render context

use std::collections::HashSet;

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::{BufferHandle, ProgramHandle, TextureHandle, VertexArrayHandle};

/// Every live handle a [`RenderContext`](crate::RenderContext) created.
///
/// Handles leave the registry when they are released explicitly. Whatever
/// is left is deleted by [`ResourceRegistry::release_all`] when the context
/// is finalized.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    vertex_arrays: HashSet<VertexArrayHandle>,
    buffers: HashSet<BufferHandle>,
    textures: HashSet<TextureHandle>,
    programs: HashSet<ProgramHandle>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track_vertex_array(&mut self, handle: VertexArrayHandle) {
        self.vertex_arrays.insert(handle);
    }

    pub(crate) fn track_buffer(&mut self, handle: BufferHandle) {
        self.buffers.insert(handle);
    }

    pub(crate) fn track_texture(&mut self, handle: TextureHandle) {
        self.textures.insert(handle);
    }

    pub(crate) fn track_program(&mut self, handle: ProgramHandle) {
        self.programs.insert(handle);
    }

    /// Returns whether the handle was live
    pub(crate) fn forget_vertex_array(&mut self, handle: VertexArrayHandle) -> bool {
        self.vertex_arrays.remove(&handle)
    }

    pub(crate) fn forget_buffer(&mut self, handle: BufferHandle) -> bool {
        self.buffers.remove(&handle)
    }

    pub(crate) fn forget_texture(&mut self, handle: TextureHandle) -> bool {
        self.textures.remove(&handle)
    }

    pub(crate) fn forget_program(&mut self, handle: ProgramHandle) -> bool {
        self.programs.remove(&handle)
    }

    pub fn is_live_texture(&self, handle: TextureHandle) -> bool {
        self.textures.contains(&handle)
    }

    pub fn is_live_program(&self, handle: ProgramHandle) -> bool {
        self.programs.contains(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.vertex_arrays.len() + self.buffers.len() + self.textures.len() + self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Delete every tracked object. Returns how many were deleted.
    pub fn release_all<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let count = self.live_count();
        if count == 0 {
            return 0;
        }

        for vao in self.vertex_arrays.drain() {
            backend.delete_vertex_array(vao);
        }
        for buffer in self.buffers.drain() {
            backend.delete_buffer(buffer);
        }
        if !self.textures.is_empty() {
            let textures: Vec<TextureHandle> = self.textures.drain().collect();
            backend.delete_textures(&textures);
        }
        for program in self.programs.drain() {
            backend.delete_program(program);
        }

        log::debug!("Released {count} leftover GPU objects");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_release_all_balances_backend() {
        let mut backend = DummyBackend::new();
        let mut registry = ResourceRegistry::new();

        registry.track_vertex_array(backend.create_vertex_array().unwrap());
        registry.track_buffer(backend.create_buffer().unwrap());
        registry.track_texture(backend.create_texture().unwrap());
        registry.track_texture(backend.create_texture().unwrap());
        registry.track_program(backend.create_program().unwrap());
        assert_eq!(registry.live_count(), 5);

        assert_eq!(registry.release_all(&mut backend), 5);
        assert!(registry.is_empty());
        let stats = backend.stats();
        assert!(stats.is_balanced());
        assert_eq!(stats.invalid_deletes, 0);

        // Nothing left to delete.
        assert_eq!(registry.release_all(&mut backend), 0);
        assert_eq!(backend.stats().delete_calls, stats.delete_calls);
    }

    #[test]
    fn test_forget() {
        let mut registry = ResourceRegistry::new();
        let texture = TextureHandle::from_raw(4);
        registry.track_texture(texture);
        assert!(registry.is_live_texture(texture));
        assert!(registry.forget_texture(texture));
        assert!(!registry.forget_texture(texture));
        assert!(!registry.is_live_texture(texture));
    }
}
