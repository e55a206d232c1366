//! Backend abstraction layer
//!
//! Provides the [`GraphicsBackend`] trait and the types both backends share.
//!
//! # Available Backends
//!
//! - `dummy`: no-op backend that tracks objects, for tests and headless use
//! - `gl` (feature `opengl`): OpenGL through glow on a glutin context
//!
//! [`Backend`] wraps whichever one was chosen at startup through
//! [`BackendType`].

pub mod dummy;
#[cfg(feature = "opengl")]
pub mod gl;
pub mod traits;
pub mod types;

pub use dummy::{DummyBackend, DummyStats};
#[cfg(feature = "opengl")]
pub use gl::{GlBackend, GlSurface};
pub use traits::*;
pub use types::*;

use crate::shader::ShaderStage;
use crate::BackendType;

/// Backend wrapper selected once at context creation
pub enum Backend {
    Dummy(DummyBackend),
    #[cfg(feature = "opengl")]
    OpenGl(GlBackend),
}

impl Backend {
    /// Create a backend that needs no window.
    ///
    /// Only [`BackendType::Dummy`] qualifies; OpenGL backends come from
    /// [`Window::open`](crate::window::Window::open), which owns the context.
    pub fn headless(backend_type: BackendType) -> BackendResult<Self> {
        match backend_type {
            BackendType::Dummy => Ok(Backend::Dummy(DummyBackend::new())),
            BackendType::OpenGl => Err(BackendError::InitializationFailed(
                "the OpenGL backend needs a window".into(),
            )),
            BackendType::Vulkan => Err(BackendError::Unsupported(
                "the Vulkan backend is not implemented".into(),
            )),
        }
    }

    pub fn backend_type(&self) -> BackendType {
        match self {
            Backend::Dummy(_) => BackendType::Dummy,
            #[cfg(feature = "opengl")]
            Backend::OpenGl(_) => BackendType::OpenGl,
        }
    }

    /// Get the dummy backend (if using it)
    pub fn as_dummy(&self) -> Option<&DummyBackend> {
        match self {
            Backend::Dummy(b) => Some(b),
            #[cfg(feature = "opengl")]
            _ => None,
        }
    }

    /// Get the OpenGL backend (if using it)
    #[cfg(feature = "opengl")]
    pub fn as_gl(&self) -> Option<&GlBackend> {
        match self {
            Backend::OpenGl(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $b:ident => $call:expr) => {
        match $self {
            Backend::Dummy($b) => $call,
            #[cfg(feature = "opengl")]
            Backend::OpenGl($b) => $call,
        }
    };
}

impl GraphicsBackend for Backend {
    fn name(&self) -> &'static str {
        dispatch!(self, b => b.name())
    }

    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderHandle> {
        dispatch!(self, b => b.create_shader(stage))
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) {
        dispatch!(self, b => b.compile_shader(shader, source))
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        dispatch!(self, b => b.shader_compile_status(shader))
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        dispatch!(self, b => b.shader_info_log(shader))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        dispatch!(self, b => b.delete_shader(shader))
    }

    fn create_program(&mut self) -> BackendResult<ProgramHandle> {
        dispatch!(self, b => b.create_program())
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        dispatch!(self, b => b.attach_shader(program, shader))
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        dispatch!(self, b => b.detach_shader(program, shader))
    }

    fn link_program(&mut self, program: ProgramHandle) {
        dispatch!(self, b => b.link_program(program))
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        dispatch!(self, b => b.program_link_status(program))
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        dispatch!(self, b => b.program_info_log(program))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        dispatch!(self, b => b.delete_program(program))
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        dispatch!(self, b => b.use_program(program))
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        dispatch!(self, b => b.uniform_location(program, name))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        dispatch!(self, b => b.set_uniform(location, value))
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        dispatch!(self, b => b.create_vertex_array())
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        dispatch!(self, b => b.bind_vertex_array(vertex_array))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        dispatch!(self, b => b.delete_vertex_array(vertex_array))
    }

    fn create_buffer(&mut self) -> BackendResult<BufferHandle> {
        dispatch!(self, b => b.create_buffer())
    }

    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        dispatch!(self, b => b.buffer_data(target, buffer, data))
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32) {
        dispatch!(self, b => b.vertex_attribute(attribute, stride))
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        dispatch!(self, b => b.delete_buffer(buffer))
    }

    fn create_texture(&mut self) -> BackendResult<TextureHandle> {
        dispatch!(self, b => b.create_texture())
    }

    fn set_texture_parameters(&mut self, texture: TextureHandle, params: &TextureParameters) {
        dispatch!(self, b => b.set_texture_parameters(texture, params))
    }

    fn upload_texture_2d(
        &mut self,
        texture: TextureHandle,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        dispatch!(self, b => b.upload_texture_2d(texture, format, width, height, pixels))
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        dispatch!(self, b => b.generate_mipmaps(texture))
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        dispatch!(self, b => b.bind_texture(unit, texture))
    }

    fn delete_textures(&mut self, textures: &[TextureHandle]) {
        dispatch!(self, b => b.delete_textures(textures))
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        dispatch!(self, b => b.viewport(x, y, width, height))
    }

    fn clear(&mut self, color: [f32; 4]) {
        dispatch!(self, b => b.clear(color))
    }

    fn draw_arrays(&mut self, vertex_count: u32) {
        dispatch!(self, b => b.draw_arrays(vertex_count))
    }

    fn draw_elements(&mut self, index_count: u32) {
        dispatch!(self, b => b.draw_elements(index_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_selection() {
        let backend = Backend::headless(BackendType::Dummy).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Dummy);
        assert!(backend.as_dummy().is_some());

        assert!(matches!(
            Backend::headless(BackendType::Vulkan),
            Err(BackendError::Unsupported(_))
        ));
        assert!(Backend::headless(BackendType::OpenGl).is_err());
    }
}
