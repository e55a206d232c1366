//! Core backend abstraction traits
//!
//! The interface every backend implements. Calls are fine-grained and map
//! almost one-to-one onto OpenGL entry points; the shader pipeline and the
//! resource registry are written once on top of them.

use crate::backend::types::*;
use crate::shader::ShaderStage;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to allocate {0}")]
    AllocationFailed(String),
    #[error("Unsupported backend: {0}")]
    Unsupported(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Human readable backend name
    fn name(&self) -> &'static str;

    // Shader units

    /// Create an empty shader object for `stage`
    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderHandle>;

    /// Submit source text and compile it
    fn compile_shader(&mut self, shader: ShaderHandle, source: &str);

    /// Whether the last compilation of `shader` succeeded
    fn shader_compile_status(&self, shader: ShaderHandle) -> bool;

    /// Diagnostic log of the last compilation
    fn shader_info_log(&self, shader: ShaderHandle) -> String;

    fn delete_shader(&mut self, shader: ShaderHandle);

    // Programs

    fn create_program(&mut self) -> BackendResult<ProgramHandle>;

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    fn link_program(&mut self, program: ProgramHandle);

    fn program_link_status(&self, program: ProgramHandle) -> bool;

    fn program_info_log(&self, program: ProgramHandle) -> String;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Make `program` current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramHandle>);

    /// Look up a uniform by name; `None` if the program has no such active uniform
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Write a uniform of the currently used program
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    // Buffers and vertex layout

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle>;

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn create_buffer(&mut self) -> BackendResult<BufferHandle>;

    /// Bind `buffer` to `target` and replace its contents with `data`
    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]);

    /// Describe one attribute of the bound array buffer for the bound vertex array
    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32);

    fn delete_buffer(&mut self, buffer: BufferHandle);

    // Textures

    fn create_texture(&mut self) -> BackendResult<TextureHandle>;

    fn set_texture_parameters(&mut self, texture: TextureHandle, params: &TextureParameters);

    /// Upload mip level 0 of a 2D texture
    fn upload_texture_2d(
        &mut self,
        texture: TextureHandle,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    );

    fn generate_mipmaps(&mut self, texture: TextureHandle);

    /// Bind `texture` to texture unit `unit`
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Delete a batch of textures in one call
    fn delete_textures(&mut self, textures: &[TextureHandle]);

    // Frame

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Clear color and depth
    fn clear(&mut self, color: [f32; 4]);

    /// Draw non-indexed triangles from the bound vertex array
    fn draw_arrays(&mut self, vertex_count: u32);

    /// Draw indexed triangles (`u32` indices) from the bound vertex array
    fn draw_elements(&mut self, index_count: u32);
}
