//! Render context: the resource owner every frame goes through

use std::io;
use std::path::Path;

use log::{debug, trace, warn};

use crate::backend::types::*;
use crate::backend::{Backend, GraphicsBackend};
use crate::error::{SkrError, SkrResult};
use crate::last_error::{clear_error, record};
use crate::resources::{
    DecodingImageLoader, GpuMesh, GpuTexture, ImageLoader, Mesh, MeshState, Model,
    ResourceRegistry, TextureType, VertexFormat,
};
use crate::shader::{self, CompiledUnit, LinkedProgram, ShaderStageSource};
use crate::ContextConfig;

/// Owns a backend and every GPU object created through it.
///
/// Fallible operations return a [`SkrResult`] and mirror it into the
/// per-thread [`last_error`](crate::last_error) slot. Objects that are still
/// alive when the context is finalized or dropped are deleted then.
pub struct RenderContext<B: GraphicsBackend = Backend> {
    backend: B,
    registry: ResourceRegistry,
    image_loader: Box<dyn ImageLoader>,
    clear_color: [f32; 4],
    viewport: (u32, u32),
}

impl<B: GraphicsBackend> RenderContext<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &ContextConfig::default())
    }

    /// Take the clear color and initial viewport size from `config`
    pub fn with_config(backend: B, config: &ContextConfig) -> Self {
        debug!("Creating render context on {}", backend.name());
        Self {
            backend,
            registry: ResourceRegistry::new(),
            image_loader: Box::new(DecodingImageLoader::new()),
            clear_color: config.clear_color,
            viewport: (config.width, config.height),
        }
    }

    /// Replace the image loader used by texture loads
    pub fn with_image_loader(mut self, loader: impl ImageLoader + 'static) -> Self {
        self.image_loader = Box::new(loader);
        self
    }

    pub fn set_image_loader(&mut self, loader: impl ImageLoader + 'static) {
        self.image_loader = Box::new(loader);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Size last passed to [`resize_viewport`](Self::resize_viewport)
    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    // Shaders

    /// Compile one shader stage
    #[track_caller]
    pub fn compile(&mut self, source: &ShaderStageSource) -> SkrResult<CompiledUnit> {
        record(shader::compile(&mut self.backend, source))
    }

    /// Release a unit that will not be linked
    pub fn destroy_unit(&mut self, unit: CompiledUnit) {
        unit.destroy(&mut self.backend);
        clear_error();
    }

    /// Link units into a program; the units are always destroyed
    #[track_caller]
    pub fn link(&mut self, units: Vec<CompiledUnit>) -> SkrResult<LinkedProgram> {
        let result = shader::link(&mut self.backend, units);
        record(self.track_program(result))
    }

    /// Compile every stage and link the results
    #[track_caller]
    pub fn compile_and_link(&mut self, stages: &[ShaderStageSource]) -> SkrResult<LinkedProgram> {
        let result = shader::compile_and_link(&mut self.backend, stages);
        record(self.track_program(result))
    }

    fn track_program(&mut self, result: SkrResult<LinkedProgram>) -> SkrResult<LinkedProgram> {
        if let Ok(program) = &result {
            self.registry.track_program(program.handle());
        }
        result
    }

    /// Make `program` current. A destroyed program unbinds.
    pub fn use_program(&mut self, program: &LinkedProgram) {
        let handle = (!program.is_destroyed()).then(|| program.handle());
        self.backend.use_program(handle);
        clear_error();
    }

    /// Write a uniform of `program`, which must be the program in use.
    ///
    /// Names the program does not declare are ignored.
    pub fn set_uniform(
        &mut self,
        program: &LinkedProgram,
        name: &str,
        value: impl Into<UniformValue>,
    ) {
        match self.backend.uniform_location(program.handle(), name) {
            Some(location) => self.backend.set_uniform(location, &value.into()),
            None => trace!("Uniform '{name}' not found in program #{}", program.handle().raw()),
        }
        clear_error();
    }

    /// Delete `program` and reset its handle; later calls do nothing
    pub fn destroy_program(&mut self, program: &mut LinkedProgram) {
        let handle = program.handle();
        if program.destroy(&mut self.backend) {
            self.registry.forget_program(handle);
        }
        clear_error();
    }

    // Meshes

    /// Upload vertices (and indices, if any) into a new vertex array.
    ///
    /// The attribute layout comes from `V`. An empty index list uploads
    /// nothing to the index buffer and the mesh is drawn unindexed.
    #[track_caller]
    pub fn upload_mesh<V: VertexFormat>(
        &mut self,
        vertices: Vec<V>,
        indices: Vec<u32>,
    ) -> SkrResult<GpuMesh<V>> {
        record(self.try_upload_mesh(vertices, indices))
    }

    /// Upload a CPU [`Mesh`]
    #[track_caller]
    pub fn upload<V: VertexFormat>(&mut self, mesh: Mesh<V>) -> SkrResult<GpuMesh<V>> {
        record(self.try_upload_mesh(mesh.vertices, mesh.indices))
    }

    fn try_upload_mesh<V: VertexFormat>(
        &mut self,
        vertices: Vec<V>,
        indices: Vec<u32>,
    ) -> SkrResult<GpuMesh<V>> {
        let vertex_count = u32::try_from(vertices.len())
            .map_err(|_| SkrError::invalid("too many vertices"))?;
        let index_count =
            u32::try_from(indices.len()).map_err(|_| SkrError::invalid("too many indices"))?;

        let (vertex_array, vertex_buffer, index_buffer) = self.allocate_mesh_handles()?;

        self.backend.bind_vertex_array(Some(vertex_array));
        self.backend.buffer_data(
            BufferTarget::Array,
            vertex_buffer,
            bytemuck::cast_slice(&vertices),
        );
        if !indices.is_empty() {
            self.backend.buffer_data(
                BufferTarget::ElementArray,
                index_buffer,
                bytemuck::cast_slice(&indices),
            );
        }
        for attribute in V::ATTRIBUTES {
            self.backend.vertex_attribute(attribute, V::stride());
        }
        self.backend.bind_vertex_array(None);

        self.registry.track_vertex_array(vertex_array);
        self.registry.track_buffer(vertex_buffer);
        self.registry.track_buffer(index_buffer);

        debug!(
            "Uploaded mesh #{}: {vertex_count} vertices, {index_count} indices",
            vertex_array.raw()
        );
        Ok(GpuMesh {
            vertex_array,
            vertex_buffer,
            index_buffer,
            vertices: Some(vertices),
            vertex_count,
            index_count,
            textures: Vec::new(),
            program: None,
            state: MeshState::Uploaded,
        })
    }

    fn allocate_mesh_handles(
        &mut self,
    ) -> SkrResult<(VertexArrayHandle, BufferHandle, BufferHandle)> {
        let vertex_array = self.backend.create_vertex_array()?;
        let vertex_buffer = match self.backend.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                self.backend.delete_vertex_array(vertex_array);
                return Err(e.into());
            }
        };
        match self.backend.create_buffer() {
            Ok(index_buffer) => Ok((vertex_array, vertex_buffer, index_buffer)),
            Err(e) => {
                self.backend.delete_buffer(vertex_buffer);
                self.backend.delete_vertex_array(vertex_array);
                Err(e.into())
            }
        }
    }

    /// Delete the mesh buffers and its textures.
    ///
    /// Handles are reset to null and the mesh becomes
    /// [`MeshState::Released`]; releasing again issues no backend calls.
    pub fn release_mesh<V>(&mut self, mesh: &mut GpuMesh<V>) {
        if mesh.state == MeshState::Released {
            clear_error();
            return;
        }

        let vertex_array = std::mem::take(&mut mesh.vertex_array);
        if !vertex_array.is_null() {
            self.registry.forget_vertex_array(vertex_array);
            self.backend.delete_vertex_array(vertex_array);
        }
        for buffer in [
            std::mem::take(&mut mesh.vertex_buffer),
            std::mem::take(&mut mesh.index_buffer),
        ] {
            if !buffer.is_null() {
                self.registry.forget_buffer(buffer);
                self.backend.delete_buffer(buffer);
            }
        }
        self.delete_textures(&mut mesh.textures);

        mesh.vertices = None;
        mesh.program = None;
        mesh.state = MeshState::Released;
        debug!("Released mesh #{}", vertex_array.raw());
        clear_error();
    }

    /// Release every mesh of `model` and the textures it shares
    pub fn release_model<V>(&mut self, model: &mut Model<V>) {
        self.delete_textures(&mut model.textures);
        for mesh in &mut model.meshes {
            self.release_mesh(mesh);
        }
        clear_error();
    }

    // Textures

    /// Load an image file into a new mipmapped 2D texture.
    ///
    /// Sampling repeats, filters linearly and uses trilinear minification.
    #[track_caller]
    pub fn load_texture_2d(
        &mut self,
        path: impl AsRef<Path>,
        role: TextureType,
    ) -> SkrResult<GpuTexture> {
        record(self.try_load_texture(path.as_ref(), role))
    }

    /// Load several textures, stopping at the first failure.
    ///
    /// Textures already created by the batch are released before the error
    /// is returned.
    #[track_caller]
    pub fn load_textures_2d<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        role: TextureType,
    ) -> SkrResult<Vec<GpuTexture>> {
        let mut textures = Vec::with_capacity(paths.len());
        for path in paths {
            match self.try_load_texture(path.as_ref(), role) {
                Ok(texture) => textures.push(texture),
                Err(e) => {
                    self.delete_textures(&mut textures);
                    return record(Err(e));
                }
            }
        }
        record(Ok(textures))
    }

    fn try_load_texture(&mut self, path: &Path, role: TextureType) -> SkrResult<GpuTexture> {
        let handle = self.backend.create_texture()?;
        self.backend
            .set_texture_parameters(handle, &TextureParameters::default());

        let Some(image) = self.image_loader.load_image(path) else {
            self.backend.delete_textures(&[handle]);
            return Err(SkrError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidData, "failed to load texture"),
            ));
        };

        let format = PixelFormat::from_channels(image.channels);
        let expected = (image.width as usize)
            .checked_mul(image.height as usize)
            .and_then(|n| n.checked_mul(format.channels() as usize));
        let got = image.pixels.len();
        let problem = match expected {
            None => Some(format!(
                "{}: {}x{} {format:?} is too large",
                path.display(),
                image.width,
                image.height
            )),
            Some(expected) if got < expected => Some(format!(
                "{}: {got} bytes of pixel data, {expected} needed for {format:?}",
                path.display()
            )),
            Some(_) => None,
        };
        if let Some(problem) = problem {
            self.image_loader.free_image(image.pixels);
            self.backend.delete_textures(&[handle]);
            return Err(SkrError::invalid(problem));
        }

        self.backend
            .upload_texture_2d(handle, format, image.width, image.height, &image.pixels);
        self.backend.generate_mipmaps(handle);
        self.image_loader.free_image(image.pixels);
        self.registry.track_texture(handle);

        debug!(
            "Loaded texture #{} from {} ({}x{} {:?})",
            handle.raw(),
            path.display(),
            image.width,
            image.height,
            format
        );
        Ok(GpuTexture {
            handle,
            role,
            path: Some(path.to_path_buf()),
            width: image.width,
            height: image.height,
            format,
        })
    }

    /// Delete textures in one batch and reset their handles.
    ///
    /// Null handles and textures already released elsewhere are skipped.
    pub fn release_textures(&mut self, textures: &mut [GpuTexture]) {
        self.delete_textures(textures);
        clear_error();
    }

    fn delete_textures(&mut self, textures: &mut [GpuTexture]) {
        let live: Vec<TextureHandle> = textures
            .iter_mut()
            .map(|texture| std::mem::take(&mut texture.handle))
            .filter(|handle| !handle.is_null() && self.registry.forget_texture(*handle))
            .collect();
        if !live.is_empty() {
            self.backend.delete_textures(&live);
            debug!("Released {} textures", live.len());
        }
    }

    // Frames

    /// Set the viewport to the new framebuffer size. Zero sizes are ignored.
    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        clear_error();
        if width == 0 || height == 0 {
            warn!("Ignoring viewport resize to {width}x{height}");
            return;
        }
        self.backend.viewport(0, 0, width, height);
        self.viewport = (width, height);
    }

    /// Clear color and depth
    pub fn clear_frame(&mut self) {
        self.backend.clear(self.clear_color);
        clear_error();
    }

    /// Draw `mesh` with its bound program and textures.
    ///
    /// Textures go to consecutive units and are exposed to the program as
    /// `<role prefix><n>`, with `n` counting from 1 per role. Drawing with a
    /// program that has since been destroyed is an `InvalidArgument`.
    #[track_caller]
    pub fn draw_mesh<V>(&mut self, mesh: &GpuMesh<V>) -> SkrResult<()> {
        record(self.try_draw_mesh(mesh))
    }

    fn try_draw_mesh<V>(&mut self, mesh: &GpuMesh<V>) -> SkrResult<()> {
        if mesh.state != MeshState::Uploaded {
            return Err(SkrError::invalid(format!(
                "cannot draw a mesh in state {:?}",
                mesh.state
            )));
        }

        if let Some(program) = mesh.program {
            if !self.registry.is_live_program(program) {
                return Err(SkrError::invalid(format!(
                    "mesh program #{} was destroyed",
                    program.raw()
                )));
            }
            self.backend.use_program(Some(program));
            let mut counters = [0u32; 10];
            for (unit, texture) in mesh.textures.iter().enumerate() {
                let unit = unit as u32;
                let counter = &mut counters[texture.role as usize];
                *counter += 1;
                self.backend.bind_texture(unit, Some(texture.handle));

                let name = format!("{}{}", texture.role.uniform_prefix(), counter);
                if let Some(location) = self.backend.uniform_location(program, &name) {
                    self.backend
                        .set_uniform(location, &UniformValue::Int(unit as i32));
                }
            }
        }

        self.backend.bind_vertex_array(Some(mesh.vertex_array));
        if mesh.index_count > 0 {
            self.backend.draw_elements(mesh.index_count);
        } else {
            self.backend.draw_arrays(mesh.vertex_count);
        }
        self.backend.bind_vertex_array(None);
        Ok(())
    }

    /// Delete everything still alive and consume the context.
    ///
    /// Returns the number of objects that had not been released.
    pub fn finalize(mut self) -> usize {
        self.release_all()
    }

    fn release_all(&mut self) -> usize {
        let leftover = self.registry.release_all(&mut self.backend);
        if leftover > 0 {
            debug!("Render context finalized with {leftover} live objects");
        }
        leftover
    }
}

impl<B: GraphicsBackend> Drop for RenderContext<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}
