//! OpenGL backend on top of glow, with a glutin context bound to a winit window.

use std::ffi::CStr;
use std::num::NonZeroU32;

use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::GlSurface as _;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use log::{debug, info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::error::{SkrError, SkrResult};
use crate::shader::ShaderStage;
use crate::ContextConfig;

/// GL enum for a shader stage
pub fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
        ShaderStage::TessControl => glow::TESS_CONTROL_SHADER,
        ShaderStage::TessEval => glow::TESS_EVALUATION_SHADER,
    }
}

/// Diagnostic label for a raw GL shader type; `"unknown"` for anything else
pub fn stage_label(raw: u32) -> &'static str {
    match raw {
        glow::VERTEX_SHADER => "vert",
        glow::FRAGMENT_SHADER => "frag",
        glow::GEOMETRY_SHADER => "geom",
        glow::COMPUTE_SHADER => "comp",
        glow::TESS_CONTROL_SHADER => "tesc",
        glow::TESS_EVALUATION_SHADER => "tese",
        _ => "unknown",
    }
}

fn convert_wrap(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
    }) as i32
}

fn convert_filter(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn convert_pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Red => glow::RED,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

fn convert_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn native<T>(raw: u32, wrap: fn(NonZeroU32) -> T) -> Option<T> {
    NonZeroU32::new(raw).map(wrap)
}

/// OpenGL backend implementation
///
/// All calls assume the context created alongside it is current on the
/// calling thread.
pub struct GlBackend {
    gl: glow::Context,
}

impl GlBackend {
    /// Wrap an already-current glow context.
    ///
    /// # Safety
    ///
    /// `gl` must belong to a context that is current on this thread for the
    /// whole lifetime of the backend.
    pub unsafe fn from_context(gl: glow::Context) -> Self {
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        Self { gl }
    }

    /// Create a GL context for `window`, make it current and load the API.
    pub fn create_for_window(
        window: &winit::window::Window,
        config: &ContextConfig,
    ) -> SkrResult<(Self, GlSurface)> {
        info!("Initializing OpenGL backend...");
        let (surface, context, gl) = create_opengl_context(window, config)?;
        log_driver_info(&gl);
        // SAFETY: the context was made current on this thread above.
        let backend = unsafe { Self::from_context(gl) };
        Ok((backend, GlSurface { surface, context }))
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

/// Window surface + context pair used to present frames
pub struct GlSurface {
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
}

impl GlSurface {
    pub fn swap_buffers(&self) -> SkrResult<()> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| SkrError::BackendInit(format!("swap buffers: {e}")))
    }

    pub fn resize(&self, width: u32, height: u32) {
        match (NonZeroU32::new(width), NonZeroU32::new(height)) {
            (Some(w), Some(h)) => self.surface.resize(&self.context, w, h),
            _ => warn!("Ignoring surface resize to {width}x{height}"),
        }
    }
}

fn log_driver_info(gl: &glow::Context) {
    // SAFETY: plain string queries on the current context.
    unsafe {
        let version = gl.get_parameter_string(glow::VERSION);
        let renderer = gl.get_parameter_string(glow::RENDERER);
        let vendor = gl.get_parameter_string(glow::VENDOR);
        let glsl = gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION);
        info!("OpenGL driver: {renderer} [{vendor}], {version}, GLSL {glsl}");
    }
}

fn init_error(what: &str, e: impl std::fmt::Display) -> SkrError {
    SkrError::BackendInit(format!("{what}: {e}"))
}

fn create_opengl_context(
    window: &winit::window::Window,
    config: &ContextConfig,
) -> SkrResult<(Surface<WindowSurface>, PossiblyCurrentContext, glow::Context)> {
    let display_handle = window
        .display_handle()
        .map_err(|e| init_error("display handle", e))?
        .as_raw();
    let raw_window_handle = window
        .window_handle()
        .map_err(|e| init_error("window handle", e))?
        .as_raw();

    #[cfg(target_os = "windows")]
    let preference = {
        debug!("Using WGL for OpenGL context.");
        DisplayApiPreference::Wgl(Some(raw_window_handle))
    };
    #[cfg(target_os = "macos")]
    let preference = {
        debug!("Using CGL for OpenGL context.");
        DisplayApiPreference::Cgl
    };
    #[cfg(all(unix, not(target_os = "macos")))]
    let preference = {
        debug!("Using EGL for OpenGL context.");
        DisplayApiPreference::Egl
    };

    // SAFETY: the handles come from a live winit window.
    let display = unsafe { Display::new(display_handle, preference) }
        .map_err(|e| init_error("display", e))?;

    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(24)
        .with_transparency(false)
        .build();
    // SAFETY: the display outlives the config iterator.
    let gl_config = unsafe { display.find_configs(template) }
        .map_err(|e| init_error("config", e))?
        .next()
        .ok_or_else(|| SkrError::BackendInit("no suitable GL config".into()))?;

    // Fall back to the configured size while the window reports 0x0.
    let size = window.inner_size();
    let extent = |actual: u32, configured: u32| {
        NonZeroU32::new(actual)
            .or(NonZeroU32::new(configured))
            .unwrap_or(NonZeroU32::MIN)
    };
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        extent(size.width, config.width),
        extent(size.height, config.height),
    );
    // SAFETY: the surface is tied to the window that owns `raw_window_handle`.
    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(|e| init_error("window surface", e))?;

    let (major, minor) = config.gl_version;
    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(major, minor))))
        .with_profile(GlProfile::Core)
        .with_debug(config.debug_context)
        .build(Some(raw_window_handle));
    // SAFETY: the config was produced by this display.
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .map_err(|e| init_error("context", e))?
        .make_current(&surface)
        .map_err(|e| init_error("make current", e))?;

    let interval = if config.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(e) = surface.set_swap_interval(&context, interval) {
        warn!("Failed to set swap interval (VSync): {e}");
    }

    // SAFETY: the context is current, so the loaded pointers are valid.
    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s))
    };
    Ok((surface, context, gl))
}

// SAFETY (whole impl): every call goes to the context made current in
// `create_for_window`; invalid (zero) handles are filtered out before they
// reach GL.
impl GraphicsBackend for GlBackend {
    fn name(&self) -> &'static str {
        "OpenGL"
    }

    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderHandle> {
        let ty = stage_enum(stage);
        let shader = unsafe { self.gl.create_shader(ty) }
            .map_err(|e| BackendError::AllocationFailed(format!("{} shader: {e}", stage_label(ty))))?;
        Ok(ShaderHandle(shader.0.get()))
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(shader) = native(shader.0, glow::NativeShader) {
            unsafe {
                self.gl.shader_source(shader, source);
                self.gl.compile_shader(shader);
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        native(shader.0, glow::NativeShader)
            .is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        native(shader.0, glow::NativeShader)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(shader) = native(shader.0, glow::NativeShader) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&mut self) -> BackendResult<ProgramHandle> {
        let program = unsafe { self.gl.create_program() }
            .map_err(|e| BackendError::AllocationFailed(format!("program: {e}")))?;
        Ok(ProgramHandle(program.0.get()))
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(p), Some(s)) = (
            native(program.0, glow::NativeProgram),
            native(shader.0, glow::NativeShader),
        ) {
            unsafe { self.gl.attach_shader(p, s) };
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(p), Some(s)) = (
            native(program.0, glow::NativeProgram),
            native(shader.0, glow::NativeShader),
        ) {
            unsafe { self.gl.detach_shader(p, s) };
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        if let Some(p) = native(program.0, glow::NativeProgram) {
            unsafe { self.gl.link_program(p) };
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        native(program.0, glow::NativeProgram)
            .is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        native(program.0, glow::NativeProgram)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(p) = native(program.0, glow::NativeProgram) {
            unsafe { self.gl.delete_program(p) };
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let program = program.and_then(|p| native(p.0, glow::NativeProgram));
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let p = native(program.0, glow::NativeProgram)?;
        unsafe { self.gl.get_uniform_location(p, name) }.map(|l| UniformLocation(l.0))
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::Bool(v) => self.gl.uniform_1_i32(loc, i32::from(*v)),
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32_slice(loc, &v.to_array()),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32_slice(loc, &v.to_array()),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32_slice(loc, &v.to_array()),
                UniformValue::Mat2(m) => {
                    self.gl.uniform_matrix_2_f32_slice(loc, false, &m.to_cols_array())
                }
                UniformValue::Mat3(m) => {
                    self.gl.uniform_matrix_3_f32_slice(loc, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.gl.uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array())
                }
            }
        }
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(|e| BackendError::AllocationFailed(format!("vertex array: {e}")))?;
        Ok(VertexArrayHandle(vao.0.get()))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        let vao = vertex_array.and_then(|v| native(v.0, glow::NativeVertexArray));
        unsafe { self.gl.bind_vertex_array(vao) };
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if let Some(vao) = native(vertex_array.0, glow::NativeVertexArray) {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn create_buffer(&mut self) -> BackendResult<BufferHandle> {
        let buffer = unsafe { self.gl.create_buffer() }
            .map_err(|e| BackendError::AllocationFailed(format!("buffer: {e}")))?;
        Ok(BufferHandle(buffer.0.get()))
    }

    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        let target = convert_target(target);
        let buffer = native(buffer.0, glow::NativeBuffer);
        unsafe {
            self.gl.bind_buffer(target, buffer);
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
        }
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32) {
        unsafe {
            self.gl.enable_vertex_attrib_array(attribute.location);
            match attribute.kind {
                AttributeKind::Float => self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    stride,
                    attribute.offset,
                ),
                AttributeKind::Int => self.gl.vertex_attrib_pointer_i32(
                    attribute.location,
                    attribute.components,
                    glow::INT,
                    stride,
                    attribute.offset,
                ),
            }
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = native(buffer.0, glow::NativeBuffer) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn create_texture(&mut self) -> BackendResult<TextureHandle> {
        let texture = unsafe { self.gl.create_texture() }
            .map_err(|e| BackendError::AllocationFailed(format!("texture: {e}")))?;
        Ok(TextureHandle(texture.0.get()))
    }

    fn set_texture_parameters(&mut self, texture: TextureHandle, params: &TextureParameters) {
        let texture = native(texture.0, glow::NativeTexture);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
            let set = |name, value| self.gl.tex_parameter_i32(glow::TEXTURE_2D, name, value);
            set(glow::TEXTURE_WRAP_S, convert_wrap(params.wrap_s));
            set(glow::TEXTURE_WRAP_T, convert_wrap(params.wrap_t));
            set(glow::TEXTURE_MIN_FILTER, convert_filter(params.min_filter));
            set(glow::TEXTURE_MAG_FILTER, convert_filter(params.mag_filter));
        }
    }

    fn upload_texture_2d(
        &mut self,
        texture: TextureHandle,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        let format = convert_pixel_format(format);
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, native(texture.0, glow::NativeTexture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format as i32,
                width as i32,
                height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                Some(pixels),
            );
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, native(texture.0, glow::NativeTexture));
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        let texture = texture.and_then(|t| native(t.0, glow::NativeTexture));
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture);
        }
    }

    fn delete_textures(&mut self, textures: &[TextureHandle]) {
        for texture in textures {
            if let Some(t) = native(texture.0, glow::NativeTexture) {
                unsafe { self.gl.delete_texture(t) };
            }
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { self.gl.viewport(x, y, width as i32, height as i32) };
    }

    fn clear(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn draw_arrays(&mut self, vertex_count: u32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count as i32) };
    }

    fn draw_elements(&mut self, index_count: u32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ShaderStage::Vertex)]
    #[case(ShaderStage::Fragment)]
    #[case(ShaderStage::Geometry)]
    #[case(ShaderStage::Compute)]
    #[case(ShaderStage::TessControl)]
    #[case(ShaderStage::TessEval)]
    fn test_stage_enum_round_trip(#[case] stage: ShaderStage) {
        assert_eq!(stage_label(stage_enum(stage)), stage.label());
    }

    #[test]
    fn test_unknown_stage_label() {
        assert_eq!(stage_label(glow::TEXTURE_2D), "unknown");
    }

    #[test]
    fn test_pixel_formats() {
        assert_eq!(convert_pixel_format(PixelFormat::Red), glow::RED);
        assert_eq!(convert_pixel_format(PixelFormat::Rgb), glow::RGB);
        assert_eq!(convert_pixel_format(PixelFormat::Rgba), glow::RGBA);
    }
}
