//! Dummy backend for testing and headless development.
//!
//! No GPU work happens. The backend keeps just enough state to behave like a
//! driver: shader sources are checked for an entry point and balanced
//! delimiters, programs remember their attached stages and expose the
//! uniforms declared in them, and every object is tracked so that leaks and
//! double frees show up in [`DummyStats`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::shader::ShaderStage;

/// Call and object counters collected by [`DummyBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub shaders_created: usize,
    pub shaders_deleted: usize,
    pub programs_created: usize,
    pub programs_deleted: usize,
    pub vertex_arrays_created: usize,
    pub vertex_arrays_deleted: usize,
    pub buffers_created: usize,
    pub buffers_deleted: usize,
    pub textures_created: usize,
    pub textures_deleted: usize,
    /// Number of backend delete entry points invoked (a batch counts once)
    pub delete_calls: usize,
    pub buffer_bytes_uploaded: usize,
    pub texture_bytes_uploaded: usize,
    pub mipmaps_generated: usize,
    pub uniforms_set: usize,
    pub draw_calls: usize,
    pub clears: usize,
    pub viewport: Option<(i32, i32, u32, u32)>,
    /// Deletes of handles that were not alive
    pub invalid_deletes: usize,
}

impl DummyStats {
    pub fn live_shaders(&self) -> usize {
        self.shaders_created - self.shaders_deleted
    }

    pub fn live_programs(&self) -> usize {
        self.programs_created - self.programs_deleted
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers_created - self.buffers_deleted
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays_created - self.vertex_arrays_deleted
    }

    pub fn live_textures(&self) -> usize {
        self.textures_created - self.textures_deleted
    }

    /// `true` when every created object has been deleted
    pub fn is_balanced(&self) -> bool {
        self.live_shaders() == 0
            && self.live_programs() == 0
            && self.live_buffers() == 0
            && self.live_vertex_arrays() == 0
            && self.live_textures() == 0
    }
}

#[derive(Debug)]
struct DummyShader {
    stage: ShaderStage,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct DummyProgram {
    attached: Vec<ShaderHandle>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, UniformLocation>,
}

/// Dummy graphics backend.
#[derive(Debug)]
pub struct DummyBackend {
    stats: Arc<Mutex<DummyStats>>,
    next_id: u32,
    allocation_budget: Option<usize>,
    fail_next_link: bool,

    shaders: HashMap<u32, DummyShader>,
    programs: HashMap<u32, DummyProgram>,
    vertex_arrays: HashSet<u32>,
    buffers: HashMap<u32, usize>,
    textures: HashMap<u32, (u32, u32)>,

    bound_vertex_array: Option<VertexArrayHandle>,
    current_program: Option<ProgramHandle>,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(DummyStats::default())),
            next_id: 1,
            allocation_budget: None,
            fail_next_link: false,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashSet::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            bound_vertex_array: None,
            current_program: None,
        }
    }

    /// Allow only `count` more object allocations; later ones fail.
    pub fn with_allocation_budget(mut self, count: usize) -> Self {
        self.allocation_budget = Some(count);
        self
    }

    /// Make the next `link_program` fail regardless of the attached stages.
    pub fn fail_next_link(&mut self) {
        self.fail_next_link = true;
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DummyStats {
        self.stats.lock().clone()
    }

    /// Shared counters that stay readable after the backend is dropped.
    pub fn stats_handle(&self) -> Arc<Mutex<DummyStats>> {
        Arc::clone(&self.stats)
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Size in bytes of the data last uploaded into `buffer`
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer.0).copied()
    }

    /// Dimensions of the level-0 image of `texture`
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture.0).copied()
    }

    fn allocate(&mut self, what: &str) -> BackendResult<u32> {
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                log::trace!("DummyBackend: allocation budget exhausted for {what}");
                return Err(BackendError::AllocationFailed(what.to_string()));
            }
            *budget -= 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("DummyBackend: creating {what} #{id}");
        Ok(id)
    }

    fn record_delete(&mut self, alive: bool, f: impl FnOnce(&mut DummyStats)) {
        let mut stats = self.stats.lock();
        stats.delete_calls += 1;
        if alive {
            f(&mut stats);
        } else {
            stats.invalid_deletes += 1;
        }
    }
}

/// Diagnostic for a source the dummy compiler rejects, or `None` if it compiles.
fn check_source(source: &str) -> Option<String> {
    if source.trim().is_empty() {
        return Some("0:1(1): error: syntax error, unexpected end of file".to_string());
    }
    for (number, line) in source.lines().enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            return Some(format!("0:{}(1): error: {}", number + 1, message.trim()));
        }
    }
    if !source.contains("main") {
        return Some("0:1(1): error: no function with name 'main'".to_string());
    }
    let mut depth = [0i32; 2];
    for (number, line) in source.lines().enumerate() {
        for c in line.chars() {
            let slot = match c {
                '{' | '}' => 0,
                '(' | ')' => 1,
                _ => continue,
            };
            depth[slot] += if c == '{' || c == '(' { 1 } else { -1 };
            if depth[slot] < 0 {
                return Some(format!("0:{}(1): error: syntax error, unexpected '{c}'", number + 1));
            }
        }
    }
    if depth != [0, 0] {
        return Some("0:1(1): error: syntax error, unexpected end of file".to_string());
    }
    None
}

/// Names declared with `uniform <type> <name>;`
fn declared_uniforms(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter_map(|line| {
        let mut words = line.trim_start().strip_prefix("uniform ")?.split_whitespace();
        let _ty = words.next()?;
        let name = words.next()?;
        let name = name.trim_end_matches(';');
        let name = name.split('[').next().unwrap_or(name);
        (!name.is_empty()).then_some(name)
    })
}

impl GraphicsBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_shader(&mut self, stage: ShaderStage) -> BackendResult<ShaderHandle> {
        let id = self.allocate("shader")?;
        self.shaders.insert(
            id,
            DummyShader {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        self.stats.lock().shaders_created += 1;
        Ok(ShaderHandle(id))
    }

    fn compile_shader(&mut self, shader: ShaderHandle, source: &str) {
        let Some(unit) = self.shaders.get_mut(&shader.0) else {
            return;
        };
        unit.source = source.to_string();
        match check_source(source) {
            Some(log) => {
                unit.compiled = false;
                unit.log = log;
            }
            None => {
                unit.compiled = true;
                unit.log.clear();
            }
        }
        log::trace!(
            "DummyBackend: compiled {} shader #{} ({})",
            unit.stage,
            shader.0,
            if unit.compiled { "ok" } else { "failed" }
        );
    }

    fn shader_compile_status(&self, shader: ShaderHandle) -> bool {
        self.shaders.get(&shader.0).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader.0)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        let alive = self.shaders.remove(&shader.0).is_some();
        self.record_delete(alive, |s| s.shaders_deleted += 1);
    }

    fn create_program(&mut self) -> BackendResult<ProgramHandle> {
        let id = self.allocate("program")?;
        self.programs.insert(id, DummyProgram::default());
        self.stats.lock().programs_created += 1;
        Ok(ProgramHandle(id))
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.get_mut(&program.0) {
            p.attached.push(shader);
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.get_mut(&program.0) {
            p.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        let fail_forced = std::mem::take(&mut self.fail_next_link);
        let Some(p) = self.programs.get_mut(&program.0) else {
            return;
        };

        let units: Vec<&DummyShader> = p
            .attached
            .iter()
            .filter_map(|s| self.shaders.get(&s.0))
            .collect();
        let has_compute = units.iter().any(|u| u.stage == ShaderStage::Compute);
        let has_graphics = units.iter().any(|u| u.stage != ShaderStage::Compute);

        let failure = if fail_forced {
            Some("error: link failure requested".to_string())
        } else if units.is_empty() {
            Some("error: no shaders attached to the program".to_string())
        } else if units.iter().any(|u| !u.compiled) {
            Some("error: program contains shaders that failed to compile".to_string())
        } else if has_compute && has_graphics {
            Some("error: compute shader cannot be linked with graphics stages".to_string())
        } else {
            None
        };

        p.uniforms.clear();
        match failure {
            Some(log) => {
                p.linked = false;
                p.log = log;
            }
            None => {
                for unit in &units {
                    for name in declared_uniforms(&unit.source) {
                        let next = p.uniforms.len() as u32;
                        p.uniforms
                            .entry(name.to_string())
                            .or_insert(UniformLocation(next));
                    }
                }
                p.linked = true;
                p.log.clear();
            }
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.programs.get(&program.0).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.programs
            .get(&program.0)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let alive = self.programs.remove(&program.0).is_some();
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.record_delete(alive, |s| s.programs_deleted += 1);
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program.0)
            .filter(|p| p.linked)
            .and_then(|p| p.uniforms.get(name).copied())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        log::trace!("DummyBackend: uniform {} = {:?}", location.0, value);
        self.stats.lock().uniforms_set += 1;
    }

    fn create_vertex_array(&mut self) -> BackendResult<VertexArrayHandle> {
        let id = self.allocate("vertex array")?;
        self.vertex_arrays.insert(id);
        self.stats.lock().vertex_arrays_created += 1;
        Ok(VertexArrayHandle(id))
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        let alive = self.vertex_arrays.remove(&vertex_array.0);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
        self.record_delete(alive, |s| s.vertex_arrays_deleted += 1);
    }

    fn create_buffer(&mut self) -> BackendResult<BufferHandle> {
        let id = self.allocate("buffer")?;
        self.buffers.insert(id, 0);
        self.stats.lock().buffers_created += 1;
        Ok(BufferHandle(id))
    }

    fn buffer_data(&mut self, target: BufferTarget, buffer: BufferHandle, data: &[u8]) {
        log::trace!(
            "DummyBackend: {:?} buffer #{} <- {} bytes",
            target,
            buffer.0,
            data.len()
        );
        if let Some(size) = self.buffers.get_mut(&buffer.0) {
            *size = data.len();
            self.stats.lock().buffer_bytes_uploaded += data.len();
        }
    }

    fn vertex_attribute(&mut self, attribute: &VertexAttribute, stride: i32) {
        log::trace!(
            "DummyBackend: attribute {} ({} x {:?}, offset {}, stride {stride})",
            attribute.location,
            attribute.components,
            attribute.kind,
            attribute.offset
        );
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let alive = self.buffers.remove(&buffer.0).is_some();
        self.record_delete(alive, |s| s.buffers_deleted += 1);
    }

    fn create_texture(&mut self) -> BackendResult<TextureHandle> {
        let id = self.allocate("texture")?;
        self.textures.insert(id, (0, 0));
        self.stats.lock().textures_created += 1;
        Ok(TextureHandle(id))
    }

    fn set_texture_parameters(&mut self, texture: TextureHandle, params: &TextureParameters) {
        log::trace!("DummyBackend: texture #{} parameters {:?}", texture.0, params);
    }

    fn upload_texture_2d(
        &mut self,
        texture: TextureHandle,
        format: PixelFormat,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        log::trace!(
            "DummyBackend: texture #{} <- {width}x{height} {:?}",
            texture.0,
            format
        );
        if let Some(size) = self.textures.get_mut(&texture.0) {
            *size = (width, height);
            self.stats.lock().texture_bytes_uploaded += pixels.len();
        }
    }

    fn generate_mipmaps(&mut self, _texture: TextureHandle) {
        self.stats.lock().mipmaps_generated += 1;
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        log::trace!("DummyBackend: unit {unit} <- {:?}", texture);
    }

    fn delete_textures(&mut self, textures: &[TextureHandle]) {
        let mut stats = self.stats.lock();
        stats.delete_calls += 1;
        for texture in textures {
            if self.textures.remove(&texture.0).is_some() {
                stats.textures_deleted += 1;
            } else {
                stats.invalid_deletes += 1;
            }
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.stats.lock().viewport = Some((x, y, width, height));
    }

    fn clear(&mut self, _color: [f32; 4]) {
        self.stats.lock().clears += 1;
    }

    fn draw_arrays(&mut self, vertex_count: u32) {
        log::trace!("DummyBackend: draw {vertex_count} vertices");
        self.stats.lock().draw_calls += 1;
    }

    fn draw_elements(&mut self, index_count: u32) {
        log::trace!("DummyBackend: draw {index_count} indices");
        self.stats.lock().draw_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 330 core\nlayout (location = 0) in vec3 aPos;\nuniform mat4 model;\nvoid main() { gl_Position = model * vec4(aPos, 1.0); }\n";

    #[test]
    fn test_compile_checks_source() {
        let mut backend = DummyBackend::new();
        let ok = backend.create_shader(ShaderStage::Vertex).unwrap();
        backend.compile_shader(ok, VERTEX);
        assert!(backend.shader_compile_status(ok));
        assert!(backend.shader_info_log(ok).is_empty());

        let bad = backend.create_shader(ShaderStage::Fragment).unwrap();
        backend.compile_shader(bad, "void main() { gl_FragColor = vec4(1.0);");
        assert!(!backend.shader_compile_status(bad));
        assert!(backend.shader_info_log(bad).contains("syntax error"));
    }

    #[test]
    fn test_error_directive_is_reported() {
        let mut backend = DummyBackend::new();
        let shader = backend.create_shader(ShaderStage::Geometry).unwrap();
        backend.compile_shader(shader, "#version 330\n#error unsupported\nvoid main() {}");
        assert_eq!(backend.shader_info_log(shader), "0:2(1): error: unsupported");
    }

    #[test]
    fn test_uniforms_are_collected_on_link() {
        let mut backend = DummyBackend::new();
        let shader = backend.create_shader(ShaderStage::Vertex).unwrap();
        backend.compile_shader(shader, VERTEX);
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, shader);
        backend.link_program(program);

        assert!(backend.program_link_status(program));
        assert!(backend.uniform_location(program, "model").is_some());
        assert!(backend.uniform_location(program, "view").is_none());
    }

    #[test]
    fn test_compute_and_graphics_do_not_link() {
        let mut backend = DummyBackend::new();
        let program = backend.create_program().unwrap();
        for stage in [ShaderStage::Vertex, ShaderStage::Compute] {
            let shader = backend.create_shader(stage).unwrap();
            backend.compile_shader(shader, "void main() {}");
            backend.attach_shader(program, shader);
        }
        backend.link_program(program);
        assert!(!backend.program_link_status(program));
        assert!(backend.program_info_log(program).contains("compute"));
    }

    #[test]
    fn test_allocation_budget() {
        let mut backend = DummyBackend::new().with_allocation_budget(1);
        assert!(backend.create_buffer().is_ok());
        assert_eq!(
            backend.create_buffer(),
            Err(BackendError::AllocationFailed("buffer".to_string()))
        );
    }

    #[test]
    fn test_double_delete_is_counted() {
        let mut backend = DummyBackend::new();
        let buffer = backend.create_buffer().unwrap();
        backend.delete_buffer(buffer);
        backend.delete_buffer(buffer);

        let stats = backend.stats();
        assert_eq!(stats.buffers_deleted, 1);
        assert_eq!(stats.invalid_deletes, 1);
        assert!(stats.is_balanced());
    }
}
