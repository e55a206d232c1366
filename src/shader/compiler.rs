//! Single-stage shader compilation

use crate::backend::{GraphicsBackend, ShaderHandle};
use crate::error::{SkrError, SkrResult};

use super::{ShaderStage, ShaderStageSource};

/// Maximum number of bytes of a backend diagnostic log that is kept.
pub const INFO_LOG_CAPACITY: usize = 1024;

/// A compiled, not yet linked shader stage.
///
/// Units are consumed by [`link`](super::link), which always destroys them.
/// A unit that is never linked must be released with [`CompiledUnit::destroy`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "compiled units must be linked or destroyed"]
pub struct CompiledUnit {
    handle: ShaderHandle,
    stage: ShaderStage,
}

impl CompiledUnit {
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Release a unit that will not be linked.
    pub fn destroy<B: GraphicsBackend + ?Sized>(self, backend: &mut B) {
        backend.delete_shader(self.handle);
    }
}

/// Compile one stage, reading its source from disk if it names a file.
pub fn compile<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    source: &ShaderStageSource,
) -> SkrResult<CompiledUnit> {
    let text = source.resolve()?;
    compile_source(backend, source.stage(), &text)
}

/// Compile in-memory GLSL for `stage`.
///
/// On failure the partially created unit is destroyed and the backend log is
/// returned in [`SkrError::Compile`].
pub fn compile_source<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
) -> SkrResult<CompiledUnit> {
    let handle = backend.create_shader(stage)?;
    backend.compile_shader(handle, source);

    if !backend.shader_compile_status(handle) {
        let log = bounded_log(backend.shader_info_log(handle));
        backend.delete_shader(handle);
        return Err(SkrError::Compile { stage, log });
    }

    log::debug!("Compiled {} shader #{}", stage, handle.raw());
    Ok(CompiledUnit { handle, stage })
}

/// Clamp a backend log to [`INFO_LOG_CAPACITY`] and never return it empty.
pub(crate) fn bounded_log(log: String) -> String {
    let log = log.trim_end();
    if log.is_empty() {
        return "no diagnostic log available".to_string();
    }
    let mut end = log.len().min(INFO_LOG_CAPACITY - 1);
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    log[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    const PASS_THROUGH: &str = "#version 330 core\nlayout (location = 0) in vec3 aPos;\nvoid main() { gl_Position = vec4(aPos, 1.0); }\n";

    #[test]
    fn test_compile_success() {
        let mut backend = DummyBackend::new();
        let unit = compile_source(&mut backend, ShaderStage::Vertex, PASS_THROUGH).unwrap();
        assert_eq!(unit.stage(), ShaderStage::Vertex);
        assert!(!unit.handle().is_null());

        unit.destroy(&mut backend);
        assert!(backend.stats().is_balanced());
    }

    #[test]
    fn test_compile_failure_destroys_unit() {
        let mut backend = DummyBackend::new();
        let err = compile_source(&mut backend, ShaderStage::Fragment, "void main( {").unwrap_err();

        match err {
            SkrError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        let stats = backend.stats();
        assert_eq!(stats.shaders_created, 1);
        assert_eq!(stats.shaders_created, stats.shaders_deleted);
    }

    #[test]
    fn test_missing_origin_allocates_nothing() {
        let mut backend = DummyBackend::new();
        let source = ShaderStageSource::from_parts(ShaderStage::Vertex, None, None);
        assert!(matches!(
            compile(&mut backend, &source),
            Err(SkrError::InvalidArgument(_))
        ));
        assert_eq!(backend.stats().shaders_created, 0);
    }

    #[test]
    fn test_compile_from_missing_file() {
        let mut backend = DummyBackend::new();
        let source = ShaderStageSource::file(ShaderStage::Vertex, "missing/pass.vert");
        let err = compile(&mut backend, &source).unwrap_err();
        assert!(err.to_string().contains("missing/pass.vert"));
        assert_eq!(backend.stats().shaders_created, 0);
    }

    #[test]
    fn test_allocation_failure() {
        let mut backend = DummyBackend::new().with_allocation_budget(0);
        let err = compile_source(&mut backend, ShaderStage::Vertex, PASS_THROUGH).unwrap_err();
        assert!(matches!(err, SkrError::Alloc(_)));
    }

    #[test]
    fn test_bounded_log() {
        assert_eq!(bounded_log(String::new()), "no diagnostic log available");
        assert_eq!(bounded_log("error\n".into()), "error");
        assert_eq!(bounded_log("e".repeat(4096)).len(), INFO_LOG_CAPACITY - 1);
    }
}
