//! Program linking

use crate::backend::{GraphicsBackend, ProgramHandle};
use crate::error::{SkrError, SkrResult};

use super::compiler::{bounded_log, compile, CompiledUnit};
use super::ShaderStageSource;

/// A linked shader program.
///
/// Released through [`RenderContext::destroy_program`](crate::RenderContext::destroy_program)
/// (or [`LinkedProgram::destroy`] when used without a context), which resets
/// the handle so that a second release does nothing.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "linked programs must be destroyed"]
pub struct LinkedProgram {
    handle: ProgramHandle,
}

impl LinkedProgram {
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// `true` once the program has been released
    pub fn is_destroyed(&self) -> bool {
        self.handle.is_null()
    }

    /// Delete the program if it is still alive and reset the handle.
    ///
    /// Returns whether a backend delete was issued.
    pub fn destroy<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if self.handle.is_null() {
            return false;
        }
        backend.delete_program(self.handle);
        log::debug!("Destroyed program #{}", self.handle.raw());
        self.handle = ProgramHandle::NULL;
        true
    }
}

/// Owns compiled units until the end of a link or compile batch and deletes
/// whatever it still holds when dropped.
struct UnitGuard<'a, B: GraphicsBackend + ?Sized> {
    backend: &'a mut B,
    units: Vec<CompiledUnit>,
}

impl<'a, B: GraphicsBackend + ?Sized> UnitGuard<'a, B> {
    fn new(backend: &'a mut B, units: Vec<CompiledUnit>) -> Self {
        Self { backend, units }
    }

    fn detach_all(&mut self, program: ProgramHandle) {
        for unit in &self.units {
            self.backend.detach_shader(program, unit.handle());
        }
    }
}

impl<B: GraphicsBackend + ?Sized> Drop for UnitGuard<'_, B> {
    fn drop(&mut self) {
        for unit in self.units.drain(..) {
            unit.destroy(&mut *self.backend);
        }
    }
}

/// Link compiled units into a program.
///
/// The units are consumed: they are detached and destroyed whether linking
/// succeeds or not. An empty list is rejected before any backend call.
pub fn link<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    units: Vec<CompiledUnit>,
) -> SkrResult<LinkedProgram> {
    if units.is_empty() {
        return Err(SkrError::invalid("cannot link a program from zero shader units"));
    }

    let mut guard = UnitGuard::new(backend, units);
    let program = guard.backend.create_program()?;

    for unit in &guard.units {
        guard.backend.attach_shader(program, unit.handle());
    }
    guard.backend.link_program(program);

    let linked = guard.backend.program_link_status(program);
    let log = (!linked).then(|| bounded_log(guard.backend.program_info_log(program)));
    guard.detach_all(program);

    if let Some(log) = log {
        guard.backend.delete_program(program);
        return Err(SkrError::Link { log });
    }

    log::debug!(
        "Linked program #{} from {} units",
        program.raw(),
        guard.units.len()
    );
    Ok(LinkedProgram { handle: program })
}

/// Compile every stage in order and link the results.
///
/// Stops at the first stage that fails, destroying the units compiled so far.
pub fn compile_and_link<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    stages: &[ShaderStageSource],
) -> SkrResult<LinkedProgram> {
    if stages.is_empty() {
        return Err(SkrError::invalid("no shader stages given"));
    }

    let mut guard = UnitGuard::new(backend, Vec::with_capacity(stages.len()));
    for stage in stages {
        let unit = compile(&mut *guard.backend, stage)?;
        guard.units.push(unit);
    }

    let units = std::mem::take(&mut guard.units);
    link(&mut *guard.backend, units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::shader::{compile_source, ShaderStage};

    const VERTEX: &str = "#version 330 core\nlayout (location = 0) in vec3 aPos;\nvoid main() { gl_Position = vec4(aPos, 1.0); }\n";
    const FRAGMENT: &str = "#version 330 core\nout vec4 FragColor;\nuniform vec4 color;\nvoid main() { FragColor = color; }\n";

    fn stages() -> Vec<ShaderStageSource> {
        vec![
            ShaderStageSource::inline(ShaderStage::Vertex, VERTEX),
            ShaderStageSource::inline(ShaderStage::Fragment, FRAGMENT),
        ]
    }

    #[test]
    fn test_link_consumes_units() {
        let mut backend = DummyBackend::new();
        let vert = compile_source(&mut backend, ShaderStage::Vertex, VERTEX).unwrap();
        let frag = compile_source(&mut backend, ShaderStage::Fragment, FRAGMENT).unwrap();

        let mut program = link(&mut backend, vec![vert, frag]).unwrap();
        let stats = backend.stats();
        assert_eq!(stats.shaders_created, 2);
        assert_eq!(stats.live_shaders(), 0);
        assert_eq!(stats.live_programs(), 1);

        assert!(program.destroy(&mut backend));
        assert!(program.is_destroyed());
        assert!(!program.destroy(&mut backend));
        assert_eq!(backend.stats().programs_deleted, 1);
    }

    #[test]
    fn test_link_empty_allocates_nothing() {
        let mut backend = DummyBackend::new();
        let err = link(&mut backend, Vec::new()).unwrap_err();
        assert!(matches!(err, SkrError::InvalidArgument(_)));
        assert_eq!(backend.stats(), crate::backend::DummyStats::default());
    }

    #[test]
    fn test_link_failure_cleans_up() {
        let mut backend = DummyBackend::new();
        let vert = compile_source(&mut backend, ShaderStage::Vertex, VERTEX).unwrap();
        let frag = compile_source(&mut backend, ShaderStage::Fragment, FRAGMENT).unwrap();
        backend.fail_next_link();

        let err = link(&mut backend, vec![vert, frag]).unwrap_err();
        match err {
            SkrError::Link { log } => assert!(!log.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.stats().is_balanced());
    }

    #[test]
    fn test_program_allocation_failure_destroys_units() {
        let mut backend = DummyBackend::new().with_allocation_budget(1);
        let vert = compile_source(&mut backend, ShaderStage::Vertex, VERTEX).unwrap();

        let err = link(&mut backend, vec![vert]).unwrap_err();
        assert!(matches!(err, SkrError::Alloc(_)));
        assert!(backend.stats().is_balanced());
    }

    #[test]
    fn test_compile_and_link() {
        let mut backend = DummyBackend::new();
        let program = compile_and_link(&mut backend, &stages()).unwrap();
        assert!(!program.handle().is_null());
        assert!(backend
            .uniform_location(program.handle(), "color")
            .is_some());
    }

    #[test]
    fn test_compile_and_link_short_circuits() {
        let mut backend = DummyBackend::new();
        let stages = vec![
            ShaderStageSource::inline(ShaderStage::Vertex, VERTEX),
            ShaderStageSource::inline(ShaderStage::Geometry, "void main() {"),
            ShaderStageSource::inline(ShaderStage::Fragment, FRAGMENT),
        ];

        let err = compile_and_link(&mut backend, &stages).unwrap_err();
        assert!(matches!(
            err,
            SkrError::Compile {
                stage: ShaderStage::Geometry,
                ..
            }
        ));
        let stats = backend.stats();
        // The fragment stage is never compiled.
        assert_eq!(stats.shaders_created, 2);
        assert_eq!(stats.programs_created, 0);
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_compile_and_link_missing_origin() {
        let mut backend = DummyBackend::new();
        let stages = vec![
            ShaderStageSource::inline(ShaderStage::Vertex, VERTEX),
            ShaderStageSource::from_parts(ShaderStage::Fragment, None, None),
        ];

        let err = compile_and_link(&mut backend, &stages).unwrap_err();
        assert!(matches!(err, SkrError::InvalidArgument(_)));
        assert!(err.to_string().contains("Source and Path"));
        assert!(backend.stats().is_balanced());
    }

    #[test]
    fn test_compile_and_link_rejects_empty() {
        let mut backend = DummyBackend::new();
        assert!(matches!(
            compile_and_link(&mut backend, &[]),
            Err(SkrError::InvalidArgument(_))
        ));
    }
}
