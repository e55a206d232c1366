//! Shader sources, compilation and program linking.
//!
//! # Overview
//!
//! - [`ShaderStageSource`] describes one stage: its [`ShaderStage`] and where
//!   the GLSL comes from ([`ShaderOrigin`]).
//! - [`compile`] turns one source into a [`CompiledUnit`].
//! - [`link`] consumes compiled units and produces a [`LinkedProgram`].
//! - [`compile_and_link`] runs both steps for a whole set of stages.
//!
//! Every path, successful or not, leaves no shader units behind: failed
//! compiles destroy their unit, and the linker destroys all units it was
//! given.
//!
//! # Example
//!
//! ```ignore
//! let program = skr::shader::compile_and_link(
//!     ctx.backend_mut(),
//!     &[
//!         ShaderStageSource::inline(ShaderStage::Vertex, VERTEX_SRC),
//!         ShaderStageSource::file(ShaderStage::Fragment, "shaders/flat.frag"),
//!     ],
//! )?;
//! ```

mod compiler;
mod program;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{SkrError, SkrResult};

pub use compiler::{compile, compile_source, CompiledUnit, INFO_LOG_CAPACITY};
pub use program::{compile_and_link, link, LinkedProgram};

/// Pipeline role of a shader unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
    TessControl,
    TessEval,
}

impl ShaderStage {
    /// Short label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Geometry => "geom",
            ShaderStage::Compute => "comp",
            ShaderStage::TessControl => "tesc",
            ShaderStage::TessEval => "tese",
        }
    }

    /// Parse a diagnostic label or a common file extension.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "vert" | "vs" => Some(ShaderStage::Vertex),
            "frag" | "fs" => Some(ShaderStage::Fragment),
            "geom" | "gs" => Some(ShaderStage::Geometry),
            "comp" | "cs" => Some(ShaderStage::Compute),
            "tesc" => Some(ShaderStage::TessControl),
            "tese" => Some(ShaderStage::TessEval),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the GLSL text of a stage comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderOrigin {
    Inline(String),
    File(PathBuf),
}

/// One shader stage to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageSource {
    stage: ShaderStage,
    origin: Option<ShaderOrigin>,
}

impl ShaderStageSource {
    /// Stage compiled from in-memory GLSL.
    pub fn inline(stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            stage,
            origin: Some(ShaderOrigin::Inline(source.into())),
        }
    }

    /// Stage compiled from a GLSL file.
    pub fn file(stage: ShaderStage, path: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            origin: Some(ShaderOrigin::File(path.into())),
        }
    }

    /// Build from an optional source / optional path pair.
    ///
    /// Inline source takes precedence when both are given. When neither is,
    /// the result has no origin and every compile entry point rejects it with
    /// [`SkrError::InvalidArgument`].
    pub fn from_parts(
        stage: ShaderStage,
        source: Option<String>,
        path: Option<PathBuf>,
    ) -> Self {
        let origin = match (source, path) {
            (Some(source), _) => Some(ShaderOrigin::Inline(source)),
            (None, Some(path)) => Some(ShaderOrigin::File(path)),
            (None, None) => None,
        };
        Self { stage, origin }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn origin(&self) -> Option<&ShaderOrigin> {
        self.origin.as_ref()
    }

    /// The GLSL text of this stage, reading it from disk if needed.
    pub fn resolve(&self) -> SkrResult<Cow<'_, str>> {
        match &self.origin {
            Some(ShaderOrigin::Inline(source)) => Ok(Cow::Borrowed(source)),
            Some(ShaderOrigin::File(path)) => read_source(path).map(Cow::Owned),
            None => Err(SkrError::invalid(format!(
                "{} shader Source and Path are both missing",
                self.stage
            ))),
        }
    }
}

/// Read a whole shader file.
pub fn read_source(path: impl AsRef<Path>) -> SkrResult<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| SkrError::io(path, e))?;
    log::debug!("Read {} bytes of shader source from {}", bytes.len(), path.display());
    String::from_utf8(bytes).map_err(|e| {
        SkrError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}
