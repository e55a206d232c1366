//! Crate error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::shader::ShaderStage;

/// Errors produced by SKR operations.
#[derive(Error, Debug)]
pub enum SkrError {
    /// A file (shader source or image) could not be opened or read.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The backend rejected a shader unit.
    #[error("failed to compile {stage}: {log}")]
    Compile { stage: ShaderStage, log: String },
    /// The backend failed to link a program.
    #[error("failed to link prog: {log}")]
    Link { log: String },
    /// A required input was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The backend could not create a resource.
    #[error("allocation failed: {0}")]
    Alloc(String),
    /// Window, context or backend creation failed.
    #[error("backend initialization failed: {0}")]
    BackendInit(String),
}

pub type SkrResult<T> = Result<T, SkrError>;

impl SkrError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<BackendError> for SkrError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::AllocationFailed(msg) => Self::Alloc(msg),
            BackendError::InitializationFailed(msg) => Self::BackendInit(msg),
            BackendError::Unsupported(msg) => Self::BackendInit(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SkrError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: error: 'x' undeclared".to_string(),
        };
        assert_eq!(err.to_string(), "failed to compile frag: 0:3: error: 'x' undeclared");

        let err = SkrError::Link {
            log: "missing main".to_string(),
        };
        assert_eq!(err.to_string(), "failed to link prog: missing main");
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = SkrError::io(
            "shaders/missing.vert",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("shaders/missing.vert"));
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SkrError = BackendError::AllocationFailed("glCreateBuffer".into()).into();
        assert!(matches!(err, SkrError::Alloc(_)));

        let err: SkrError = BackendError::Unsupported("vulkan".into()).into();
        assert!(matches!(err, SkrError::BackendInit(_)));
    }
}
