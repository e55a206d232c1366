//! SKR - a thin rendering layer over OpenGL and a windowing library
//!
//! The crate hides the native graphics and windowing APIs behind a small
//! surface:
//! - **Shaders**: compile GLSL stages and link them into programs
//!   ([`shader`])
//! - **Resources**: upload meshes and textures and release them again
//!   ([`resources`], [`RenderContext`])
//! - **Frame loop**: window, input polling, resize, clear, draw, present
//!   ([`window`], feature `opengl`)
//!
//! # Backends
//! - **OpenGL**: glow on a glutin context (feature `opengl`, default)
//! - **Dummy**: records calls without a GPU, for tests and headless use
//!
//! # Errors
//! Every fallible call returns a [`SkrResult`]. [`RenderContext`] operations
//! additionally mirror their outcome into a per-thread slot, see
//! [`last_error`].

pub mod backend;
pub mod context;
pub mod error;
pub mod last_error;
pub mod resources;
pub mod scene;
pub mod shader;
#[cfg(feature = "opengl")]
pub mod window;

use std::fmt;
use std::str::FromStr;

pub use backend::{Backend, DummyBackend, GraphicsBackend};
pub use context::RenderContext;
pub use error::{SkrError, SkrResult};
pub use resources::{GpuMesh, GpuTexture, Mesh, Model, TextureType, Vertex};
pub use shader::{CompiledUnit, LinkedProgram, ShaderStage, ShaderStageSource};
#[cfg(feature = "opengl")]
pub use window::Window;

/// Graphics backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    /// OpenGL through glow (requires a window)
    #[default]
    OpenGl,
    /// Reserved, not implemented
    Vulkan,
    /// No-op backend that only records calls
    Dummy,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendType::OpenGl => "opengl",
            BackendType::Vulkan => "vulkan",
            BackendType::Dummy => "dummy",
        })
    }
}

impl FromStr for BackendType {
    type Err = SkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opengl" | "gl" => Ok(BackendType::OpenGl),
            "vulkan" | "vk" => Ok(BackendType::Vulkan),
            "dummy" | "headless" => Ok(BackendType::Dummy),
            other => Err(SkrError::invalid(format!("unknown graphics backend '{other}'"))),
        }
    }
}

/// Windowing backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowBackendType {
    #[default]
    Winit,
    /// Reserved, not implemented
    Sdl,
}

impl fmt::Display for WindowBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowBackendType::Winit => "winit",
            WindowBackendType::Sdl => "sdl",
        })
    }
}

impl FromStr for WindowBackendType {
    type Err = SkrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "winit" | "glfw" => Ok(WindowBackendType::Winit),
            "sdl" => Ok(WindowBackendType::Sdl),
            other => Err(SkrError::invalid(format!("unknown window backend '{other}'"))),
        }
    }
}

/// Configuration for opening a window and its render context
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Which graphics backend to use
    pub backend: BackendType,
    /// Which windowing library to use
    pub window_backend: WindowBackendType,
    /// Enable vsync
    pub vsync: bool,
    /// Requested OpenGL core profile version (major, minor)
    pub gl_version: (u8, u8),
    /// Color used by [`RenderContext::clear_frame`]
    pub clear_color: [f32; 4],
    /// Request a debug GL context
    pub debug_context: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            title: "SKR".to_string(),
            width: 800,
            height: 600,
            backend: BackendType::OpenGl,
            window_backend: WindowBackendType::Winit,
            vsync: true,
            gl_version: (3, 3),
            clear_color: [0.1, 0.1, 0.1, 1.0],
            debug_context: false,
        }
    }
}

impl ContextConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_window_backend(mut self, window_backend: WindowBackendType) -> Self {
        self.window_backend = window_backend;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_gl_version(mut self, major: u8, minor: u8) -> Self {
        self.gl_version = (major, minor);
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_debug_context(mut self, debug: bool) -> Self {
        self.debug_context = debug;
        self
    }
}

/// Install `env_logger` (honouring `RUST_LOG`, default level `info`).
///
/// Safe to call more than once; later calls do nothing.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("opengl", BackendType::OpenGl)]
    #[case("GL", BackendType::OpenGl)]
    #[case("vulkan", BackendType::Vulkan)]
    #[case("dummy", BackendType::Dummy)]
    fn test_backend_type_from_str(#[case] input: &str, #[case] expected: BackendType) {
        assert_eq!(input.parse::<BackendType>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_backend_type() {
        let err = "metal".parse::<BackendType>().unwrap_err();
        assert!(matches!(err, SkrError::InvalidArgument(_)));
        assert!("qt".parse::<WindowBackendType>().is_err());
    }

    #[test]
    fn test_backend_type_display_round_trip() {
        for ty in [BackendType::OpenGl, BackendType::Vulkan, BackendType::Dummy] {
            assert_eq!(ty.to_string().parse::<BackendType>().unwrap(), ty);
        }
        assert_eq!("sdl".parse::<WindowBackendType>().unwrap(), WindowBackendType::Sdl);
    }

    #[test]
    fn test_default_config() {
        let config = ContextConfig::default();
        assert_eq!(config.title, "SKR");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.backend, BackendType::OpenGl);
        assert_eq!(config.window_backend, WindowBackendType::Winit);
        assert_eq!(config.gl_version, (3, 3));
        assert!(config.vsync);
        assert!(!config.debug_context);
    }

    #[test]
    fn test_config_builders() {
        let config = ContextConfig::default()
            .with_title("demo")
            .with_size(320, 240)
            .with_backend(BackendType::Dummy)
            .with_vsync(false)
            .with_gl_version(4, 1);
        assert_eq!(config.title, "demo");
        assert_eq!((config.width, config.height), (320, 240));
        assert_eq!(config.backend, BackendType::Dummy);
        assert!(!config.vsync);
        assert_eq!(config.gl_version, (4, 1));
    }
}
