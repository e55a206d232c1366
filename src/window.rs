//! Window management using winit
//!
//! [`Window`] owns the native window, its event loop and the
//! [`RenderContext`] drawing into it. Events are polled once per frame
//! instead of handing control to the event loop, so the caller keeps the
//! `while !window.should_close()` loop.

use std::collections::HashSet;
use std::time::Duration;

use glam::Vec2;
use log::info;
use winit::{
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window as WinitWindow, WindowBuilder},
};

pub use winit::keyboard::KeyCode;

use crate::backend::{Backend, DummyBackend, GlBackend, GlSurface};
use crate::context::RenderContext;
use crate::error::{SkrError, SkrResult};
use crate::last_error::record;
use crate::{BackendType, ContextConfig, WindowBackendType};

/// Per-frame input callback, run before events are polled
pub type InputHandler = Box<dyn FnMut(&mut Window)>;

/// How finished frames reach the screen
enum Presenter {
    Gl(GlSurface),
    /// Dummy backend; nothing to present
    Headless,
}

impl Presenter {
    fn resize(&self, width: u32, height: u32) {
        if let Presenter::Gl(surface) = self {
            surface.resize(width, height);
        }
    }

    fn present(&self) -> SkrResult<()> {
        match self {
            Presenter::Gl(surface) => surface.swap_buffers(),
            Presenter::Headless => Ok(()),
        }
    }
}

/// Event-driven window state
#[derive(Debug, Default)]
struct WindowState {
    width: u32,
    height: u32,
    resized: bool,
    close_requested: bool,
    pressed_keys: HashSet<KeyCode>,
    cursor_position: Vec2,
    mouse_delta: Vec2,
}

impl WindowState {
    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                self.width = size.width;
                self.height = size.height;
                self.resized = true;
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => {
                    self.pressed_keys.insert(*code);
                }
                ElementState::Released => {
                    self.pressed_keys.remove(code);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Vec2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::Focused(false) => self.pressed_keys.clear(),
            _ => {}
        }
    }

    fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.mouse_delta += Vec2::new(*dx as f32, *dy as f32);
        }
    }
}

/// A native window with a render context bound to it
pub struct Window {
    // Dropped first: GL objects go away while the GL context still exists.
    context: RenderContext<Backend>,
    presenter: Presenter,
    window: WinitWindow,
    event_loop: EventLoop<()>,
    state: WindowState,
    input_handler: Option<InputHandler>,
}

impl Window {
    /// Open a window and create the configured backend for it.
    ///
    /// Only the winit window backend exists; OpenGL renders into the
    /// window, the dummy backend opens the window but draws nothing.
    #[track_caller]
    pub fn open(config: &ContextConfig) -> SkrResult<Self> {
        record(Self::try_open(config))
    }

    fn try_open(config: &ContextConfig) -> SkrResult<Self> {
        if config.window_backend != WindowBackendType::Winit {
            return Err(SkrError::BackendInit(format!(
                "the {} window backend is not implemented",
                config.window_backend
            )));
        }
        if config.backend == BackendType::Vulkan {
            return Err(SkrError::BackendInit(
                "the vulkan graphics backend is not implemented".into(),
            ));
        }

        info!(
            "Opening window '{}' ({}x{}, {})",
            config.title, config.width, config.height, config.backend
        );
        let event_loop = EventLoop::new()
            .map_err(|e| SkrError::BackendInit(format!("event loop: {e}")))?;
        let window = WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .map_err(|e| SkrError::BackendInit(format!("window: {e}")))?;

        let (backend, presenter) = match config.backend {
            BackendType::OpenGl => {
                let (gl, surface) = GlBackend::create_for_window(&window, config)?;
                (Backend::OpenGl(gl), Presenter::Gl(surface))
            }
            _ => (Backend::Dummy(DummyBackend::new()), Presenter::Headless),
        };

        let size = window.inner_size();
        let mut context = RenderContext::with_config(backend, config);
        context.resize_viewport(size.width, size.height);

        Ok(Self {
            context,
            presenter,
            window,
            event_loop,
            state: WindowState {
                width: size.width,
                height: size.height,
                ..Default::default()
            },
            input_handler: None,
        })
    }

    pub fn context(&self) -> &RenderContext<Backend> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RenderContext<Backend> {
        &mut self.context
    }

    /// Get the raw winit window
    pub fn winit_window(&self) -> &WinitWindow {
        &self.window
    }

    /// Framebuffer size as of the last poll
    pub fn size(&self) -> (u32, u32) {
        (self.state.width, self.state.height)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Install the per-frame input callback, replacing any previous one
    pub fn set_input_handler(&mut self, handler: impl FnMut(&mut Window) + 'static) {
        self.input_handler = Some(Box::new(handler));
    }

    pub fn clear_input_handler(&mut self) {
        self.input_handler = None;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.state.pressed_keys.contains(&key)
    }

    pub fn cursor_position(&self) -> Vec2 {
        self.state.cursor_position
    }

    /// Raw mouse motion accumulated during the last poll
    pub fn mouse_delta(&self) -> Vec2 {
        self.state.mouse_delta
    }

    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }

    /// Process pending window events without blocking
    pub fn poll_events(&mut self) {
        let state = &mut self.state;
        state.mouse_delta = Vec2::ZERO;
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _| match event {
                Event::WindowEvent { event, .. } => state.handle_window_event(&event),
                Event::DeviceEvent { event, .. } => state.handle_device_event(&event),
                _ => {}
            });
        if let PumpStatus::Exit(code) = status {
            info!("Event loop exited with code {code}");
            self.state.close_requested = true;
        }
    }

    /// Run one frame: input handler, event poll, resize, clear, `draw`,
    /// present.
    #[track_caller]
    pub fn render_frame<F>(&mut self, draw: F) -> SkrResult<()>
    where
        F: FnOnce(&mut RenderContext<Backend>) -> SkrResult<()>,
    {
        record(self.try_render_frame(draw))
    }

    fn try_render_frame<F>(&mut self, draw: F) -> SkrResult<()>
    where
        F: FnOnce(&mut RenderContext<Backend>) -> SkrResult<()>,
    {
        if let Some(mut handler) = self.input_handler.take() {
            handler(self);
            // The handler may have installed a replacement.
            if self.input_handler.is_none() {
                self.input_handler = Some(handler);
            }
        }

        self.poll_events();

        if self.state.resized {
            let (width, height) = (self.state.width, self.state.height);
            self.presenter.resize(width, height);
            self.context.resize_viewport(width, height);
            self.state.resized = false;
        }

        self.context.clear_frame();
        draw(&mut self.context)?;
        self.presenter.present()
    }

    /// Render frames until the window is asked to close
    pub fn run<F>(&mut self, mut draw: F) -> SkrResult<()>
    where
        F: FnMut(&mut RenderContext<Backend>) -> SkrResult<()>,
    {
        while !self.should_close() {
            self.render_frame(&mut draw)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_and_close_events() {
        let mut state = WindowState::default();
        state.handle_window_event(&WindowEvent::Resized(PhysicalSize::new(640, 480)));
        assert!(state.resized);
        assert_eq!((state.width, state.height), (640, 480));

        assert!(!state.close_requested);
        state.handle_window_event(&WindowEvent::CloseRequested);
        assert!(state.close_requested);
    }

    #[test]
    fn test_mouse_motion_accumulates() {
        let mut state = WindowState::default();
        state.handle_device_event(&DeviceEvent::MouseMotion { delta: (2.0, -1.0) });
        state.handle_device_event(&DeviceEvent::MouseMotion { delta: (1.0, 3.0) });
        assert_eq!(state.mouse_delta, Vec2::new(3.0, 2.0));
    }

    #[test]
    fn test_focus_loss_releases_keys() {
        let mut state = WindowState::default();
        state.pressed_keys.insert(KeyCode::KeyW);
        state.handle_window_event(&WindowEvent::Focused(false));
        assert!(state.pressed_keys.is_empty());
    }

    #[test]
    fn test_unimplemented_backends_fail_before_opening() {
        let sdl = ContextConfig::default().with_window_backend(WindowBackendType::Sdl);
        assert!(matches!(Window::open(&sdl), Err(SkrError::BackendInit(_))));
        assert!(!crate::last_error::is_ok());

        let vulkan = ContextConfig::default().with_backend(BackendType::Vulkan);
        assert!(matches!(Window::open(&vulkan), Err(SkrError::BackendInit(_))));
    }
}
