//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use skr::backend::{DummyBackend, DummyStats};
use skr::resources::{ImageLoader, LoadedImage};
use skr::{RenderContext, ShaderStage, ShaderStageSource};

pub const PASS_THROUGH_VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
void main() {
    gl_Position = vec4(aPos, 1.0);
}
"#;

pub const FLAT_COLOR_FRAGMENT: &str = r#"#version 330 core
out vec4 FragColor;
uniform vec4 color;
void main() {
    FragColor = color;
}
"#;

/// A render context on the dummy backend plus its shared counters
pub struct TestContext {
    pub ctx: RenderContext<DummyBackend>,
    stats: Arc<Mutex<DummyStats>>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_backend(DummyBackend::new())
    }

    pub fn with_backend(backend: DummyBackend) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let stats = backend.stats_handle();
        Self {
            ctx: RenderContext::new(backend),
            stats,
        }
    }

    pub fn with_loader(mut self, loader: impl ImageLoader + 'static) -> Self {
        self.ctx.set_image_loader(loader);
        self
    }

    pub fn stats(&self) -> DummyStats {
        self.stats.lock().clone()
    }

    /// Counters that outlive the context
    pub fn stats_handle(&self) -> Arc<Mutex<DummyStats>> {
        Arc::clone(&self.stats)
    }
}

pub fn flat_color_stages() -> Vec<ShaderStageSource> {
    vec![
        ShaderStageSource::inline(ShaderStage::Vertex, PASS_THROUGH_VERTEX),
        ShaderStageSource::inline(ShaderStage::Fragment, FLAT_COLOR_FRAGMENT),
    ]
}

/// Image loader serving in-memory images; unknown paths load as `None`
#[derive(Default)]
pub struct MemoryImageLoader {
    images: HashMap<PathBuf, LoadedImage>,
    pub freed: Arc<Mutex<usize>>,
}

impl MemoryImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: &str, width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        self.images.insert(
            PathBuf::from(path),
            LoadedImage {
                pixels: vec![0xff; len],
                width,
                height,
                channels,
            },
        );
        self
    }
}

impl ImageLoader for MemoryImageLoader {
    fn load_image(&mut self, path: &Path) -> Option<LoadedImage> {
        self.images.get(path).cloned()
    }

    fn free_image(&mut self, _pixels: Vec<u8>) {
        *self.freed.lock() += 1;
    }
}
