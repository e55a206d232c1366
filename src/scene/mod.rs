//! Scene helpers

mod camera;

pub use camera::*;
