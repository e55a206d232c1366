//! GPU resources
//!
//! CPU-side meshes and vertex formats, GPU meshes and textures, image
//! loading, and the registry of live handles owned by a render context.

mod mesh;
mod model;
mod registry;
mod texture;
mod vertex;

pub use mesh::*;
pub use model::*;
pub use registry::*;
pub use texture::*;
pub use vertex::*;
