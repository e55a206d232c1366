//! Vertex records and their fixed attribute layouts

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::backend::types::VertexAttribute;

/// Number of bones that can influence one vertex
pub const MAX_BONE_INFLUENCE: usize = 4;

/// A vertex record with a fixed attribute layout.
pub trait VertexFormat: Pod {
    /// Attributes in location order, with byte offsets into `Self`
    const ATTRIBUTES: &'static [VertexAttribute];

    /// Distance in bytes between consecutive vertices
    fn stride() -> i32 {
        size_of::<Self>() as i32
    }
}

/// Full vertex for lit, textured and skinned meshes.
///
/// Bone weights are not normalized.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
            ..Default::default()
        }
    }
}

impl VertexFormat for Vertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::float(0, 3, offset_of!(Vertex, position)),
        VertexAttribute::float(1, 3, offset_of!(Vertex, normal)),
        VertexAttribute::float(2, 2, offset_of!(Vertex, uv)),
        VertexAttribute::float(3, 3, offset_of!(Vertex, tangent)),
        VertexAttribute::float(4, 3, offset_of!(Vertex, bitangent)),
        VertexAttribute::int(5, MAX_BONE_INFLUENCE as i32, offset_of!(Vertex, bone_ids)),
        VertexAttribute::float(6, MAX_BONE_INFLUENCE as i32, offset_of!(Vertex, bone_weights)),
    ];
}

/// Position + per-vertex color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: Vec3,
    pub color: Vec3,
}

impl ColorVertex {
    pub const fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }
}

impl VertexFormat for ColorVertex {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        VertexAttribute::float(0, 3, offset_of!(ColorVertex, position)),
        VertexAttribute::float(1, 3, offset_of!(ColorVertex, color)),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_layout_fits<V: VertexFormat>() {
        let stride = V::stride();
        let mut end = 0;
        for (i, attribute) in V::ATTRIBUTES.iter().enumerate() {
            assert_eq!(attribute.location, i as u32);
            assert!(attribute.offset >= end, "attribute {i} overlaps the previous one");
            end = attribute.offset + attribute.size();
        }
        assert_eq!(end, stride);
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(size_of::<Vertex>(), 88);
        assert_layout_fits::<Vertex>();
        assert_eq!(Vertex::ATTRIBUTES[5].offset, 56);
    }

    #[test]
    fn test_color_vertex_layout() {
        assert_eq!(ColorVertex::stride(), 24);
        assert_layout_fits::<ColorVertex>();
    }

    #[test]
    fn test_vertex_bytes() {
        let vertices = [Vertex::new(Vec3::X, Vec3::Y, Vec2::ONE); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * 88);
    }
}
