//! Common types shared between backends

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// The sentinel "no resource" value.
            pub const NULL: Self = Self(0);

            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(&self) -> u32 {
                self.0
            }

            pub fn is_null(&self) -> bool {
                self.0 == 0
            }
        }
    };
}

handle_type!(
    /// Handle to a single compiled shader stage
    ShaderHandle
);
handle_type!(
    /// Handle to a shader program
    ProgramHandle
);
handle_type!(
    /// Handle to a GPU buffer
    BufferHandle
);
handle_type!(
    /// Handle to a vertex array (attribute layout + buffer bindings)
    VertexArrayHandle
);
handle_type!(
    /// Handle to a GPU texture
    TextureHandle
);

/// Location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

impl UniformLocation {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    /// Per-vertex attribute data
    Array,
    /// Index data
    ElementArray,
}

/// Pixel layout of uploaded texture data (8 bits per channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Map a decoder channel count to an upload format.
    ///
    /// 1, 3 and 4 channels map to `Red`, `Rgb` and `Rgba`; anything else
    /// falls back to `Rgb`.
    pub fn from_channels(channels: u8) -> Self {
        match channels {
            1 => PixelFormat::Red,
            4 => PixelFormat::Rgba,
            _ => PixelFormat::Rgb,
        }
    }

    pub fn channels(&self) -> u32 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Sampling state applied to a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParameters {
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
}

impl Default for TextureParameters {
    fn default() -> Self {
        Self {
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
        }
    }
}

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Float,
    Int,
}

/// One attribute of an interleaved vertex record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: i32,
    pub kind: AttributeKind,
    /// Byte offset inside the vertex record
    pub offset: i32,
}

impl VertexAttribute {
    pub const fn float(location: u32, components: i32, offset: usize) -> Self {
        Self {
            location,
            components,
            kind: AttributeKind::Float,
            offset: offset as i32,
        }
    }

    pub const fn int(location: u32, components: i32, offset: usize) -> Self {
        Self {
            location,
            components,
            kind: AttributeKind::Int,
            offset: offset as i32,
        }
    }

    /// Size of the attribute in bytes
    pub fn size(&self) -> i32 {
        self.components * 4
    }
}

/// Value written to a program uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

macro_rules! uniform_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    UniformValue::$variant(value)
                }
            }
        )*
    };
}

uniform_from!(
    bool => Bool,
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, PixelFormat::Red)]
    #[case(2, PixelFormat::Rgb)]
    #[case(3, PixelFormat::Rgb)]
    #[case(4, PixelFormat::Rgba)]
    #[case(0, PixelFormat::Rgb)]
    #[case(7, PixelFormat::Rgb)]
    fn test_pixel_format_from_channels(#[case] channels: u8, #[case] expected: PixelFormat) {
        assert_eq!(PixelFormat::from_channels(channels), expected);
    }

    #[test]
    fn test_null_handles() {
        assert!(BufferHandle::NULL.is_null());
        assert!(BufferHandle::default().is_null());
        assert!(!TextureHandle::from_raw(3).is_null());
        assert_eq!(ProgramHandle::from_raw(9).raw(), 9);
    }

    #[test]
    fn test_uniform_value_conversions() {
        assert_eq!(UniformValue::from(true), UniformValue::Bool(true));
        assert_eq!(UniformValue::from(0.5f32), UniformValue::Float(0.5));
        assert_eq!(
            UniformValue::from(Mat4::IDENTITY),
            UniformValue::Mat4(Mat4::IDENTITY)
        );
    }

    #[test]
    fn test_default_texture_parameters() {
        let params = TextureParameters::default();
        assert_eq!(params.wrap_s, TextureWrap::Repeat);
        assert_eq!(params.min_filter, TextureFilter::LinearMipmapLinear);
        assert_eq!(params.mag_filter, TextureFilter::Linear);
    }
}
