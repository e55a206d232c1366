//! Texture roles, GPU textures and image loading

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};

use crate::backend::types::{PixelFormat, TextureHandle};

/// Semantic role of a texture within a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    #[default]
    Diffuse,
    Specular,
    Normal,
    Height,
    Emissive,
    Ambient,
    Metallic,
    Roughness,
    Reflection,
    Unknown,
}

impl TextureType {
    /// Sampler uniform prefix used when binding mesh textures, e.g.
    /// `texture_diffuse1`, `texture_diffuse2`, `texture_normal1`.
    pub fn uniform_prefix(&self) -> &'static str {
        match self {
            TextureType::Diffuse => "texture_diffuse",
            TextureType::Specular => "texture_specular",
            TextureType::Normal => "texture_normal",
            TextureType::Height => "texture_height",
            TextureType::Emissive => "texture_emissive",
            TextureType::Ambient => "texture_ambient",
            TextureType::Metallic => "texture_metallic",
            TextureType::Roughness => "texture_roughness",
            TextureType::Reflection => "texture_reflection",
            TextureType::Unknown => "texture_unknown",
        }
    }
}

/// A 2D texture living on the GPU
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTexture {
    pub(crate) handle: TextureHandle,
    pub role: TextureType,
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl GpuTexture {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// `true` once the texture has been released
    pub fn is_released(&self) -> bool {
        self.handle.is_null()
    }
}

/// Decoded image handed to the texture loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Tightly packed rows, `channels` bytes per pixel
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Source of decoded pixels for texture loading.
///
/// [`load_image`](ImageLoader::load_image) returns `None` when the file can
/// not be read or decoded. Every image that was returned is handed back
/// through [`free_image`](ImageLoader::free_image) right after its upload.
pub trait ImageLoader {
    fn load_image(&mut self, path: &Path) -> Option<LoadedImage>;

    fn free_image(&mut self, pixels: Vec<u8>) {
        drop(pixels);
    }
}

/// [`ImageLoader`] decoding common formats with the `image` crate.
///
/// Grayscale, RGB and RGBA images keep their channel count; anything else is
/// converted to RGBA.
#[derive(Debug, Clone, Default)]
pub struct DecodingImageLoader {
    /// Flip rows so that the first row is the bottom of the image
    pub flip_vertically: bool,
}

impl DecodingImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flipped() -> Self {
        Self {
            flip_vertically: true,
        }
    }

    fn decode(&self, img: DynamicImage) -> LoadedImage {
        let img = if self.flip_vertically { img.flipv() } else { img };
        let (width, height) = img.dimensions();
        let (pixels, channels) = match img {
            DynamicImage::ImageLuma8(buf) => (buf.into_raw(), 1),
            DynamicImage::ImageRgb8(buf) => (buf.into_raw(), 3),
            DynamicImage::ImageRgba8(buf) => (buf.into_raw(), 4),
            other => (other.to_rgba8().into_raw(), 4),
        };
        LoadedImage {
            pixels,
            width,
            height,
            channels,
        }
    }
}

impl ImageLoader for DecodingImageLoader {
    fn load_image(&mut self, path: &Path) -> Option<LoadedImage> {
        match image::open(path) {
            Ok(img) => Some(self.decode(img)),
            Err(e) => {
                log::warn!("Failed to decode image {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TextureType::Diffuse, "texture_diffuse")]
    #[case(TextureType::Specular, "texture_specular")]
    #[case(TextureType::Normal, "texture_normal")]
    #[case(TextureType::Height, "texture_height")]
    #[case(TextureType::Unknown, "texture_unknown")]
    fn test_uniform_prefix(#[case] role: TextureType, #[case] prefix: &str) {
        assert_eq!(role.uniform_prefix(), prefix);
    }

    #[test]
    fn test_decode_keeps_channels() {
        let dir = tempfile::tempdir().unwrap();

        let gray = dir.path().join("gray.png");
        image::GrayImage::from_pixel(2, 3, image::Luma([7])).save(&gray).unwrap();
        let loaded = DecodingImageLoader::new().load_image(&gray).unwrap();
        assert_eq!((loaded.width, loaded.height, loaded.channels), (2, 3, 1));
        assert_eq!(loaded.pixels.len(), 6);

        let rgba = dir.path().join("rgba.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 4]))
            .save(&rgba)
            .unwrap();
        let loaded = DecodingImageLoader::new().load_image(&rgba).unwrap();
        assert_eq!(loaded.channels, 4);
        assert_eq!(&loaded.pixels[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_flip_vertically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.png");
        let mut img = image::GrayImage::new(1, 2);
        img.put_pixel(0, 0, image::Luma([10]));
        img.put_pixel(0, 1, image::Luma([20]));
        img.save(&path).unwrap();

        let loaded = DecodingImageLoader::flipped().load_image(&path).unwrap();
        assert_eq!(loaded.pixels, vec![20, 10]);
    }

    #[test]
    fn test_missing_file() {
        assert!(DecodingImageLoader::new()
            .load_image(Path::new("no/such/image.png"))
            .is_none());
    }
}
