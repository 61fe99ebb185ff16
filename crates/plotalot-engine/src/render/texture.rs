use image::DynamicImage;

use crate::assets::AssetResolver;
use crate::device::{Filter, GlDevice, GpuHandle, PixelFormat, Wrap};
use crate::error::{RenderError, Result};

use super::binding::TextureBinding;

/// Decoded, tightly packed 8-bit pixel rows, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexturePixels {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl TexturePixels {
    fn format(&self) -> Result<PixelFormat> {
        let format = PixelFormat::from_channels(self.channels).ok_or_else(|| {
            RenderError::InvalidPixels(format!("unsupported channel count {}", self.channels))
        })?;
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.bytes.len() != expected {
            return Err(RenderError::InvalidPixels(format!(
                "{} bytes for a {}x{} image with {} channels (expected {})",
                self.bytes.len(),
                self.width,
                self.height,
                self.channels,
                expected
            )));
        }
        Ok(format)
    }

    /// Decodes an encoded image (PNG, JPEG, BMP).
    ///
    /// 8-bit gray, gray+alpha and RGB images keep their channel count; anything
    /// else is converted to RGBA8. With `flip` set the rows are reversed so the
    /// first row is the bottom of the image, as GL expects.
    pub fn decode(encoded: &[u8], flip: bool) -> std::result::Result<Self, image::ImageError> {
        let img = image::load_from_memory(encoded)?;
        let img = if flip { img.flipv() } else { img };
        let (width, height) = (img.width(), img.height());

        let (channels, bytes) = match img {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            other => (4, other.into_rgba8().into_raw()),
        };
        Ok(Self {
            bytes,
            width,
            height,
            channels,
        })
    }
}

/// Sampling and upload options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureParams {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: Wrap,
    pub mipmaps: bool,
    /// Flip decoded images vertically before upload.
    pub flip_vertical: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            wrap: Wrap::Repeat,
            mipmaps: true,
            flip_vertical: true,
        }
    }
}

/// 2D texture owned on the GPU.
pub struct Texture {
    handle: GpuHandle,
    width: u32,
    height: u32,
    channels: u8,
    released: bool,
}

impl Texture {
    /// Uploads `pixels` as mip level 0 and applies `params`.
    ///
    /// The upload goes through the active unit, whose previous texture is
    /// bound again afterwards.
    pub fn from_pixels(gl: &dyn GlDevice, pixels: &TexturePixels, params: TextureParams) -> Result<Self> {
        let format = pixels.format()?;
        let handle = gl.create_texture().map_err(RenderError::Driver)?;

        {
            let _texture = TextureBinding::new(gl, handle);
            gl.tex_image_2d(pixels.width, pixels.height, format, &pixels.bytes);
            gl.tex_parameters(params.min_filter, params.mag_filter, params.wrap, params.mipmaps);
            if params.mipmaps {
                gl.generate_mipmap();
            }
        }

        log::debug!(
            "texture {} created ({}x{}, {:?})",
            handle.get(),
            pixels.width,
            pixels.height,
            format
        );
        Ok(Self {
            handle,
            width: pixels.width,
            height: pixels.height,
            channels: pixels.channels,
            released: false,
        })
    }

    /// Resolves `name`, decodes it and uploads the result.
    pub fn load(
        gl: &dyn GlDevice,
        resolver: &AssetResolver,
        name: &str,
        params: TextureParams,
    ) -> Result<Self> {
        let asset = resolver.resolve(name)?;
        let pixels = TexturePixels::decode(&asset.bytes, params.flip_vertical).map_err(|e| {
            log::error!("failed to decode '{}': {}", asset.path.display(), e);
            RenderError::TextureLoad {
                path: asset.path.clone(),
                reason: e.to_string(),
            }
        })?;
        log::info!("loaded texture '{}' from {}", name, asset.path.display());
        Self::from_pixels(gl, &pixels, params)
    }

    #[inline]
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Binds to texture unit `unit` (0-based).
    pub fn bind(&self, gl: &dyn GlDevice, unit: u32) {
        gl.active_texture(unit);
        gl.bind_texture(Some(self.handle));
    }

    pub fn release(mut self, gl: &dyn GlDevice) {
        gl.delete_texture(self.handle);
        self.released = true;
        log::debug!("texture {} released", self.handle.get());
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("texture {} dropped without release", self.handle.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{GlCall, MockDevice};
    use std::io::Cursor;

    /// 2x2 RGB PNG: top row red/green, bottom row blue/white.
    fn png_2x2() -> Vec<u8> {
        let img = image::RgbImage::from_raw(
            2,
            2,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
        )
        .unwrap();
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn decode_flips_rows() {
        let flipped = TexturePixels::decode(&png_2x2(), true).unwrap();
        assert_eq!((flipped.width, flipped.height, flipped.channels), (2, 2, 3));
        assert_eq!(&flipped.bytes[..3], &[0, 0, 255]);

        let upright = TexturePixels::decode(&png_2x2(), false).unwrap();
        assert_eq!(&upright.bytes[..3], &[255, 0, 0]);
    }

    #[test]
    fn upload_sequence_with_mipmaps() {
        let gl = MockDevice::new();
        let pixels = TexturePixels {
            bytes: vec![0; 4 * 4 * 4],
            width: 4,
            height: 4,
            channels: 4,
        };
        let tex = Texture::from_pixels(&gl, &pixels, TextureParams::default()).unwrap();

        let calls = gl.calls();
        assert!(calls.contains(&GlCall::TexImage2d {
            width: 4,
            height: 4,
            format: PixelFormat::Rgba8,
            len: 64,
        }));
        assert!(calls.contains(&GlCall::GenerateMipmap));
        assert_eq!(calls.last(), Some(&GlCall::BindTexture(None)));

        tex.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn channel_count_selects_format() {
        let gl = MockDevice::new();
        let pixels = TexturePixels {
            bytes: vec![7; 3],
            width: 3,
            height: 1,
            channels: 1,
        };
        let params = TextureParams {
            mipmaps: false,
            ..TextureParams::default()
        };
        let tex = Texture::from_pixels(&gl, &pixels, params).unwrap();
        let calls = gl.calls();
        assert!(calls.contains(&GlCall::TexImage2d {
            width: 3,
            height: 1,
            format: PixelFormat::R8,
            len: 3,
        }));
        assert!(!calls.contains(&GlCall::GenerateMipmap));
        tex.release(&gl);
    }

    #[test]
    fn mismatched_pixel_data_is_rejected() {
        let gl = MockDevice::new();
        let bad_len = TexturePixels {
            bytes: vec![0; 5],
            width: 2,
            height: 2,
            channels: 1,
        };
        let bad_channels = TexturePixels {
            bytes: vec![0; 5],
            width: 1,
            height: 1,
            channels: 5,
        };
        for pixels in [bad_len, bad_channels] {
            let err = Texture::from_pixels(&gl, &pixels, TextureParams::default()).err().unwrap();
            assert!(matches!(err, RenderError::InvalidPixels(_)));
        }
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn load_resolves_and_decodes() {
        let gl = MockDevice::new();
        let dir = tempfile::tempdir().unwrap();
        let textures = dir.path().join("Textures");
        std::fs::create_dir_all(&textures).unwrap();
        std::fs::write(textures.join("tile.png"), png_2x2()).unwrap();
        std::fs::write(textures.join("broken.png"), b"not a png").unwrap();

        let resolver = AssetResolver::new("Textures")
            .with_working_dir(dir.path())
            .without_exe_dir();

        let tex = Texture::load(&gl, &resolver, "tile.png", TextureParams::default()).unwrap();
        assert_eq!(tex.size(), (2, 2));
        assert_eq!(tex.channels(), 3);

        let err = Texture::load(&gl, &resolver, "broken.png", TextureParams::default())
            .err()
            .unwrap();
        match err {
            RenderError::TextureLoad { path, .. } => assert!(path.ends_with("broken.png")),
            other => panic!("unexpected error: {other}"),
        }

        tex.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn bind_selects_unit() {
        let gl = MockDevice::new();
        let pixels = TexturePixels {
            bytes: vec![0; 4],
            width: 1,
            height: 1,
            channels: 4,
        };
        let tex = Texture::from_pixels(&gl, &pixels, TextureParams::default()).unwrap();
        gl.clear_calls();
        tex.bind(&gl, 2);
        assert_eq!(
            gl.calls(),
            vec![GlCall::ActiveTexture(2), GlCall::BindTexture(Some(tex.handle()))]
        );
        tex.release(&gl);
    }

    #[test]
    fn upload_keeps_the_callers_binding() {
        let gl = MockDevice::new();
        let pixels = TexturePixels {
            bytes: vec![0; 4],
            width: 1,
            height: 1,
            channels: 4,
        };
        let first = Texture::from_pixels(&gl, &pixels, TextureParams::default()).unwrap();
        first.bind(&gl, 3);

        let second = Texture::from_pixels(&gl, &pixels, TextureParams::default()).unwrap();
        assert_eq!(gl.active_texture_unit(), 3);
        assert_eq!(gl.bound_texture(), Some(first.handle()));

        second.release(&gl);
        first.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }
}
