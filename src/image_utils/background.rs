use crate::error::NormalizeError;
use crate::image_utils::image_io::decode_image;
use image::{Rgb, RgbImage};

/// Turns uploaded image bytes into the RGB image the detector runs on.
///
/// Implementations must return an image with the same dimensions as the upload, so detection
/// coordinates stay valid for the original photograph.
pub trait BackgroundNormalizer: Send + Sync {
    fn normalize(&self, image_bytes: &[u8]) -> Result<RgbImage, NormalizeError>;
}

/// Decodes the upload and drops any alpha channel without blending.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughNormalizer;

impl BackgroundNormalizer for PassthroughNormalizer {
    fn normalize(&self, image_bytes: &[u8]) -> Result<RgbImage, NormalizeError> {
        Ok(decode_image(image_bytes)?.into_rgb8())
    }
}

/// Flattens transparent regions onto a uniform background.
///
/// Uploads that went through a background-removal step arrive with the body opaque and the
/// background transparent. Blending onto a flat fill gives the detector a clean, uniform
/// backdrop. Images without alpha are treated as fully opaque.
#[derive(Clone, Copy, Debug)]
pub struct WhiteBackgroundCompositor {
    pub fill: Rgb<u8>,
}

impl Default for WhiteBackgroundCompositor {
    fn default() -> Self {
        WhiteBackgroundCompositor {
            fill: Rgb([255, 255, 255]),
        }
    }
}

impl BackgroundNormalizer for WhiteBackgroundCompositor {
    fn normalize(&self, image_bytes: &[u8]) -> Result<RgbImage, NormalizeError> {
        let decoded = decode_image(image_bytes)?;
        if !decoded.color().has_alpha() {
            return Ok(decoded.into_rgb8());
        }
        let rgba = decoded.into_rgba8();
        let composited = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as u32;
            let blend = |channel: u8, background: u8| -> u8 {
                (((255 - alpha) * background as u32 + alpha * channel as u32) / 255) as u8
            };
            Rgb([
                blend(r, self.fill.0[0]),
                blend(g, self.fill.0[1]),
                blend(b, self.fill.0[2]),
            ])
        });
        Ok(composited)
    }
}
