use crate::error::NormalizeError;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;

/// Decodes an in-memory image, guessing the format from its magic bytes.
pub fn decode_image(image_bytes: &[u8]) -> Result<DynamicImage, NormalizeError> {
    let image = image::load_from_memory(image_bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(NormalizeError::ZeroDimensions);
    }
    Ok(image)
}

/// Writes an annotated image as PNG, whatever the extension of `filepath`.
pub fn save_rgb8_as_png(image: &RgbImage, filepath: &Path) -> image::ImageResult<()> {
    image.save_with_format(filepath, ImageFormat::Png)
}

#[cfg(test)]
pub(crate) fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
