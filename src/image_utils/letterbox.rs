use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Fill used for the padded area, the usual YOLO letterbox gray.
pub const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

/// An image resized into a fixed model input, plus what is needed to map boxes back.
pub struct Letterboxed {
    pub image: RgbImage,
    /// Factor applied to the source image. Divide model coordinates by it to get source pixels.
    pub scale: f32,
}

/// Pads an rgb8 image by adding pixels to the right and bottom of the image.
///
/// Pixels outside the original image take the `fill` color.
pub fn pad_right_bottom_img_rgb8(
    original_image: &RgbImage,
    new_width: u32,
    new_height: u32,
    fill: Rgb<u8>,
) -> RgbImage {
    let mut padded_image: RgbImage = RgbImage::from_pixel(new_width, new_height, fill);
    imageops::replace(&mut padded_image, original_image, 0, 0);
    padded_image
}

/// Resizes an image to fit inside `target_width` x `target_height` keeping its aspect ratio,
/// then pads right and bottom up to the target size.
///
/// Padding only on the right and bottom keeps the origin fixed, so a detection in the
/// letterboxed frame maps back to the source by a plain division by `scale`.
pub fn letterbox(image: &RgbImage, target_width: u32, target_height: u32) -> Letterboxed {
    let scale = (target_width as f32 / image.width() as f32)
        .min(target_height as f32 / image.height() as f32);
    let resized_width = ((image.width() as f32 * scale).round() as u32).clamp(1, target_width);
    let resized_height = ((image.height() as f32 * scale).round() as u32).clamp(1, target_height);
    let resized = imageops::resize(image, resized_width, resized_height, FilterType::Triangle);
    Letterboxed {
        image: pad_right_bottom_img_rgb8(&resized, target_width, target_height, LETTERBOX_FILL),
        scale,
    }
}
