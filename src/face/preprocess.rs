//! Image preparation for the face classifier.

use super::detect::FaceRegion;
use image::{imageops, DynamicImage, GrayImage, Luma};
use ndarray::Array4;

/// Luma conversion with BT.601 weights
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Crop the face, resize to `size`x`size`, and scale pixels to [0, 1].
///
/// Output layout is NHWC `[1, size, size, 1]`.
pub fn face_tensor(gray: &GrayImage, region: &FaceRegion, size: u32) -> Array4<f32> {
    let crop = imageops::crop_imm(gray, region.x, region.y, region.width, region.height).to_image();
    let resized = imageops::resize(&crop, size, size, imageops::FilterType::Triangle);

    let n = size as usize;
    Array4::from_shape_fn((1, n, n, 1), |(_, y, x, _)| {
        resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
    })
}
