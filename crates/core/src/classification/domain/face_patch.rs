use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;

use crate::shared::region::Region;

/// Crops `region` out of `gray`, resizes it to `size × size` and lays it out
/// as a normalized `(1, size, size, 1)` tensor.
///
/// The region must already lie inside the image.
pub fn extract_patch(gray: &GrayImage, region: &Region, size: u32) -> Array4<f32> {
    let crop = imageops::crop_imm(
        gray,
        region.x as u32,
        region.y as u32,
        region.width as u32,
        region.height as u32,
    )
    .to_image();
    let resized = imageops::resize(&crop, size, size, FilterType::Triangle);
    to_tensor(&resized)
}

fn to_tensor(patch: &GrayImage) -> Array4<f32> {
    let (w, h) = patch.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, h as usize, w as usize, 1));
    for (x, y, pixel) in patch.enumerate_pixels() {
        tensor[[0, y as usize, x as usize, 0]] = pixel.0[0] as f32 / 255.0;
    }
    tensor
}
