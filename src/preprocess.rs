use image::imageops::FilterType;
use ndarray::Array4;

use crate::error::Result;

pub const INPUT_WIDTH: u32 = 224;
pub const INPUT_HEIGHT: u32 = 224;

/// Converts uploaded image bytes into the tensor the classifier expects:
/// shape (1, 224, 224, 3), f32 in [0, 1], NHWC.
///
/// The resize stretches to 224x224 without preserving aspect ratio, matching
/// the pipeline the model was trained with. Alpha is dropped and grayscale is
/// expanded so the channel count is always 3.
pub fn preprocess(image_bytes: &[u8]) -> Result<Array4<f32>> {
    let img = image::load_from_memory(image_bytes)?;
    let resized = img.resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::zeros((1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }

    Ok(tensor)
}
