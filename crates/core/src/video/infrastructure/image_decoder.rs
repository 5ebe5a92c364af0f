use crate::error::EmotionError;
use crate::shared::frame::Frame;

/// Decodes an uploaded image of any format the `image` crate recognizes.
///
/// The format is guessed from the content, never from a file name. Alpha
/// and higher bit depths are flattened to 8-bit RGB.
pub fn decode_image(bytes: &[u8]) -> Result<Frame, EmotionError> {
    let image = image::load_from_memory(bytes).map_err(EmotionError::Decode)?;
    Ok(Frame::from_rgb_image(image.to_rgb8(), 0))
}
