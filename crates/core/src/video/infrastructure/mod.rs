pub mod image_decoder;
pub mod jpeg_frame_encoder;
