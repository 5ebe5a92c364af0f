use crate::error::EmotionError;
use crate::shared::frame::Frame;

/// Domain interface for turning an annotated frame into transport bytes.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EmotionError>;
}
