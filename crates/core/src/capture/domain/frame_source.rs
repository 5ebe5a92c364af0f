use crate::error::CaptureError;
use crate::shared::frame::Frame;

/// Domain interface for a live frame producer (webcam, capture card, URL).
///
/// Every call returns the next available frame. Implementations are owned by
/// a single [`CameraSession`](crate::capture::camera_session::CameraSession)
/// which serializes access, so `&mut self` and `Send` are enough.
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;
}
