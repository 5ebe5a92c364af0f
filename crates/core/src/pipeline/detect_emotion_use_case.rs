use std::sync::Arc;

use crate::error::EmotionError;
use crate::pipeline::detection_outcome::{DetectionOutcome, DominantSelection};
use crate::pipeline::face_emotion_analyzer::FaceEmotionAnalyzer;
use crate::shared::constants::{NO_IMAGE_PROVIDED, NO_IMAGE_SELECTED};
use crate::video::infrastructure::image_decoder::decode_image;

/// Checks an upload before any decoding: `file_name` is the name attached to
/// the `image` form field, or `None` when no such file part exists.
pub fn validate_upload(file_name: Option<&str>) -> Result<(), EmotionError> {
    match file_name {
        None => Err(EmotionError::InvalidInput(NO_IMAGE_PROVIDED.into())),
        Some("") => Err(EmotionError::InvalidInput(NO_IMAGE_SELECTED.into())),
        Some(_) => Ok(()),
    }
}

/// Single-image pipeline: decode → grayscale → locate → classify.
pub struct DetectEmotionUseCase {
    analyzer: Arc<FaceEmotionAnalyzer>,
    selection: DominantSelection,
}

impl DetectEmotionUseCase {
    pub fn new(analyzer: Arc<FaceEmotionAnalyzer>, selection: DominantSelection) -> Self {
        Self {
            analyzer,
            selection,
        }
    }

    pub fn execute(&self, bytes: &[u8]) -> Result<DetectionOutcome, EmotionError> {
        let frame = decode_image(bytes)?;
        let gray = frame.to_gray();
        let faces = self.analyzer.analyze(&gray)?;
        log::debug!(
            "Analyzed {}x{} upload: {} face(s)",
            frame.width(),
            frame.height(),
            faces.len()
        );
        Ok(DetectionOutcome::from_faces(faces, self.selection))
    }
}
