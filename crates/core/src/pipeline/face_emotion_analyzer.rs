use std::sync::Arc;

use image::GrayImage;
use serde::Serialize;

use crate::classification::domain::emotion::{Emotion, EmotionResult};
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::classification::domain::face_patch::extract_patch;
use crate::detection::domain::face_locator::FaceLocator;
use crate::error::EmotionError;
use crate::shared::constants::PATCH_SIZE;
use crate::shared::region::Region;

/// One located face and what the classifier made of it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FaceEmotion {
    pub region: Region,
    pub result: EmotionResult,
}

/// Locate → crop → resize → normalize → classify → argmax, shared by the
/// upload and streaming pipelines.
pub struct FaceEmotionAnalyzer {
    locator: Arc<dyn FaceLocator>,
    classifier: Arc<dyn EmotionClassifier>,
}

impl FaceEmotionAnalyzer {
    pub fn new(locator: Arc<dyn FaceLocator>, classifier: Arc<dyn EmotionClassifier>) -> Self {
        Self {
            locator,
            classifier,
        }
    }

    /// Returns one entry per detected face, in detector order.
    pub fn analyze(&self, gray: &GrayImage) -> Result<Vec<FaceEmotion>, EmotionError> {
        let regions = self.locator.locate(gray).map_err(EmotionError::Detection)?;
        let (width, height) = gray.dimensions();

        regions
            .iter()
            .filter_map(|region| region.clamp_to(width, height))
            .map(|region| self.classify_region(gray, region))
            .collect()
    }

    fn classify_region(&self, gray: &GrayImage, region: Region) -> Result<FaceEmotion, EmotionError> {
        let patch = extract_patch(gray, &region, PATCH_SIZE);
        let scores = self
            .classifier
            .classify(patch)
            .map_err(EmotionError::Classification)?;
        if scores.len() != Emotion::COUNT {
            return Err(EmotionError::MalformedOutput {
                expected: Emotion::COUNT,
                actual: scores.len(),
            });
        }
        let result =
            EmotionResult::from_probabilities(&scores).ok_or(EmotionError::MalformedOutput {
                expected: Emotion::COUNT,
                actual: scores.len(),
            })?;
        Ok(FaceEmotion { region, result })
    }
}
