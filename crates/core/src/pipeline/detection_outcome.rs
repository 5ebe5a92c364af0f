use std::str::FromStr;

use crate::classification::domain::emotion::EmotionResult;
use crate::pipeline::face_emotion_analyzer::FaceEmotion;

/// How the headline emotion is picked when an image holds several faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DominantSelection {
    /// The first face the detector reported.
    #[default]
    FirstDetected,
    /// The face classified with the highest confidence; ties go to the
    /// earlier face.
    HighestConfidence,
}

impl DominantSelection {
    pub fn select(&self, faces: &[FaceEmotion]) -> Option<EmotionResult> {
        match self {
            DominantSelection::FirstDetected => faces.first().map(|f| f.result),
            DominantSelection::HighestConfidence => faces
                .iter()
                .fold(None::<&FaceEmotion>, |best, face| match best {
                    Some(b) if b.result.confidence >= face.result.confidence => Some(b),
                    _ => Some(face),
                })
                .map(|f| f.result),
        }
    }
}

impl FromStr for DominantSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(DominantSelection::FirstDetected),
            "confident" => Ok(DominantSelection::HighestConfidence),
            other => Err(format!(
                "unknown dominant selection '{other}' (expected 'first' or 'confident')"
            )),
        }
    }
}

/// Result of analysing one uploaded image.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionOutcome {
    NoFace,
    Faces {
        /// Every face, in detector order.
        results: Vec<FaceEmotion>,
        dominant: EmotionResult,
    },
}

impl DetectionOutcome {
    pub fn from_faces(faces: Vec<FaceEmotion>, selection: DominantSelection) -> Self {
        match selection.select(&faces) {
            Some(dominant) => DetectionOutcome::Faces {
                results: faces,
                dominant,
            },
            None => DetectionOutcome::NoFace,
        }
    }

    pub fn faces_detected(&self) -> usize {
        match self {
            DetectionOutcome::NoFace => 0,
            DetectionOutcome::Faces { results, .. } => results.len(),
        }
    }
}
