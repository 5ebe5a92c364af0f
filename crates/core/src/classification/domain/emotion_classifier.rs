use ndarray::Array4;

use crate::error::BoxError;

/// Domain interface for emotion classification.
///
/// Takes a `(1, 64, 64, 1)` tensor of grayscale intensities in `[0, 1]`
/// and returns one score per [`Emotion`](super::emotion::Emotion), in label
/// order. Shared between request handlers, hence `&self` and `Sync`.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, patch: Array4<f32>) -> Result<Vec<f32>, BoxError>;
}
